use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, error, info};

use event_pipeline::{
    OrderDispatcher, OrderUpdateFanout, PipelineChannels, SubscriberHandle, SubscriptionTable,
    TradeQuoteFanout,
};
use order_book::{
    BookEngine, ClientId, Instrument, InstrumentRegistry, Order, OrderId, OrderKind,
    OrderSnapshot, Qty, Side,
};

use crate::client_orders::ClientOrderDirectory;
use crate::error::ExchangeError;

/// Client ids advance with a non-unit stride, a deliberate obfuscation so
/// untrusted clients cannot trivially enumerate each other.
const CLIENT_ID_STRIDE: u64 = 5;

/// Order ids are process-wide monotonic, seeded above zero.
const FIRST_ORDER_ID: u64 = 10_000;

/// Everything that only exists while the exchange is open: the submission
/// side of the pipeline and the worker threads draining it.
struct Pipeline {
    submitted_tx: Sender<Arc<Order>>,
    engine: Arc<BookEngine>,
    workers: Vec<JoinHandle<()>>,
}

/// The exchange facade: the one surface transports talk to.
///
/// Validates requests, assigns identifiers, tracks client ownership, feeds
/// the submitted-order queue and exposes the per-instrument read surface.
/// Reads are lock-free snapshots and may trail the latest match.
pub struct Exchange {
    instruments: Arc<InstrumentRegistry>,
    directory: ClientOrderDirectory,
    subscriptions: Arc<SubscriptionTable>,
    pipeline: Mutex<Option<Pipeline>>,
    queue_capacity: usize,
    next_order_id: AtomicU64,
    next_client_id: AtomicU64,
}

impl Exchange {
    /// Default capacity of each pipeline queue, sized to absorb bursts.
    pub const DEFAULT_QUEUE_CAPACITY: usize = 100_000;

    pub fn new() -> Self {
        Self::with_queue_capacity(Self::DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_queue_capacity(queue_capacity: usize) -> Self {
        Self {
            instruments: Arc::new(InstrumentRegistry::new()),
            directory: ClientOrderDirectory::new(),
            subscriptions: Arc::new(SubscriptionTable::new()),
            pipeline: Mutex::new(None),
            queue_capacity,
            next_order_id: AtomicU64::new(FIRST_ORDER_ID),
            next_client_id: AtomicU64::new(CLIENT_ID_STRIDE),
        }
    }

    /// Spawn the dispatcher and the two fan-out workers. Idempotent.
    pub fn start(&self) -> Result<(), ExchangeError> {
        let mut pipeline = self.pipeline.lock();
        if pipeline.is_some() {
            return Ok(());
        }
        let channels = PipelineChannels::new(self.queue_capacity);
        let engine = Arc::new(BookEngine::new(
            channels.updates_sender(),
            channels.market_sender(),
        ));
        let dispatcher = OrderDispatcher::new(
            channels.submitted_receiver(),
            Arc::clone(&self.instruments),
            Arc::clone(&engine),
        );
        let update_fanout =
            OrderUpdateFanout::new(channels.updates_receiver(), Arc::clone(&self.subscriptions));
        let taq_fanout =
            TradeQuoteFanout::new(channels.market_receiver(), Arc::clone(&self.subscriptions));

        let workers = vec![
            dispatcher
                .spawn()
                .map_err(|e| ExchangeError::WorkerSpawn(e.to_string()))?,
            update_fanout
                .spawn()
                .map_err(|e| ExchangeError::WorkerSpawn(e.to_string()))?,
            taq_fanout
                .spawn()
                .map_err(|e| ExchangeError::WorkerSpawn(e.to_string()))?,
        ];
        *pipeline = Some(Pipeline {
            submitted_tx: channels.submitted_sender(),
            engine,
            workers,
        });
        info!("Exchange started");
        Ok(())
    }

    /// Close the submitted-order queue, let every worker drain its input and
    /// join them. Safe to call when already stopped.
    pub fn stop(&self) {
        let taken = self.pipeline.lock().take();
        let Some(Pipeline {
            submitted_tx,
            engine,
            workers,
        }) = taken
        else {
            return;
        };
        // Dropping the last submission sender stops the dispatcher; dropping
        // the engine then disconnects both downstream queues once the
        // dispatcher's clone is gone, so the fan-outs drain and return.
        drop(submitted_tx);
        drop(engine);
        for worker in workers {
            if worker.join().is_err() {
                error!("Pipeline worker panicked during shutdown");
            }
        }
        info!("Exchange stopped");
    }

    pub fn is_open(&self) -> bool {
        self.pipeline.lock().is_some()
    }

    /// Register a subscriber transport and hand back its client id. The
    /// first call a client must make: order updates go only to registered
    /// clients.
    pub fn register(&self, handle: SubscriberHandle) -> ClientId {
        let client_id = self.next_client_id.fetch_add(CLIENT_ID_STRIDE, Ordering::Relaxed);
        self.subscriptions.register_client(client_id, handle);
        info!("Registered client {}", client_id);
        client_id
    }

    /// Create an instrument to be traded. Idempotent; the ticker is
    /// canonicalized uppercase.
    pub fn register_instrument(&self, ticker: &str) {
        self.instruments.register(ticker);
    }

    /// Subscribe a registered client to an instrument's trade/quote stream.
    /// Duplicate subscriptions are ignored.
    pub fn subscribe(&self, client_id: ClientId, ticker: &str) -> Result<(), ExchangeError> {
        let instrument = self.instrument(ticker)?;
        let handle = self
            .subscriptions
            .order_client(client_id)
            .ok_or(ExchangeError::UnknownClient(client_id))?;
        self.subscriptions
            .subscribe(instrument.ticker(), client_id, handle);
        Ok(())
    }

    pub fn unsubscribe(&self, client_id: ClientId, ticker: &str) -> Result<(), ExchangeError> {
        let instrument = self.instrument(ticker)?;
        self.subscriptions.unsubscribe(instrument.ticker(), client_id);
        Ok(())
    }

    /// Validate, create and enqueue an order; the assigned id is returned
    /// immediately, matching happens on the dispatcher thread.
    pub fn submit_order(
        &self,
        ticker: &str,
        client_id: ClientId,
        side: &str,
        kind: &str,
        price: Decimal,
        quantity: Qty,
    ) -> Result<OrderId, ExchangeError> {
        let instrument = self.instrument(ticker)?;
        let side =
            Side::parse(side).ok_or_else(|| ExchangeError::InvalidSide(side.to_string()))?;
        let kind = OrderKind::parse(kind)
            .ok_or_else(|| ExchangeError::InvalidOrderType(kind.to_string()))?;
        if price.is_sign_negative() {
            return Err(ExchangeError::NegativePrice(price));
        }
        if quantity == 0 {
            return Err(ExchangeError::InvalidQuantity(quantity));
        }

        let pipeline_guard = self.pipeline.lock();
        let pipeline = pipeline_guard.as_ref().ok_or(ExchangeError::Closed)?;

        let order_id = self.next_order_id.fetch_add(1, Ordering::Relaxed);
        let order = Arc::new(Order::new(
            order_id,
            client_id,
            instrument.ticker(),
            side,
            kind,
            quantity,
            price,
        ));
        self.directory.link(&order);
        if pipeline.submitted_tx.send(order).is_err() {
            return Err(ExchangeError::Closed);
        }
        debug!("Order {} submitted by client {}", order_id, client_id);
        Ok(order_id)
    }

    /// Cancel one of the client's own resting orders. Returns the cancelled
    /// snapshot, or `None` when the order is unknown to this client or no
    /// longer cancellable.
    pub fn cancel_order(
        &self,
        client_id: ClientId,
        order_id: OrderId,
    ) -> Result<Option<OrderSnapshot>, ExchangeError> {
        let pipeline_guard = self.pipeline.lock();
        let pipeline = pipeline_guard.as_ref().ok_or(ExchangeError::Closed)?;
        if !self.directory.contains_client(client_id) {
            return Err(ExchangeError::UnknownClient(client_id));
        }
        let Some(order) = self.directory.find(client_id, order_id) else {
            return Ok(None);
        };
        let instrument = self.instrument(order.ticker())?;
        Ok(pipeline.engine.process_cancel(&instrument, &order))
    }

    /// Look up one of the client's own orders.
    pub fn get_client_order(
        &self,
        client_id: ClientId,
        order_id: OrderId,
    ) -> Option<OrderSnapshot> {
        self.directory
            .find(client_id, order_id)
            .map(|order| order.snapshot())
    }

    // ---- per-instrument read surface ----

    pub fn tickers(&self) -> Vec<String> {
        self.instruments.tickers()
    }

    pub fn last_price(&self, ticker: &str) -> Result<Decimal, ExchangeError> {
        Ok(self.instrument(ticker)?.last_traded_price())
    }

    pub fn bid_volume(&self, ticker: &str) -> Result<Qty, ExchangeError> {
        Ok(self.instrument(ticker)?.bid_volume())
    }

    pub fn ask_volume(&self, ticker: &str) -> Result<Qty, ExchangeError> {
        Ok(self.instrument(ticker)?.ask_volume())
    }

    pub fn buy_volume(&self, ticker: &str) -> Result<Qty, ExchangeError> {
        Ok(self.instrument(ticker)?.buy_volume())
    }

    pub fn sell_volume(&self, ticker: &str) -> Result<Qty, ExchangeError> {
        Ok(self.instrument(ticker)?.sell_volume())
    }

    pub fn average_price(&self, ticker: &str) -> Result<Decimal, ExchangeError> {
        Ok(self.instrument(ticker)?.average_price())
    }

    pub fn average_buy_price(&self, ticker: &str) -> Result<Decimal, ExchangeError> {
        Ok(self.instrument(ticker)?.average_buy_price())
    }

    pub fn average_sell_price(&self, ticker: &str) -> Result<Decimal, ExchangeError> {
        Ok(self.instrument(ticker)?.average_sell_price())
    }

    pub fn bid_vwap(&self, ticker: &str) -> Result<Decimal, ExchangeError> {
        Ok(self.instrument(ticker)?.bid_vwap())
    }

    pub fn ask_vwap(&self, ticker: &str) -> Result<Decimal, ExchangeError> {
        Ok(self.instrument(ticker)?.ask_vwap())
    }

    pub fn best_bid(&self, ticker: &str) -> Result<Decimal, ExchangeError> {
        Ok(self.instrument(ticker)?.best_bid())
    }

    pub fn best_ask(&self, ticker: &str) -> Result<Decimal, ExchangeError> {
        Ok(self.instrument(ticker)?.best_ask())
    }

    pub fn bid_price_at_depth(
        &self,
        ticker: &str,
        depth: usize,
    ) -> Result<Decimal, ExchangeError> {
        Ok(self.instrument(ticker)?.bid_price_at_depth(depth))
    }

    pub fn ask_price_at_depth(
        &self,
        ticker: &str,
        depth: usize,
    ) -> Result<Decimal, ExchangeError> {
        Ok(self.instrument(ticker)?.ask_price_at_depth(depth))
    }

    pub fn bid_volume_at_price(
        &self,
        ticker: &str,
        price: Decimal,
    ) -> Result<Qty, ExchangeError> {
        Ok(self.instrument(ticker)?.bid_volume_at_price(price))
    }

    pub fn ask_volume_at_price(
        &self,
        ticker: &str,
        price: Decimal,
    ) -> Result<Qty, ExchangeError> {
        Ok(self.instrument(ticker)?.ask_volume_at_price(price))
    }

    pub fn bid_high(&self, ticker: &str) -> Result<Decimal, ExchangeError> {
        Ok(self.instrument(ticker)?.bid_high())
    }

    pub fn bid_low(&self, ticker: &str) -> Result<Decimal, ExchangeError> {
        Ok(self.instrument(ticker)?.bid_low())
    }

    pub fn ask_high(&self, ticker: &str) -> Result<Decimal, ExchangeError> {
        Ok(self.instrument(ticker)?.ask_high())
    }

    pub fn ask_low(&self, ticker: &str) -> Result<Decimal, ExchangeError> {
        Ok(self.instrument(ticker)?.ask_low())
    }

    pub fn bid_book(&self, ticker: &str) -> Result<Vec<OrderSnapshot>, ExchangeError> {
        Ok(self.instrument(ticker)?.bid_book_snapshot())
    }

    pub fn ask_book(&self, ticker: &str) -> Result<Vec<OrderSnapshot>, ExchangeError> {
        Ok(self.instrument(ticker)?.ask_book_snapshot())
    }

    fn instrument(&self, ticker: &str) -> Result<Arc<Instrument>, ExchangeError> {
        self.instruments
            .get(ticker)
            .ok_or_else(|| ExchangeError::UnknownTicker(ticker.to_string()))
    }
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Exchange {
    fn drop(&mut self) {
        self.stop();
    }
}
