use std::sync::Arc;
use std::thread::{Builder, JoinHandle};

use crossbeam_channel::Receiver;
use metrics::counter;
use tracing::{error, info, warn};

use order_book::{BookEngine, InstrumentRegistry, Order};

/// Single consumer of the submitted-order queue. Every order for every
/// instrument flows through this one loop, which is what makes matching
/// strictly serial and deterministic per instrument.
#[derive(Debug)]
pub struct OrderDispatcher {
    orders: Receiver<Arc<Order>>,
    instruments: Arc<InstrumentRegistry>,
    engine: Arc<BookEngine>,
}

impl OrderDispatcher {
    pub fn new(
        orders: Receiver<Arc<Order>>,
        instruments: Arc<InstrumentRegistry>,
        engine: Arc<BookEngine>,
    ) -> Self {
        Self {
            orders,
            instruments,
            engine,
        }
    }

    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        Builder::new()
            .name("order-dispatcher".to_string())
            .spawn(move || self.run())
    }

    /// Drain the queue until every sender is gone.
    pub fn run(self) {
        info!("Order dispatcher started");
        while let Ok(order) = self.orders.recv() {
            let instrument = match self.instruments.get(order.ticker()) {
                Some(instrument) => instrument,
                None => {
                    // The facade validates tickers, so this means an
                    // instrument vanished after submission.
                    warn!(
                        "Dropping order {}: unknown instrument {}",
                        order.order_id(),
                        order.ticker()
                    );
                    continue;
                }
            };
            if instrument.is_halted() {
                error!(
                    "Dropping order {}: instrument {} is halted",
                    order.order_id(),
                    instrument.ticker()
                );
                continue;
            }
            counter!("bourse_orders_dispatched_total").increment(1);
            if let Err(err) = self.engine.process_order(&instrument, &order) {
                error!(
                    "Matching failed for order {} on {}: {}",
                    order.order_id(),
                    instrument.ticker(),
                    err
                );
            }
        }
        info!("Order dispatcher stopped");
    }
}
