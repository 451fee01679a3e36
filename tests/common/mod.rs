#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rust_decimal::Decimal;

use event_pipeline::{DeliveryError, Notifiable};
use order_book::{OrderId, Qty};

/// Everything a test subscriber has seen, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    Order {
        order_id: OrderId,
        average_price: Decimal,
        executed: Qty,
        status: String,
    },
    Trade {
        ticker: String,
        side: String,
        price: Decimal,
        quantity: Qty,
    },
    Quote {
        ticker: String,
        bid: Decimal,
        ask: Decimal,
    },
}

/// Test double for a subscriber transport. Optionally fails specific
/// callbacks to provoke eviction.
#[derive(Default)]
pub struct RecordingClient {
    pub events: Mutex<Vec<Received>>,
    pub fail_orders: AtomicBool,
    pub fail_trades: AtomicBool,
}

impl RecordingClient {
    pub fn order_updates(&self) -> Vec<Received> {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, Received::Order { .. }))
            .cloned()
            .collect()
    }

    pub fn trades(&self) -> Vec<Received> {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, Received::Trade { .. }))
            .cloned()
            .collect()
    }

    pub fn quotes(&self) -> Vec<Received> {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, Received::Quote { .. }))
            .cloned()
            .collect()
    }

    pub fn market_data(&self) -> Vec<Received> {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, Received::Trade { .. } | Received::Quote { .. }))
            .cloned()
            .collect()
    }
}

impl Notifiable for RecordingClient {
    fn notify_order(
        &self,
        order_id: OrderId,
        average_executed_price: Decimal,
        executed_quantity: Qty,
        status: &str,
    ) -> Result<(), DeliveryError> {
        if self.fail_orders.load(Ordering::Relaxed) {
            return Err(DeliveryError("order transport down".to_string()));
        }
        self.events.lock().push(Received::Order {
            order_id,
            average_price: average_executed_price,
            executed: executed_quantity,
            status: status.to_string(),
        });
        Ok(())
    }

    fn notify_trade(
        &self,
        ticker: &str,
        _time_ms: i64,
        side: &str,
        price: Decimal,
        quantity: Qty,
    ) -> Result<(), DeliveryError> {
        if self.fail_trades.load(Ordering::Relaxed) {
            return Err(DeliveryError("trade transport down".to_string()));
        }
        self.events.lock().push(Received::Trade {
            ticker: ticker.to_string(),
            side: side.to_string(),
            price,
            quantity,
        });
        Ok(())
    }

    fn notify_quote(
        &self,
        ticker: &str,
        _time_ms: i64,
        bid_price: Decimal,
        ask_price: Decimal,
    ) -> Result<(), DeliveryError> {
        self.events.lock().push(Received::Quote {
            ticker: ticker.to_string(),
            bid: bid_price,
            ask: ask_price,
        });
        Ok(())
    }
}

/// Widen a concrete recording client into the opaque handle the exchange
/// registers.
pub fn subscriber(client: &std::sync::Arc<RecordingClient>) -> event_pipeline::SubscriberHandle {
    std::sync::Arc::clone(client) as event_pipeline::SubscriberHandle
}

/// Poll until `condition` holds, panicking after a generous deadline. The
/// pipeline is asynchronous, so tests wait on observable effects.
pub fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !condition() {
        if Instant::now() > deadline {
            panic!("Timed out waiting for {}", what);
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}
