use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use thiserror::Error;

use order_book::{ClientId, OrderId, Qty};

/// Signalled by a subscriber callback when delivery fails. The failing
/// subscriber is evicted; nothing else is affected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("subscriber delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Callback surface the engine invokes on registered transports. Handles are
/// opaque: the pipeline never inspects them beyond calling these methods.
pub trait Notifiable: Send + Sync {
    /// Push the state of one of the client's own orders.
    fn notify_order(
        &self,
        order_id: OrderId,
        average_executed_price: Decimal,
        executed_quantity: Qty,
        status: &str,
    ) -> Result<(), DeliveryError>;

    /// Push a trade print for a subscribed instrument.
    fn notify_trade(
        &self,
        ticker: &str,
        time_ms: i64,
        side: &str,
        price: Decimal,
        quantity: Qty,
    ) -> Result<(), DeliveryError>;

    /// Push a top-of-book change for a subscribed instrument.
    fn notify_quote(
        &self,
        ticker: &str,
        time_ms: i64,
        bid_price: Decimal,
        ask_price: Decimal,
    ) -> Result<(), DeliveryError>;
}

pub type SubscriberHandle = Arc<dyn Notifiable>;

/// Who gets told what: the per-client order-update callbacks and the
/// per-ticker trade/quote subscriber lists.
///
/// Written by the facade (registration, subscription) and by the fan-out
/// workers (eviction after delivery failure); read concurrently by both
/// fan-outs.
#[derive(Default)]
pub struct SubscriptionTable {
    order_clients: DashMap<ClientId, SubscriberHandle>,
    taq_subscribers: DashMap<String, Vec<(ClientId, SubscriberHandle)>>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_client(&self, client_id: ClientId, handle: SubscriberHandle) {
        self.order_clients.insert(client_id, handle);
    }

    pub fn order_client(&self, client_id: ClientId) -> Option<SubscriberHandle> {
        self.order_clients
            .get(&client_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn is_registered(&self, client_id: ClientId) -> bool {
        self.order_clients.contains_key(&client_id)
    }

    /// Drop a client's order-update callback after a delivery failure.
    pub fn evict_client(&self, client_id: ClientId) {
        self.order_clients.remove(&client_id);
    }

    /// Add a trade/quote subscription; duplicates are ignored.
    pub fn subscribe(&self, ticker: &str, client_id: ClientId, handle: SubscriberHandle) {
        let mut entry = self.taq_subscribers.entry(ticker.to_string()).or_default();
        if entry.iter().all(|(id, _)| *id != client_id) {
            entry.push((client_id, handle));
        }
    }

    pub fn unsubscribe(&self, ticker: &str, client_id: ClientId) {
        if let Some(mut entry) = self.taq_subscribers.get_mut(ticker) {
            entry.retain(|(id, _)| *id != client_id);
        }
    }

    /// Drop a failed subscriber from one ticker's list.
    pub fn evict_subscriber(&self, ticker: &str, client_id: ClientId) {
        self.unsubscribe(ticker, client_id);
    }

    /// Snapshot of a ticker's subscribers, safe to iterate while the table
    /// is concurrently modified.
    pub fn subscribers(&self, ticker: &str) -> Vec<(ClientId, SubscriberHandle)> {
        self.taq_subscribers
            .get(ticker)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self, ticker: &str) -> usize {
        self.taq_subscribers
            .get(ticker)
            .map(|entry| entry.len())
            .unwrap_or(0)
    }
}

impl fmt::Debug for SubscriptionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionTable")
            .field("order_clients", &self.order_clients.len())
            .field("taq_tickers", &self.taq_subscribers.len())
            .finish()
    }
}
