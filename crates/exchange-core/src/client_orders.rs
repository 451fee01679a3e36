use std::sync::Arc;

use dashmap::DashMap;

use order_book::{ClientId, Order, OrderId};

/// The orders one client owns, keyed by order id. Clients can only see and
/// cancel orders reached through their own entry.
#[derive(Debug)]
pub struct ClientOrders {
    client_id: ClientId,
    orders: DashMap<OrderId, Arc<Order>>,
}

impl ClientOrders {
    pub fn new(client_id: ClientId) -> Self {
        Self {
            client_id,
            orders: DashMap::new(),
        }
    }

    /// Accepts the order only if it actually belongs to this client.
    pub fn add(&self, order: &Arc<Order>) -> bool {
        if order.client_id() == self.client_id {
            self.orders.insert(order.order_id(), Arc::clone(order));
            true
        } else {
            false
        }
    }

    pub fn find(&self, order_id: OrderId) -> Option<Arc<Order>> {
        self.orders
            .get(&order_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

/// Client id -> owned orders. Written on submission, read on cancellation and
/// lookups; each order is reachable through exactly one client's entry.
#[derive(Debug, Default)]
pub struct ClientOrderDirectory {
    clients: DashMap<ClientId, ClientOrders>,
}

impl ClientOrderDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(&self, order: &Arc<Order>) {
        self.clients
            .entry(order.client_id())
            .or_insert_with(|| ClientOrders::new(order.client_id()))
            .add(order);
    }

    pub fn contains_client(&self, client_id: ClientId) -> bool {
        self.clients.contains_key(&client_id)
    }

    pub fn find(&self, client_id: ClientId, order_id: OrderId) -> Option<Arc<Order>> {
        self.clients.get(&client_id)?.find(order_id)
    }

    pub fn order_count(&self, client_id: ClientId) -> usize {
        self.clients
            .get(&client_id)
            .map(|entry| entry.len())
            .unwrap_or(0)
    }
}
