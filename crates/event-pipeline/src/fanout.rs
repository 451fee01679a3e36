use std::sync::Arc;
use std::thread::{Builder, JoinHandle};

use crossbeam_channel::Receiver;
use metrics::counter;
use tracing::{info, warn};

use order_book::{Order, TaqNotification};

use crate::subscribers::SubscriptionTable;

/// Single consumer of the order-update queue. Each update is pushed to the
/// owning client's callback; a failing callback costs the client its
/// registration, nothing more.
#[derive(Debug)]
pub struct OrderUpdateFanout {
    updates: Receiver<Arc<Order>>,
    subscriptions: Arc<SubscriptionTable>,
}

impl OrderUpdateFanout {
    pub fn new(updates: Receiver<Arc<Order>>, subscriptions: Arc<SubscriptionTable>) -> Self {
        Self {
            updates,
            subscriptions,
        }
    }

    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        Builder::new()
            .name("order-update-fanout".to_string())
            .spawn(move || self.run())
    }

    pub fn run(self) {
        info!("Order update fan-out started");
        while let Ok(order) = self.updates.recv() {
            let client = match self.subscriptions.order_client(order.client_id()) {
                Some(client) => client,
                None => continue,
            };
            let outcome = client.notify_order(
                order.order_id(),
                order.average_executed_price(),
                order.executed_quantity(),
                order.status().as_str(),
            );
            match outcome {
                Ok(()) => {
                    counter!("bourse_order_updates_delivered_total").increment(1);
                }
                Err(err) => {
                    warn!(
                        "Evicting client {} after order-update delivery failure: {}",
                        order.client_id(),
                        err
                    );
                    self.subscriptions.evict_client(order.client_id());
                    counter!("bourse_subscribers_evicted_total").increment(1);
                }
            }
        }
        info!("Order update fan-out stopped");
    }
}

/// Single consumer of the market-data queue. Trades and quotes go to every
/// subscriber of the instrument; failing subscribers are evicted from that
/// instrument's list without disturbing the others.
#[derive(Debug)]
pub struct TradeQuoteFanout {
    notifications: Receiver<TaqNotification>,
    subscriptions: Arc<SubscriptionTable>,
}

impl TradeQuoteFanout {
    pub fn new(
        notifications: Receiver<TaqNotification>,
        subscriptions: Arc<SubscriptionTable>,
    ) -> Self {
        Self {
            notifications,
            subscriptions,
        }
    }

    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        Builder::new()
            .name("trade-quote-fanout".to_string())
            .spawn(move || self.run())
    }

    pub fn run(self) {
        info!("Trade/quote fan-out started");
        while let Ok(notification) = self.notifications.recv() {
            let subscribers = self.subscriptions.subscribers(notification.ticker());
            if subscribers.is_empty() {
                continue;
            }
            let mut failed = Vec::new();
            for (client_id, handle) in &subscribers {
                let outcome = match &notification {
                    TaqNotification::Trade {
                        ticker,
                        time_ms,
                        price,
                        quantity,
                        aggressor,
                    } => handle.notify_trade(ticker, *time_ms, aggressor.as_str(), *price, *quantity),
                    TaqNotification::Quote {
                        ticker,
                        time_ms,
                        bid_price,
                        ask_price,
                    } => handle.notify_quote(ticker, *time_ms, *bid_price, *ask_price),
                };
                match outcome {
                    Ok(()) => {
                        counter!("bourse_market_data_delivered_total").increment(1);
                    }
                    Err(err) => {
                        warn!(
                            "Evicting subscriber {} from {} after delivery failure: {}",
                            client_id,
                            notification.ticker(),
                            err
                        );
                        failed.push(*client_id);
                    }
                }
            }
            for client_id in failed {
                self.subscriptions
                    .evict_subscriber(notification.ticker(), client_id);
                counter!("bourse_subscribers_evicted_total").increment(1);
            }
        }
        info!("Trade/quote fan-out stopped");
    }
}
