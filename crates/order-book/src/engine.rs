use std::sync::Arc;

use crossbeam_channel::Sender;
use tracing::{debug, error, info, warn};

use crate::events::TaqNotification;
use crate::instrument::Instrument;
use crate::order::{Order, OrderSnapshot};
use crate::side::BookSide;
use crate::types::{wall_clock_ms, OrderKind, Side};
use crate::BookError;

/// Price-time priority matching engine.
///
/// Orders are only matched at the top of the book, triggered by the arrival
/// of a new order. The engine mutates the owning instrument's books,
/// registries and statistics, and enqueues order updates and trade/quote
/// notifications for the fan-out workers. It holds no per-instrument state
/// itself; one engine serves every instrument, serialized by the dispatcher.
#[derive(Debug, Clone)]
pub struct BookEngine {
    updated_orders: Sender<Arc<Order>>,
    market_data: Sender<TaqNotification>,
}

impl BookEngine {
    pub fn new(updated_orders: Sender<Arc<Order>>, market_data: Sender<TaqNotification>) -> Self {
        Self {
            updated_orders,
            market_data,
        }
    }

    /// Process a newly submitted order against its instrument: resolve the
    /// market price, fold the order into the side statistics, cross it
    /// against the opposite book, then rest or discard the remainder.
    pub fn process_order(
        &self,
        instrument: &Instrument,
        order: &Arc<Order>,
    ) -> Result<(), BookError> {
        // Both sides are taken for the whole operation; matching is the only
        // path that holds the two book locks at once, always in this order.
        let mut bids = instrument.bids().write();
        let mut asks = instrument.asks().write();
        let (own, opposite): (&mut BookSide, &mut BookSide) = match order.side() {
            Side::Buy => (&mut *bids, &mut *asks),
            Side::Sell => (&mut *asks, &mut *bids),
        };

        if order.kind() == OrderKind::Market {
            match opposite.best() {
                Some(best) => order.set_effective_price(best.limit_price()),
                None => {
                    // A market order has no price of its own to rest at.
                    order.reject();
                    warn!(
                        "Rejected market order {}: no opposite side for {}",
                        order.order_id(),
                        instrument.ticker()
                    );
                    self.push_order_update(order);
                    return Ok(());
                }
            }
        }

        let submitted_price = match order.kind() {
            OrderKind::Limit => order.limit_price(),
            OrderKind::Market => order.effective_price(),
        };
        instrument.record_submitted(order.side(), order.original_quantity(), submitted_price);

        self.cross(instrument, order, own, opposite)?;

        if order.is_filled() {
            instrument.note_filled(order);
        } else if order.kind() == OrderKind::Market {
            // Market residuals never rest.
            order.cancel();
            instrument.remove_partial(order.order_id());
            debug!(
                "Discarded market residual of order {} on {}",
                order.order_id(),
                instrument.ticker()
            );
        } else {
            instrument.add_resting(order.side(), order.open_quantity());
            own.insert(Arc::clone(order));
            debug!(
                "Order {} inserted into {} {} book",
                order.order_id(),
                instrument.ticker(),
                order.side()
            );
        }

        instrument.sweep_partials();
        Ok(())
    }

    /// Walk the opposite side from the top, crossing while price permits and
    /// open quantity remains. The trade always prints at the resting order's
    /// price.
    fn cross(
        &self,
        instrument: &Instrument,
        order: &Arc<Order>,
        own: &mut BookSide,
        opposite: &mut BookSide,
    ) -> Result<(), BookError> {
        while order.open_quantity() > 0 {
            let resting = match opposite.best() {
                Some(best) => Arc::clone(best),
                None => break,
            };
            let price = resting.limit_price();

            match order.kind() {
                // A market order trades at whatever the book offers next.
                OrderKind::Market => order.set_effective_price(price),
                OrderKind::Limit => {
                    let crosses = match order.side() {
                        Side::Buy => price <= order.limit_price(),
                        Side::Sell => price >= order.limit_price(),
                    };
                    if !crosses {
                        break;
                    }
                }
            }

            let volume = order.open_quantity().min(resting.open_quantity());
            if volume == 0 {
                // A resting order must always carry open quantity.
                instrument.halt();
                error!(
                    "Resting order {} on {} has no open quantity; instrument halted",
                    resting.order_id(),
                    instrument.ticker()
                );
                return Err(BookError::RestingOrderClosed {
                    order_id: resting.order_id(),
                });
            }
            if let Err(err) = resting
                .execute(volume, price)
                .and_then(|()| order.execute(volume, price))
            {
                instrument.halt();
                error!(
                    "Invariant violation matching order {} on {}: {}; instrument halted",
                    order.order_id(),
                    instrument.ticker(),
                    err
                );
                return Err(err);
            }

            let time_ms = wall_clock_ms();
            instrument.record_trade(order.side(), volume, price);

            if resting.is_filled() {
                opposite.remove_best();
                instrument.note_filled(&resting);
            } else {
                instrument.note_partially_filled(&resting);
            }
            instrument.note_partially_filled(order);

            info!(
                "Matched order {} with {}: {} @ {} on {}",
                order.order_id(),
                resting.order_id(),
                volume,
                price,
                instrument.ticker()
            );

            self.push_order_update(order);
            self.push_order_update(&resting);

            let (bid_price, ask_price) = match order.side() {
                Side::Buy => (own.best_price(), opposite.best_price()),
                Side::Sell => (opposite.best_price(), own.best_price()),
            };
            let _ = self.market_data.send(TaqNotification::Trade {
                ticker: instrument.ticker().to_string(),
                time_ms,
                price,
                quantity: volume,
                aggressor: order.side(),
            });
            let _ = self.market_data.send(TaqNotification::Quote {
                ticker: instrument.ticker().to_string(),
                time_ms,
                bid_price,
                ask_price,
            });
        }
        Ok(())
    }

    /// Cancel a resting order. Returns the cancelled snapshot, or `None` when
    /// the order is no longer on its expected side (already matched, already
    /// cancelled, or never rested); in that case nothing changes.
    pub fn process_cancel(
        &self,
        instrument: &Instrument,
        order: &Arc<Order>,
    ) -> Option<OrderSnapshot> {
        let removed = {
            let mut side = match order.side() {
                Side::Buy => instrument.bids().write(),
                Side::Sell => instrument.asks().write(),
            };
            side.remove(order.order_id())
        };
        let resting = removed?;
        let open = resting.open_quantity();
        resting.cancel();
        instrument.remove_resting(resting.side(), open);
        instrument.remove_partial(resting.order_id());
        info!(
            "Cancelled order {} on {}",
            resting.order_id(),
            instrument.ticker()
        );
        self.push_order_update(&resting);
        Some(resting.snapshot())
    }

    /// Enqueue never fails under normal operation; a disconnected queue only
    /// occurs during shutdown, when delivery no longer matters.
    fn push_order_update(&self, order: &Arc<Order>) {
        let _ = self.updated_orders.send(Arc::clone(order));
    }
}
