use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;

use crate::order::{Order, OrderSnapshot};
use crate::side::BookSide;
use crate::types::{round_money, OrderId, Qty, Side};

/// Incremental aggregates maintained by the matching engine. Raw accumulators
/// live here; rounding happens in the read accessors.
#[derive(Debug, Default)]
struct StatsInner {
    last_traded_price: Decimal,
    bid_volume: Qty,
    ask_volume: Qty,
    buy_volume: Qty,
    sell_volume: Qty,
    traded_volume: Qty,
    traded_value: Decimal,
    buy_traded_volume: Qty,
    buy_traded_value: Decimal,
    sell_traded_volume: Qty,
    sell_traded_value: Decimal,
    bid_vwap_volume: Qty,
    bid_vwap_value: Decimal,
    ask_vwap_volume: Qty,
    ask_vwap_value: Decimal,
    bid_high: Decimal,
    bid_low: Decimal,
    ask_high: Decimal,
    ask_low: Decimal,
}

/// One traded instrument: its two book sides, the filled and partially-filled
/// registries, and the running statistics.
///
/// The books and statistics are mutated by the matching engine (dispatcher
/// thread) and by the synchronous cancel path; the read accessors take brief
/// shared locks and may trail the latest match by design.
#[derive(Debug)]
pub struct Instrument {
    ticker: String,
    bids: RwLock<BookSide>,
    asks: RwLock<BookSide>,
    filled: Mutex<HashMap<OrderId, Arc<Order>>>,
    partially_filled: Mutex<HashMap<OrderId, Arc<Order>>>,
    stats: RwLock<StatsInner>,
    halted: AtomicBool,
}

impl Instrument {
    pub fn new(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_uppercase(),
            bids: RwLock::new(BookSide::new(Side::Buy)),
            asks: RwLock::new(BookSide::new(Side::Sell)),
            filled: Mutex::new(HashMap::new()),
            partially_filled: Mutex::new(HashMap::new()),
            stats: RwLock::new(StatsInner::default()),
            halted: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    #[inline]
    pub(crate) fn bids(&self) -> &RwLock<BookSide> {
        &self.bids
    }

    #[inline]
    pub(crate) fn asks(&self) -> &RwLock<BookSide> {
        &self.asks
    }

    /// Set once an invariant violation is detected mid-match. A halted
    /// instrument accepts no further orders.
    #[inline]
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn halt(&self) {
        self.halted.store(true, Ordering::Relaxed);
    }

    // ---- statistics maintenance (engine-side) ----

    /// Fold a newly submitted order into the side VWAP and high/low history.
    /// Zero-priced orders are not an observation.
    pub(crate) fn record_submitted(&self, side: Side, quantity: Qty, price: Decimal) {
        if price.is_zero() {
            return;
        }
        let mut stats = self.stats.write();
        let value = Decimal::from(quantity) * price;
        match side {
            Side::Buy => {
                stats.bid_vwap_volume += quantity;
                stats.bid_vwap_value += value;
                if price > stats.bid_high {
                    stats.bid_high = price;
                }
                if stats.bid_low.is_zero() || price < stats.bid_low {
                    stats.bid_low = price;
                }
            }
            Side::Sell => {
                stats.ask_vwap_volume += quantity;
                stats.ask_vwap_value += value;
                if price > stats.ask_high {
                    stats.ask_high = price;
                }
                if stats.ask_low.is_zero() || price < stats.ask_low {
                    stats.ask_low = price;
                }
            }
        }
    }

    /// Fold one match into the trade statistics. `aggressor` is the incoming
    /// order's side; the resting side's outstanding volume shrinks by the
    /// matched quantity.
    pub(crate) fn record_trade(&self, aggressor: Side, volume: Qty, price: Decimal) {
        let mut stats = self.stats.write();
        let value = Decimal::from(volume) * price;
        stats.last_traded_price = price;
        stats.buy_volume += volume;
        stats.sell_volume += volume;
        stats.traded_volume += volume;
        stats.traded_value += value;
        match aggressor {
            Side::Buy => {
                stats.ask_volume = stats.ask_volume.saturating_sub(volume);
                stats.buy_traded_volume += volume;
                stats.buy_traded_value += value;
            }
            Side::Sell => {
                stats.bid_volume = stats.bid_volume.saturating_sub(volume);
                stats.sell_traded_volume += volume;
                stats.sell_traded_value += value;
            }
        }
    }

    /// Account for an order entering a book side with `open` quantity left.
    pub(crate) fn add_resting(&self, side: Side, open: Qty) {
        let mut stats = self.stats.write();
        match side {
            Side::Buy => stats.bid_volume += open,
            Side::Sell => stats.ask_volume += open,
        }
    }

    /// Account for a resting order leaving a book side via cancellation.
    pub(crate) fn remove_resting(&self, side: Side, open: Qty) {
        let mut stats = self.stats.write();
        match side {
            Side::Buy => stats.bid_volume = stats.bid_volume.saturating_sub(open),
            Side::Sell => stats.ask_volume = stats.ask_volume.saturating_sub(open),
        }
    }

    // ---- filled / partially-filled registries ----

    /// Register a fully filled order, dropping any stale partial entry. Each
    /// order appears in the registry at most once.
    pub(crate) fn note_filled(&self, order: &Arc<Order>) {
        self.partially_filled.lock().remove(&order.order_id());
        self.filled
            .lock()
            .entry(order.order_id())
            .or_insert_with(|| Arc::clone(order));
    }

    /// Track an order that has traded but still has open quantity. An order
    /// that meanwhile filled migrates to the filled registry instead.
    pub(crate) fn note_partially_filled(&self, order: &Arc<Order>) {
        let mut partials = self.partially_filled.lock();
        if order.is_filled() {
            if partials.remove(&order.order_id()).is_some() {
                drop(partials);
                self.note_filled(order);
            }
        } else {
            partials
                .entry(order.order_id())
                .or_insert_with(|| Arc::clone(order));
        }
    }

    pub(crate) fn remove_partial(&self, order_id: OrderId) {
        self.partially_filled.lock().remove(&order_id);
    }

    /// Promote every partial that has since filled into the filled registry.
    pub(crate) fn sweep_partials(&self) {
        let mut promoted = Vec::new();
        {
            let mut partials = self.partially_filled.lock();
            partials.retain(|_, order| {
                if order.is_filled() {
                    promoted.push(Arc::clone(order));
                    false
                } else {
                    true
                }
            });
        }
        for order in promoted {
            self.note_filled(&order);
        }
    }

    pub fn filled_order_ids(&self) -> Vec<OrderId> {
        self.filled.lock().keys().copied().collect()
    }

    pub fn partially_filled_order_ids(&self) -> Vec<OrderId> {
        self.partially_filled.lock().keys().copied().collect()
    }

    // ---- read surface ----

    pub fn last_traded_price(&self) -> Decimal {
        round_money(self.stats.read().last_traded_price)
    }

    pub fn bid_volume(&self) -> Qty {
        self.stats.read().bid_volume
    }

    pub fn ask_volume(&self) -> Qty {
        self.stats.read().ask_volume
    }

    pub fn buy_volume(&self) -> Qty {
        self.stats.read().buy_volume
    }

    pub fn sell_volume(&self) -> Qty {
        self.stats.read().sell_volume
    }

    /// Volume-weighted average price across all trades, zero before the first
    /// trade.
    pub fn average_price(&self) -> Decimal {
        let stats = self.stats.read();
        Self::weighted(stats.traded_value, stats.traded_volume)
    }

    pub fn average_buy_price(&self) -> Decimal {
        let stats = self.stats.read();
        Self::weighted(stats.buy_traded_value, stats.buy_traded_volume)
    }

    pub fn average_sell_price(&self) -> Decimal {
        let stats = self.stats.read();
        Self::weighted(stats.sell_traded_value, stats.sell_traded_volume)
    }

    /// VWAP over the prices of every order ever submitted to the bid side,
    /// not over executed trades.
    pub fn bid_vwap(&self) -> Decimal {
        let stats = self.stats.read();
        Self::weighted(stats.bid_vwap_value, stats.bid_vwap_volume)
    }

    pub fn ask_vwap(&self) -> Decimal {
        let stats = self.stats.read();
        Self::weighted(stats.ask_vwap_value, stats.ask_vwap_volume)
    }

    pub fn bid_high(&self) -> Decimal {
        round_money(self.stats.read().bid_high)
    }

    pub fn bid_low(&self) -> Decimal {
        round_money(self.stats.read().bid_low)
    }

    pub fn ask_high(&self) -> Decimal {
        round_money(self.stats.read().ask_high)
    }

    pub fn ask_low(&self) -> Decimal {
        round_money(self.stats.read().ask_low)
    }

    pub fn best_bid(&self) -> Decimal {
        round_money(self.bids.read().best_price())
    }

    pub fn best_ask(&self) -> Decimal {
        round_money(self.asks.read().best_price())
    }

    pub fn bid_price_at_depth(&self, depth: usize) -> Decimal {
        round_money(self.bids.read().price_at_depth(depth))
    }

    pub fn ask_price_at_depth(&self, depth: usize) -> Decimal {
        round_money(self.asks.read().price_at_depth(depth))
    }

    pub fn bid_volume_at_price(&self, price: Decimal) -> Qty {
        self.bids.read().volume_at_price(price)
    }

    pub fn ask_volume_at_price(&self, price: Decimal) -> Qty {
        self.asks.read().volume_at_price(price)
    }

    /// Per-order view of the bid book in priority order.
    pub fn bid_book_snapshot(&self) -> Vec<OrderSnapshot> {
        self.bids.read().iter().map(|o| o.snapshot()).collect()
    }

    pub fn ask_book_snapshot(&self) -> Vec<OrderSnapshot> {
        self.asks.read().iter().map(|o| o.snapshot()).collect()
    }

    fn weighted(value: Decimal, volume: Qty) -> Decimal {
        if volume == 0 {
            Decimal::ZERO
        } else {
            round_money(value / Decimal::from(volume))
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ticker)
    }
}
