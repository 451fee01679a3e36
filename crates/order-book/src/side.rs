use std::sync::Arc;

use rust_decimal::Decimal;

use crate::order::Order;
use crate::types::{OrderId, Qty, Side};

/// One side of an instrument's book: resting orders kept sorted by price-time
/// priority. Bids sort descending by price, asks ascending; entry time breaks
/// ties with the earlier order ahead. Index 0 is always the best order.
///
/// Insertion locates its index by binary search and shifts in place; removal
/// is linear, which is acceptable because per-instrument resting counts stay
/// small and cancels are rare next to matches.
#[derive(Debug)]
pub struct BookSide {
    side: Side,
    orders: Vec<Arc<Order>>,
}

impl BookSide {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            orders: Vec::new(),
        }
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    #[inline]
    pub fn best(&self) -> Option<&Arc<Order>> {
        self.orders.first()
    }

    /// Price of the best resting order, or zero when the side is empty.
    #[inline]
    pub fn best_price(&self) -> Decimal {
        self.orders
            .first()
            .map(|o| o.limit_price())
            .unwrap_or(Decimal::ZERO)
    }

    /// Insert keeping sort order. The new order lands behind every resting
    /// order of equal price, so time priority follows from arrival order even
    /// if two entry timestamps collide.
    pub fn insert(&mut self, order: Arc<Order>) {
        let side = self.side;
        let at = self
            .orders
            .partition_point(|resting| Self::keeps_priority(side, resting, &order));
        self.orders.insert(at, order);
    }

    /// True when `resting` stays ahead of `incoming` under price-time priority.
    fn keeps_priority(side: Side, resting: &Order, incoming: &Order) -> bool {
        use std::cmp::Ordering;
        match resting.limit_price().cmp(&incoming.limit_price()) {
            Ordering::Equal => resting.entry_time() <= incoming.entry_time(),
            Ordering::Less => side == Side::Sell,
            Ordering::Greater => side == Side::Buy,
        }
    }

    /// Remove a resting order by identity.
    pub fn remove(&mut self, order_id: OrderId) -> Option<Arc<Order>> {
        let at = self.orders.iter().position(|o| o.order_id() == order_id)?;
        Some(self.orders.remove(at))
    }

    pub fn remove_best(&mut self) -> Option<Arc<Order>> {
        if self.orders.is_empty() {
            None
        } else {
            Some(self.orders.remove(0))
        }
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Order>> {
        self.orders.iter()
    }

    /// The `(depth + 1)`-th distinct price level, or zero when the side has
    /// fewer levels.
    pub fn price_at_depth(&self, depth: usize) -> Decimal {
        let mut levels = 0usize;
        let mut current: Option<Decimal> = None;
        for order in &self.orders {
            let price = order.limit_price();
            if current != Some(price) {
                current = Some(price);
                if levels == depth {
                    return price;
                }
                levels += 1;
            }
        }
        Decimal::ZERO
    }

    /// Sum of open quantities resting at exactly `price`. Stops as soon as the
    /// sorted walk passes the requested level.
    pub fn volume_at_price(&self, price: Decimal) -> Qty {
        let mut volume = 0;
        for order in &self.orders {
            let resting_price = order.limit_price();
            if resting_price == price {
                volume += order.open_quantity();
            } else if self.is_past(resting_price, price) {
                break;
            }
        }
        volume
    }

    fn is_past(&self, resting_price: Decimal, target: Decimal) -> bool {
        match self.side {
            Side::Buy => resting_price < target,
            Side::Sell => resting_price > target,
        }
    }

    /// Total open quantity resting on this side.
    pub fn open_volume(&self) -> Qty {
        self.orders.iter().map(|o| o.open_quantity()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderKind;
    use rust_decimal_macros::dec;

    fn order(id: OrderId, side: Side, price: Decimal, quantity: Qty) -> Arc<Order> {
        Arc::new(Order::new(
            id,
            1,
            "AAPL",
            side,
            OrderKind::Limit,
            quantity,
            price,
        ))
    }

    fn prices(side: &BookSide) -> Vec<Decimal> {
        side.iter().map(|o| o.limit_price()).collect()
    }

    #[test]
    fn test_bid_side_sorts_descending_by_price() {
        let mut bids = BookSide::new(Side::Buy);
        bids.insert(order(1, Side::Buy, dec!(10.00), 10));
        bids.insert(order(2, Side::Buy, dec!(12.00), 10));
        bids.insert(order(3, Side::Buy, dec!(11.00), 10));
        assert_eq!(prices(&bids), vec![dec!(12.00), dec!(11.00), dec!(10.00)]);
        assert_eq!(bids.best_price(), dec!(12.00));
    }

    #[test]
    fn test_ask_side_sorts_ascending_by_price() {
        let mut asks = BookSide::new(Side::Sell);
        asks.insert(order(1, Side::Sell, dec!(10.00), 10));
        asks.insert(order(2, Side::Sell, dec!(9.00), 10));
        asks.insert(order(3, Side::Sell, dec!(11.00), 10));
        assert_eq!(prices(&asks), vec![dec!(9.00), dec!(10.00), dec!(11.00)]);
        assert_eq!(asks.best_price(), dec!(9.00));
    }

    #[test]
    fn test_equal_prices_keep_arrival_order() {
        let mut bids = BookSide::new(Side::Buy);
        let first = order(1, Side::Buy, dec!(10.00), 10);
        let second = order(2, Side::Buy, dec!(10.00), 20);
        let third = order(3, Side::Buy, dec!(10.00), 30);
        bids.insert(Arc::clone(&first));
        bids.insert(second);
        bids.insert(third);
        let ids: Vec<OrderId> = bids.iter().map(|o| o.order_id()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(bids.best().unwrap().order_id(), first.order_id());
    }

    #[test]
    fn test_sort_invariant_holds_under_mixed_insertion() {
        let mut asks = BookSide::new(Side::Sell);
        for (id, price) in [
            (1, dec!(10.05)),
            (2, dec!(10.01)),
            (3, dec!(10.03)),
            (4, dec!(10.01)),
            (5, dec!(10.02)),
        ] {
            asks.insert(order(id, Side::Sell, price, 10));
        }
        let resting: Vec<&Arc<Order>> = asks.iter().collect();
        for pair in resting.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                a.limit_price() < b.limit_price()
                    || (a.limit_price() == b.limit_price()
                        && a.entry_time() <= b.entry_time())
            );
        }
    }

    #[test]
    fn test_remove_by_identity() {
        let mut bids = BookSide::new(Side::Buy);
        bids.insert(order(1, Side::Buy, dec!(10.00), 10));
        bids.insert(order(2, Side::Buy, dec!(11.00), 10));
        let removed = bids.remove(1).unwrap();
        assert_eq!(removed.order_id(), 1);
        assert_eq!(bids.len(), 1);
        assert!(bids.remove(1).is_none());
        assert!(bids.remove(99).is_none());
    }

    #[test]
    fn test_remove_best_pops_front() {
        let mut asks = BookSide::new(Side::Sell);
        assert!(asks.remove_best().is_none());
        asks.insert(order(1, Side::Sell, dec!(10.00), 10));
        asks.insert(order(2, Side::Sell, dec!(9.00), 10));
        assert_eq!(asks.remove_best().unwrap().order_id(), 2);
        assert_eq!(asks.remove_best().unwrap().order_id(), 1);
        assert!(asks.is_empty());
    }

    #[test]
    fn test_price_at_depth_counts_distinct_levels() {
        let mut bids = BookSide::new(Side::Buy);
        bids.insert(order(1, Side::Buy, dec!(24.063), 100));
        bids.insert(order(2, Side::Buy, dec!(24.062), 200));
        bids.insert(order(3, Side::Buy, dec!(24.062), 50));
        bids.insert(order(4, Side::Buy, dec!(24.061), 300));
        bids.insert(order(5, Side::Buy, dec!(24.060), 400));
        assert_eq!(bids.price_at_depth(0), dec!(24.063));
        assert_eq!(bids.price_at_depth(1), dec!(24.062));
        assert_eq!(bids.price_at_depth(2), dec!(24.061));
        assert_eq!(bids.price_at_depth(3), dec!(24.060));
        assert_eq!(bids.price_at_depth(4), Decimal::ZERO);
    }

    #[test]
    fn test_volume_at_price_sums_exact_level_only() {
        let mut bids = BookSide::new(Side::Buy);
        bids.insert(order(1, Side::Buy, dec!(24.063), 100));
        bids.insert(order(2, Side::Buy, dec!(24.062), 200));
        bids.insert(order(3, Side::Buy, dec!(24.062), 50));
        bids.insert(order(4, Side::Buy, dec!(24.060), 400));
        assert_eq!(bids.volume_at_price(dec!(24.062)), 250);
        assert_eq!(bids.volume_at_price(dec!(24.060)), 400);
        assert_eq!(bids.volume_at_price(dec!(25.00)), 0);
        assert_eq!(bids.volume_at_price(dec!(24.061)), 0);
    }

    #[test]
    fn test_open_volume_totals_open_quantities() {
        let mut asks = BookSide::new(Side::Sell);
        asks.insert(order(1, Side::Sell, dec!(10.00), 100));
        asks.insert(order(2, Side::Sell, dec!(10.50), 40));
        assert_eq!(asks.open_volume(), 140);
    }

    // Coarse guard mirroring the original insertion-performance check: sorted
    // insertion of a large batch must stay comfortably sub-second.
    #[test]
    fn test_bulk_insertion_stays_fast() {
        let mut bids = BookSide::new(Side::Buy);
        let start = std::time::Instant::now();
        for i in 0..10_000u64 {
            let price = Decimal::from(1_000 + (i * 37) % 500) / Decimal::from(100);
            bids.insert(order(i, Side::Buy, price, 10));
        }
        assert_eq!(bids.len(), 10_000);
        assert!(start.elapsed() < std::time::Duration::from_secs(5));
    }
}
