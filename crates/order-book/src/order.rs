use std::fmt;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{
    monotonic_nanos, round_money, ClientId, OrderId, OrderKind, OrderStatus, Qty, Side,
};
use crate::BookError;

/// A single execution print recorded against an order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub volume: Qty,
    pub price: Decimal,
    /// Monotonic nanosecond timestamp taken when the fill was recorded.
    pub trade_time: u64,
}

#[derive(Debug)]
struct ExecState {
    open_quantity: Qty,
    executed_quantity: Qty,
    /// For market orders, the price of the counter-order currently being
    /// matched against. Equals the limit price for limit orders.
    effective_price: Decimal,
    status: OrderStatus,
    fills: Vec<Fill>,
}

/// Immutable identity plus lock-guarded execution state of one order.
///
/// The identity half never changes after construction. The execution half is
/// mutated only by the matching engine of the owning instrument and by the
/// cancel path; everyone else reads snapshots.
#[derive(Debug)]
pub struct Order {
    order_id: OrderId,
    client_id: ClientId,
    ticker: String,
    side: Side,
    kind: OrderKind,
    original_quantity: Qty,
    limit_price: Decimal,
    entry_time: u64,
    state: RwLock<ExecState>,
}

impl Order {
    pub fn new(
        order_id: OrderId,
        client_id: ClientId,
        ticker: &str,
        side: Side,
        kind: OrderKind,
        quantity: Qty,
        price: Decimal,
    ) -> Self {
        Self {
            order_id,
            client_id,
            ticker: ticker.to_string(),
            side,
            kind,
            original_quantity: quantity,
            limit_price: price,
            entry_time: monotonic_nanos(),
            state: RwLock::new(ExecState {
                open_quantity: quantity,
                executed_quantity: 0,
                effective_price: price,
                status: OrderStatus::New,
                fills: Vec::new(),
            }),
        }
    }

    #[inline]
    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    #[inline]
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    #[inline]
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    #[inline]
    pub fn kind(&self) -> OrderKind {
        self.kind
    }

    #[inline]
    pub fn original_quantity(&self) -> Qty {
        self.original_quantity
    }

    #[inline]
    pub fn limit_price(&self) -> Decimal {
        self.limit_price
    }

    #[inline]
    pub fn entry_time(&self) -> u64 {
        self.entry_time
    }

    #[inline]
    pub fn open_quantity(&self) -> Qty {
        self.state.read().open_quantity
    }

    #[inline]
    pub fn executed_quantity(&self) -> Qty {
        self.state.read().executed_quantity
    }

    #[inline]
    pub fn status(&self) -> OrderStatus {
        self.state.read().status
    }

    #[inline]
    pub fn effective_price(&self) -> Decimal {
        self.state.read().effective_price
    }

    #[inline]
    pub fn is_filled(&self) -> bool {
        self.state.read().executed_quantity == self.original_quantity
    }

    /// An order is closed once no open quantity remains, whether by fills or
    /// by cancellation.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.state.read().open_quantity == 0
    }

    /// Record an execution of `volume` at `price` against this order.
    pub fn execute(&self, volume: Qty, price: Decimal) -> Result<(), BookError> {
        let mut state = self.state.write();
        if volume > state.open_quantity {
            return Err(BookError::InvariantViolation {
                order_id: self.order_id,
                volume,
                open: state.open_quantity,
            });
        }
        state.fills.push(Fill {
            volume,
            price,
            trade_time: monotonic_nanos(),
        });
        state.open_quantity -= volume;
        state.executed_quantity += volume;
        state.status = if state.executed_quantity == self.original_quantity {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        Ok(())
    }

    /// Zero the open quantity without touching the executed quantity.
    pub fn cancel(&self) {
        let mut state = self.state.write();
        state.open_quantity = 0;
        state.status = OrderStatus::Cancelled;
    }

    pub fn reject(&self) {
        self.state.write().status = OrderStatus::Rejected;
    }

    /// Used by the matching engine while walking the opposite book with a
    /// market order: the comparison price tracks the resting order in play.
    pub(crate) fn set_effective_price(&self, price: Decimal) {
        self.state.write().effective_price = price;
    }

    /// Volume-weighted average of this order's fills, rounded to money
    /// precision. Zero when the order has not traded.
    pub fn average_executed_price(&self) -> Decimal {
        let state = self.state.read();
        let volume: Qty = state.fills.iter().map(|f| f.volume).sum();
        if volume == 0 {
            return Decimal::ZERO;
        }
        let value: Decimal = state
            .fills
            .iter()
            .map(|f| Decimal::from(f.volume) * f.price)
            .sum();
        round_money(value / Decimal::from(volume))
    }

    #[inline]
    pub fn last_executed_price(&self) -> Option<Decimal> {
        self.state.read().fills.last().map(|f| f.price)
    }

    #[inline]
    pub fn last_executed_volume(&self) -> Option<Qty> {
        self.state.read().fills.last().map(|f| f.volume)
    }

    #[inline]
    pub fn fill_count(&self) -> usize {
        self.state.read().fills.len()
    }

    pub fn fills(&self) -> Vec<Fill> {
        self.state.read().fills.clone()
    }

    /// Point-in-time copy of identity and execution state.
    pub fn snapshot(&self) -> OrderSnapshot {
        let state = self.state.read();
        let volume: Qty = state.fills.iter().map(|f| f.volume).sum();
        let average = if volume == 0 {
            Decimal::ZERO
        } else {
            let value: Decimal = state
                .fills
                .iter()
                .map(|f| Decimal::from(f.volume) * f.price)
                .sum();
            round_money(value / Decimal::from(volume))
        };
        OrderSnapshot {
            order_id: self.order_id,
            client_id: self.client_id,
            ticker: self.ticker.clone(),
            side: self.side,
            kind: self.kind,
            original_quantity: self.original_quantity,
            open_quantity: state.open_quantity,
            executed_quantity: state.executed_quantity,
            limit_price: self.limit_price,
            effective_price: state.effective_price,
            status: state.status,
            average_executed_price: average,
            entry_time: self.entry_time,
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        write!(
            f,
            "{} {} {} {} qty {} @ {} open {} executed {} [{}]",
            self.order_id,
            self.ticker,
            self.side,
            self.kind,
            self.original_quantity,
            self.limit_price,
            state.open_quantity,
            state.executed_quantity,
            state.status,
        )
    }
}

/// Serializable view of an order returned across the facade boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub order_id: OrderId,
    pub client_id: ClientId,
    pub ticker: String,
    pub side: Side,
    pub kind: OrderKind,
    pub original_quantity: Qty,
    pub open_quantity: Qty,
    pub executed_quantity: Qty,
    pub limit_price: Decimal,
    pub effective_price: Decimal,
    pub status: OrderStatus,
    pub average_executed_price: Decimal,
    pub entry_time: u64,
}
