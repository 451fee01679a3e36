//! Per-instrument limit order books with price-time priority matching.
//!
//! The crate owns the data half of the exchange: orders, sorted book sides,
//! instruments with their incremental statistics, and the matching engine
//! that crosses incoming orders and feeds the notification queues.

pub mod engine;
pub mod events;
pub mod instrument;
pub mod order;
pub mod registry;
pub mod side;
pub mod types;

use thiserror::Error;

pub use engine::BookEngine;
pub use events::TaqNotification;
pub use instrument::Instrument;
pub use order::{Fill, Order, OrderSnapshot};
pub use registry::InstrumentRegistry;
pub use side::BookSide;
pub use types::{ClientId, OrderId, OrderKind, OrderStatus, Qty, Side};

/// Internal inconsistencies detected while matching. These are never
/// recovered; the owning instrument halts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BookError {
    #[error("execution volume {volume} exceeds open quantity {open} on order {order_id}")]
    InvariantViolation {
        order_id: OrderId,
        volume: Qty,
        open: Qty,
    },
    #[error("resting order {order_id} has no open quantity")]
    RestingOrderClosed { order_id: OrderId },
}
