use rust_decimal::Decimal;
use thiserror::Error;

use order_book::{ClientId, Qty};

/// Validation and lifecycle errors surfaced synchronously to callers.
/// Rejections (e.g. a market order against an empty book) are not errors;
/// they arrive asynchronously as order updates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("invalid ticker symbol: {0}")]
    UnknownTicker(String),
    #[error("invalid side: {0}")]
    InvalidSide(String),
    #[error("invalid order type: {0}")]
    InvalidOrderType(String),
    #[error("negative price: {0}")]
    NegativePrice(Decimal),
    #[error("invalid quantity: {0}")]
    InvalidQuantity(Qty),
    #[error("unknown client: {0}")]
    UnknownClient(ClientId),
    #[error("the exchange is not open")]
    Closed,
    #[error("failed to spawn pipeline worker: {0}")]
    WorkerSpawn(String),
}
