//! # Bourse: an in-memory equities exchange simulator
//!
//! A multi-instrument limit-order-book matching engine with price-time
//! priority crossing, per-instrument trade and quote statistics, and an
//! asynchronous notification pipeline that pushes order state, trade prints
//! and top-of-book quotes to registered subscribers.

pub use event_pipeline;
pub use exchange_core;
pub use order_book;

pub mod config;

pub use exchange_core::{Exchange, ExchangeError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
