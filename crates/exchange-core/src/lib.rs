//! The exchange facade: request validation, identifier assignment, order
//! lifecycle coordination and the read-only statistics surface.
//!
//! Transports hand typed requests to [`Exchange`] and receive notifications
//! back through the callbacks they registered with it; everything below the
//! facade (books, matching, queues, fan-out) stays private to the engine.

pub mod client_orders;
pub mod error;
pub mod facade;

pub use client_orders::{ClientOrderDirectory, ClientOrders};
pub use error::ExchangeError;
pub use facade::Exchange;
