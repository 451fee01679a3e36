//! Concurrent pipeline between order submission and subscriber delivery.
//!
//! Three bounded queues, three dedicated worker threads: the dispatcher
//! consumes submitted orders and drives the matching engine, and the two
//! fan-out workers push order updates and trade/quote notifications to
//! registered subscribers, evicting any subscriber whose delivery fails.

pub mod channels;
pub mod dispatcher;
pub mod fanout;
pub mod subscribers;

pub use channels::PipelineChannels;
pub use dispatcher::OrderDispatcher;
pub use fanout::{OrderUpdateFanout, TradeQuoteFanout};
pub use subscribers::{DeliveryError, Notifiable, SubscriberHandle, SubscriptionTable};
