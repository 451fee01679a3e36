use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};

use order_book::{Order, TaqNotification};

/// The three bounded queues that decouple submission, matching and fan-out:
/// submitted orders (transports -> dispatcher), order updates (engine ->
/// order-update fan-out) and market data (engine -> trade/quote fan-out).
///
/// Producers block when a queue is full; consumers block when empty and
/// return once every sender is gone.
#[derive(Debug, Clone)]
pub struct PipelineChannels {
    submitted_tx: Sender<Arc<Order>>,
    submitted_rx: Receiver<Arc<Order>>,
    updates_tx: Sender<Arc<Order>>,
    updates_rx: Receiver<Arc<Order>>,
    market_tx: Sender<TaqNotification>,
    market_rx: Receiver<TaqNotification>,
}

impl PipelineChannels {
    pub fn new(capacity: usize) -> Self {
        let (submitted_tx, submitted_rx) = bounded(capacity);
        let (updates_tx, updates_rx) = bounded(capacity);
        let (market_tx, market_rx) = bounded(capacity);
        Self {
            submitted_tx,
            submitted_rx,
            updates_tx,
            updates_rx,
            market_tx,
            market_rx,
        }
    }

    #[inline]
    pub fn submitted_sender(&self) -> Sender<Arc<Order>> {
        self.submitted_tx.clone()
    }

    #[inline]
    pub fn submitted_receiver(&self) -> Receiver<Arc<Order>> {
        self.submitted_rx.clone()
    }

    #[inline]
    pub fn updates_sender(&self) -> Sender<Arc<Order>> {
        self.updates_tx.clone()
    }

    #[inline]
    pub fn updates_receiver(&self) -> Receiver<Arc<Order>> {
        self.updates_rx.clone()
    }

    #[inline]
    pub fn market_sender(&self) -> Sender<TaqNotification> {
        self.market_tx.clone()
    }

    #[inline]
    pub fn market_receiver(&self) -> Receiver<TaqNotification> {
        self.market_rx.clone()
    }
}
