use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::instrument::Instrument;

/// Process-wide table of traded instruments, keyed by canonical uppercase
/// ticker. Registration is idempotent.
#[derive(Debug, Default)]
pub struct InstrumentRegistry {
    instruments: DashMap<String, Arc<Instrument>>,
}

impl InstrumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, ticker: &str) -> Arc<Instrument> {
        let symbol = ticker.to_uppercase();
        let entry = self.instruments.entry(symbol.clone()).or_insert_with(|| {
            info!("Registered instrument {}", symbol);
            Arc::new(Instrument::new(&symbol))
        });
        Arc::clone(entry.value())
    }

    pub fn get(&self, ticker: &str) -> Option<Arc<Instrument>> {
        self.instruments
            .get(&ticker.to_uppercase())
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn tickers(&self) -> Vec<String> {
        self.instruments
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}
