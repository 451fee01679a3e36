//! Simulator configuration

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Instruments registered at boot.
    pub tickers: Vec<String>,
    /// Capacity of each pipeline queue (submitted orders, order updates,
    /// market data).
    pub queue_capacity: usize,
    /// Run the short demo trading session after boot.
    pub run_demo_session: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tickers: vec![
                "GOOG".to_string(),
                "MSFT".to_string(),
                "AAPL".to_string(),
            ],
            queue_capacity: 100_000,
            run_demo_session: true,
        }
    }
}

impl SimulatorConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SimulatorConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
