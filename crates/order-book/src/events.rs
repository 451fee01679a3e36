use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Qty, Side};

/// Trade-and-quote notification emitted by the matching engine onto the
/// market-data queue. The two shapes carry different payloads, so this is a
/// tagged union rather than a struct of optionals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaqNotification {
    /// A single cross: the aggressor side, the resting order's price and the
    /// matched volume.
    Trade {
        ticker: String,
        time_ms: i64,
        price: Decimal,
        quantity: Qty,
        aggressor: Side,
    },
    /// Top of book immediately after a cross.
    Quote {
        ticker: String,
        time_ms: i64,
        bid_price: Decimal,
        ask_price: Decimal,
    },
}

impl TaqNotification {
    #[inline]
    pub fn ticker(&self) -> &str {
        match self {
            TaqNotification::Trade { ticker, .. } => ticker,
            TaqNotification::Quote { ticker, .. } => ticker,
        }
    }

    #[inline]
    pub fn time_ms(&self) -> i64 {
        match self {
            TaqNotification::Trade { time_ms, .. } => *time_ms,
            TaqNotification::Quote { time_ms, .. } => *time_ms,
        }
    }
}

impl fmt::Display for TaqNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaqNotification::Trade {
                ticker,
                time_ms,
                price,
                quantity,
                aggressor,
            } => write!(
                f,
                "{} TRADE {} x {} {} @ {}ms",
                ticker, quantity, price, aggressor, time_ms
            ),
            TaqNotification::Quote {
                ticker,
                time_ms,
                bid_price,
                ask_price,
            } => write!(
                f,
                "{} QUOTE bid {} ask {} @ {}ms",
                ticker, bid_price, ask_price, time_ms
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_accessors_cover_both_shapes() {
        let trade = TaqNotification::Trade {
            ticker: "GOOG".to_string(),
            time_ms: 42,
            price: dec!(15.00),
            quantity: 60,
            aggressor: Side::Sell,
        };
        let quote = TaqNotification::Quote {
            ticker: "MSFT".to_string(),
            time_ms: 43,
            bid_price: dec!(14.00),
            ask_price: dec!(14.10),
        };
        assert_eq!(trade.ticker(), "GOOG");
        assert_eq!(trade.time_ms(), 42);
        assert_eq!(quote.ticker(), "MSFT");
        assert_eq!(quote.time_ms(), 43);
    }

    #[test]
    fn test_display_mentions_kind() {
        let quote = TaqNotification::Quote {
            ticker: "MSFT".to_string(),
            time_ms: 1,
            bid_price: dec!(14.00),
            ask_price: dec!(14.10),
        };
        assert!(quote.to_string().contains("QUOTE"));
    }
}
