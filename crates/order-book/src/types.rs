use std::fmt;
use std::sync::OnceLock;
use std::time::Instant;

use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

pub type OrderId = u64;
pub type ClientId = u64;
pub type Qty = u64;

/// Money quantities are reported with four fractional digits, rounded half-up.
pub const MONEY_DP: u32 = 4;

#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Case-insensitive parse of the wire strings `"BUY"` / `"SELL"`.
    #[inline]
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("BUY") {
            Some(Side::Buy)
        } else if value.eq_ignore_ascii_case("SELL") {
            Some(Side::Sell)
        } else {
            None
        }
    }

    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    #[inline]
    pub fn is_buy(self) -> bool {
        matches!(self, Side::Buy)
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    Limit,
    Market,
}

impl OrderKind {
    /// Case-insensitive parse of the wire strings `"LIMIT"` / `"MARKET"`.
    #[inline]
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("LIMIT") {
            Some(OrderKind::Limit)
        } else if value.eq_ignore_ascii_case("MARKET") {
            Some(OrderKind::Market)
        } else {
            None
        }
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            OrderKind::Limit => "LIMIT",
            OrderKind::Market => "MARKET",
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monotonic clock anchored to the wall clock at first use. Entry times and
/// fill times use the nanosecond reading; notification timestamps use the
/// millisecond reading, which never steps backwards.
fn clock_anchor() -> &'static (Instant, i64) {
    static ANCHOR: OnceLock<(Instant, i64)> = OnceLock::new();
    ANCHOR.get_or_init(|| (Instant::now(), Utc::now().timestamp_millis()))
}

#[inline]
pub fn monotonic_nanos() -> u64 {
    clock_anchor().0.elapsed().as_nanos() as u64
}

#[inline]
pub fn wall_clock_ms() -> i64 {
    let (anchor, wall_ms) = *clock_anchor();
    wall_ms + anchor.elapsed().as_millis() as i64
}
