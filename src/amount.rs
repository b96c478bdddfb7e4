//! Monetary parsing and the single rounding rule used across the pipeline.
//!
//! Every amount that leaves this module has exactly two fractional digits, so
//! row-level and aggregate-level figures never drift apart.

use std::str::FromStr;

use clap::ValueEnum;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of fractional digits kept for every monetary value.
pub const MONEY_DP: u32 = 2;

/// Largest accepted absolute amount per row. Keeps every sum and ratio the
/// report derives well inside `Decimal`'s range.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0); // 1_000_000_000_000

/// Parse a raw amount cell. Tolerates `$`, thousands separators, stray quotes
/// and accounting-style parentheses for negatives. Returns `None` when the
/// cell is empty or not numeric.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '"' | '$'))
        .collect();
    let s = cleaned.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return Decimal::from_str(inner.trim()).ok().map(|d| -d);
    }
    Decimal::from_str(s).ok()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Banker's rounding: 0.125 -> 0.12, 0.135 -> 0.14
    #[default]
    #[value(name = "half_even")]
    HalfEven,
    /// Commercial rounding: 0.125 -> 0.13
    #[value(name = "half_up")]
    HalfUp,
}

impl RoundingMode {
    fn strategy(self) -> RoundingStrategy {
        match self {
            Self::HalfEven => RoundingStrategy::MidpointNearestEven,
            Self::HalfUp => RoundingStrategy::MidpointAwayFromZero,
        }
    }

    /// Round to two decimals and pin the scale so `200` and `200.00` render
    /// and compare identically.
    pub fn round(self, value: Decimal) -> Decimal {
        let mut rounded = value.round_dp_with_strategy(MONEY_DP, self.strategy());
        rounded.rescale(MONEY_DP);
        if rounded.is_zero() {
            rounded.set_sign_positive(true);
        }
        rounded
    }
}
