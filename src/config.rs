//! Precision settings for a form session.

use rust_decimal::Decimal;

use crate::money;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormConfig {
    /// Minor-unit scale for currencies without an entry in the ISO table.
    pub default_amount_scale: u32,
    /// Decimal places kept for share counts.
    pub share_scale: u32,
    /// Decimal places kept for a per-share quote.
    pub quote_scale: u32,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            default_amount_scale: 2,
            share_scale: 6,
            quote_scale: 4,
        }
    }
}

impl FormConfig {
    pub fn amount_scale(&self, currency_code: &str) -> u32 {
        money::minor_units(currency_code).unwrap_or(self.default_amount_scale)
    }

    pub fn round_amount(&self, value: Decimal, currency_code: &str) -> Decimal {
        money::round_half_up(value, self.amount_scale(currency_code))
    }
}
