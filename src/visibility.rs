//! Whether the exchange-rate row is relevant for the current selection.

use serde::Serialize;

/// True iff both codes are known and differ.
pub fn needs_exchange_rate(security_currency: &str, account_currency: &str) -> bool {
    !security_currency.is_empty()
        && !account_currency.is_empty()
        && security_currency != account_currency
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Visibility {
    pub exchange_rate: bool,
    pub converted_lump_sum: bool,
}

impl Visibility {
    pub fn for_currencies(security_currency: &str, account_currency: &str) -> Self {
        let visible = needs_exchange_rate(security_currency, account_currency);
        Self {
            exchange_rate: visible,
            converted_lump_sum: visible,
        }
    }
}
