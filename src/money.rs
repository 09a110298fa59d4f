//! Fixed-point helpers. Never use floating-point for amounts.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round to `scale` places, ties away from zero ("half-up" for positive
/// amounts, which are the only ones the form produces).
pub fn round_half_up(value: Decimal, scale: u32) -> Decimal {
    value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}

/// ISO 4217 minor units for currencies that deviate from two decimals.
///
/// Returns `None` for two-decimal currencies and unknown codes so the
/// caller can apply its configured default.
pub fn minor_units(currency_code: &str) -> Option<u32> {
    match currency_code.trim().to_ascii_uppercase().as_str() {
        "JPY" | "KRW" | "ISK" | "CLP" | "VND" | "PYG" | "UGX" | "XOF" | "XAF" => Some(0),
        "BHD" | "KWD" | "JOD" | "OMR" | "TND" | "IQD" | "LYD" => Some(3),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn ties_round_up() {
        assert_eq!(round_half_up(dec!(0.125), 2), dec!(0.13));
        assert_eq!(round_half_up(dec!(0.124), 2), dec!(0.12));
        assert_eq!(round_half_up(dec!(2.5), 0), dec!(3));
    }

    #[test]
    fn minor_units_table() {
        assert_eq!(minor_units("jpy"), Some(0));
        assert_eq!(minor_units("BHD"), Some(3));
        assert_eq!(minor_units("EUR"), None);
        assert_eq!(minor_units(""), None);
    }
}
