//! Pure derivation rules behind the form:
//!
//! ```text
//! lump_sum           = round(shares × quote)                 security currency
//! converted_lump_sum = round(lump_sum × exchange_rate)       account currency
//! total              = converted_lump_sum ± fees ± taxes     sign per type
//! ```
//!
//! plus the reverse rules used when the user edits a derived field.

use rust_decimal::Decimal;

use crate::errors::{FormError, Result};
use crate::models::TransactionType;
use crate::money::round_half_up;

/// Fails instead of panicking when the product leaves `Decimal`'s range.
pub fn lump_sum(shares: Decimal, quote: Decimal, scale: u32) -> Result<Decimal> {
    shares
        .checked_mul(quote)
        .map(|v| round_half_up(v, scale))
        .ok_or_else(|| out_of_range("lump_sum"))
}

pub fn convert(lump_sum: Decimal, exchange_rate: Decimal, scale: u32) -> Result<Decimal> {
    lump_sum
        .checked_mul(exchange_rate)
        .map(|v| round_half_up(v, scale))
        .ok_or_else(|| out_of_range("converted_lump_sum"))
}

pub fn total(
    converted_lump_sum: Decimal,
    fees: Decimal,
    taxes: Decimal,
    kind: TransactionType,
    scale: u32,
) -> Result<Decimal> {
    let sign = kind.sign();
    converted_lump_sum
        .checked_add(sign * fees)
        .and_then(|v| v.checked_add(sign * taxes))
        .map(|v| round_half_up(v, scale))
        .ok_or_else(|| out_of_range("total"))
}

/// Exchange rate that turns `lump_sum` into `converted_lump_sum`.
pub fn implied_rate(converted_lump_sum: Decimal, lump_sum: Decimal) -> Result<Decimal> {
    converted_lump_sum
        .checked_div(lump_sum)
        .map(|r| r.normalize())
        .ok_or_else(|| FormError::invalid("converted_lump_sum", "lump sum is zero"))
}

/// Per-share quote that reproduces `lump_sum` for `shares`.
pub fn quote_for(lump_sum: Decimal, shares: Decimal) -> Result<Decimal> {
    lump_sum
        .checked_div(shares)
        .map(|q| q.normalize())
        .ok_or_else(|| FormError::invalid("lump_sum", "shares are zero"))
}

/// Converted lump sum implied by a total once fees and taxes are removed.
pub fn converted_for_total(
    total: Decimal,
    fees: Decimal,
    taxes: Decimal,
    kind: TransactionType,
) -> Result<Decimal> {
    let converted = fees
        .checked_add(taxes)
        .and_then(|charges| total.checked_sub(kind.sign() * charges))
        .ok_or_else(|| out_of_range("total"))?;
    if converted.is_sign_negative() && !converted.is_zero() {
        return Err(FormError::invalid(
            "total",
            format!("fees and taxes exceed the {}", kind.total_label().to_lowercase()),
        ));
    }
    Ok(converted)
}

/// Lump sum in security currency behind a converted amount.
pub fn unconvert(converted_lump_sum: Decimal, exchange_rate: Decimal) -> Result<Decimal> {
    converted_lump_sum
        .checked_div(exchange_rate)
        .map(|l| l.normalize())
        .ok_or_else(|| FormError::invalid("total", "exchange rate is zero"))
}

fn out_of_range(field: &'static str) -> FormError {
    FormError::invalid(field, "amount out of range")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use crate::models::TransactionType::*;

    #[test]
    fn lump_sum_is_rounded_to_scale() {
        assert_eq!(lump_sum(dec!(10), dec!(25.00), 2).unwrap(), dec!(250.00));
        assert_eq!(lump_sum(dec!(3), dec!(0.3333), 2).unwrap(), dec!(1.00));
        assert_eq!(lump_sum(dec!(0.5), dec!(0.01), 2).unwrap(), dec!(0.01));
        assert_eq!(lump_sum(dec!(0), dec!(99.99), 2).unwrap(), dec!(0));
    }

    #[test]
    fn conversion_is_rounded_to_account_scale() {
        assert_eq!(convert(dec!(100.00), dec!(0.90), 2).unwrap(), dec!(90.00));
        assert_eq!(convert(dec!(33.33), dec!(1.1111), 2).unwrap(), dec!(37.03));
        assert_eq!(convert(dec!(10.00), dec!(151.257), 0).unwrap(), dec!(1513));
    }

    #[test]
    fn total_applies_sign_per_type() {
        assert_eq!(total(dec!(250.00), dec!(1.00), dec!(0), Buy, 2).unwrap(), dec!(251.00));
        assert_eq!(total(dec!(500.00), dec!(2.00), dec!(3.00), Sell, 2).unwrap(), dec!(495.00));
        assert_eq!(total(dec!(100), dec!(1), dec!(1), DeliveryInbound, 2).unwrap(), dec!(102));
        assert_eq!(total(dec!(100), dec!(1), dec!(1), DeliveryOutbound, 2).unwrap(), dec!(98));
    }

    #[test]
    fn implied_rate_reproduces_converted_amount() {
        let rate = implied_rate(dec!(91.37), dec!(100.00)).unwrap();
        assert_eq!(convert(dec!(100.00), rate, 2).unwrap(), dec!(91.37));

        let rate = implied_rate(dec!(10.00), dec!(3.00)).unwrap();
        assert_eq!(convert(dec!(3.00), rate, 2).unwrap(), dec!(10.00));
    }

    #[test]
    fn reverse_rules_reject_zero_divisors() {
        assert!(implied_rate(dec!(1), Decimal::ZERO).is_err());
        assert!(quote_for(dec!(1), Decimal::ZERO).is_err());
        assert!(unconvert(dec!(1), Decimal::ZERO).is_err());
    }

    #[test]
    fn converted_for_total_removes_fees_and_taxes() {
        assert_eq!(
            converted_for_total(dec!(251.00), dec!(1.00), dec!(0), Buy).unwrap(),
            dec!(250.00)
        );
        assert_eq!(
            converted_for_total(dec!(495.00), dec!(2.00), dec!(3.00), Sell).unwrap(),
            dec!(500.00)
        );
        assert!(converted_for_total(dec!(1.00), dec!(5.00), dec!(0), Buy).is_err());
    }

    #[test]
    fn overflow_is_reported_not_panicked() {
        let err = lump_sum(dec!(1000000000000000), dec!(100000000000000), 2).unwrap_err();
        assert_eq!(err, FormError::invalid("lump_sum", "amount out of range"));

        assert!(convert(Decimal::MAX, dec!(2), 2).is_err());

        let big = dec!(70000000000000000000000000000);
        assert!(total(dec!(0), big, big, Buy, 2).is_err());
        assert!(converted_for_total(dec!(1), big, big, Sell).is_err());
    }
}
