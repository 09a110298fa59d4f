//! Exchange-rate lookup used to seed the rate when the currency pair changes.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use tracing::warn;

/// Source of security-currency → account-currency conversion factors.
pub trait ExchangeRates {
    fn rate(&self, base: &str, term: &str, date: NaiveDate) -> Option<Decimal>;
}

impl<T: ExchangeRates + ?Sized> ExchangeRates for Arc<T> {
    fn rate(&self, base: &str, term: &str, date: NaiveDate) -> Option<Decimal> {
        (**self).rate(base, term, date)
    }
}

/// Rates that do not vary by date.
#[derive(Debug, Default, Clone)]
pub struct FixedRates {
    rates: HashMap<(String, String), Decimal>,
}

#[derive(Debug, Deserialize)]
struct RateRow {
    base: String,
    term: String,
    rate: Decimal,
}

impl FixedRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, base: &str, term: &str, rate: Decimal) {
        self.rates
            .insert((base.to_ascii_uppercase(), term.to_ascii_uppercase()), rate);
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Read a `base,term,rate` CSV. Rows that fail to parse or carry a
    /// non-positive rate are logged and skipped.
    pub fn from_csv<R: Read>(reader: R) -> csv::Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut rates = Self::new();
        for (idx, row) in rdr.deserialize::<RateRow>().enumerate() {
            match row {
                Ok(r) if r.rate > Decimal::ZERO => rates.insert(&r.base, &r.term, r.rate),
                Ok(r) => warn!(row = idx + 1, rate = %r.rate, "non-positive exchange rate"),
                Err(e) => warn!(row = idx + 1, %e, "rate-deserialize"),
            }
        }
        Ok(rates)
    }
}

impl ExchangeRates for FixedRates {
    fn rate(&self, base: &str, term: &str, _date: NaiveDate) -> Option<Decimal> {
        let base = base.to_ascii_uppercase();
        let term = term.to_ascii_uppercase();
        if base == term {
            return Some(Decimal::ONE);
        }
        if let Some(r) = self.rates.get(&(base.clone(), term.clone())) {
            return Some(*r);
        }
        self.rates
            .get(&(term, base))
            .and_then(|r| Decimal::ONE.checked_div(*r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn direct_and_inverse_lookup() {
        let mut rates = FixedRates::new();
        rates.insert("usd", "eur", dec!(0.8));

        assert_eq!(rates.rate("USD", "EUR", day()), Some(dec!(0.8)));
        assert_eq!(rates.rate("EUR", "USD", day()), Some(dec!(1.25)));
        assert_eq!(rates.rate("CHF", "CHF", day()), Some(Decimal::ONE));
        assert_eq!(rates.rate("CHF", "EUR", day()), None);
    }

    #[test]
    fn csv_rows_with_bad_rates_are_skipped() {
        let data = "base,term,rate\nUSD,EUR,0.90\nGBP,EUR,0\nCHF,EUR,abc\nJPY,EUR,0.0062\n";
        let rates = FixedRates::from_csv(data.as_bytes()).unwrap();

        assert_eq!(rates.len(), 2);
        assert_eq!(rates.rate("USD", "EUR", day()), Some(dec!(0.90)));
        assert_eq!(rates.rate("GBP", "EUR", day()), None);
    }
}
