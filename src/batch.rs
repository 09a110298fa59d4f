//! Row-at-a-time driver used by the CLI: every CSV row is typed into a fresh
//! form session the way a user would fill the dialog, and the derived
//! amounts are written back out.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::config::FormConfig;
use crate::engine::TransactionForm;
use crate::errors::Result;
use crate::models::{Account, Client, Field, Portfolio, Security, TransactionType};
use crate::rates::FixedRates;

/// A single input row. Amounts stay raw text so they go through the same
/// parsing as interactive edits.
#[derive(Debug, Deserialize)]
pub struct DraftRow {
    #[serde(rename = "type")]
    pub kind: String,
    pub security: String,
    pub security_currency: String,
    pub portfolio: String,
    pub account_currency: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub shares: String,
    #[serde(default)]
    pub quote: String,
    #[serde(default)]
    pub exchange_rate: String,
    #[serde(default)]
    pub fees: String,
    #[serde(default)]
    pub taxes: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Serialize)]
pub struct ResultRow {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub security: String,
    pub portfolio: String,
    pub shares: Decimal,
    pub quote: Decimal,
    pub lump_sum: Decimal,
    pub security_currency: String,
    pub exchange_rate: Decimal,
    pub converted_lump_sum: Decimal,
    pub fees: Decimal,
    pub taxes: Decimal,
    pub total: Decimal,
    pub account_currency: String,
    pub total_label: &'static str,
    /// `;`-joined validation errors, empty when the draft can be confirmed.
    pub errors: String,
}

pub fn process_row(
    row: &DraftRow,
    config: FormConfig,
    rates: &Arc<FixedRates>,
) -> Result<ResultRow> {
    let kind: TransactionType = row.kind.parse()?;

    let client = Client {
        securities: vec![Security::new(&row.security, &row.security_currency)],
        portfolios: vec![Portfolio::new(
            &row.portfolio,
            Account {
                name: row.portfolio.clone(),
                currency_code: row.account_currency.clone(),
            },
        )],
    };

    let mut form = TransactionForm::new(client, kind)
        .with_config(config)
        .with_rates(Box::new(Arc::clone(rates)));

    form.set_field(Field::Security, &row.security)?;
    form.set_field(Field::Portfolio, &row.portfolio)?;
    if !row.date.trim().is_empty() {
        form.set_field(Field::Date, &row.date)?;
    }
    form.set_field(Field::Shares, &row.shares)?;
    form.set_field(Field::Quote, &row.quote)?;
    if !row.exchange_rate.trim().is_empty() {
        if form.visibility().exchange_rate {
            form.set_field(Field::ExchangeRate, &row.exchange_rate)?;
        } else {
            debug!(security = %row.security, "exchange rate ignored, currencies match");
        }
    }
    form.set_field(Field::Fees, &row.fees)?;
    form.set_field(Field::Taxes, &row.taxes)?;
    form.set_field(Field::Note, &row.note)?;

    let d = form.draft();
    Ok(ResultRow {
        kind,
        security: row.security.clone(),
        portfolio: row.portfolio.clone(),
        shares: d.shares,
        quote: d.quote,
        lump_sum: d.lump_sum,
        security_currency: d.security_currency_code().to_string(),
        exchange_rate: d.exchange_rate,
        converted_lump_sum: d.converted_lump_sum,
        fees: d.fees,
        taxes: d.taxes,
        total: d.total,
        account_currency: d.account_currency_code().to_string(),
        total_label: kind.total_label(),
        errors: form
            .errors()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FormError;
    use rust_decimal_macros::dec;

    fn no_rates() -> Arc<FixedRates> {
        Arc::new(FixedRates::new())
    }

    fn row(kind: &str, sec_ccy: &str, acc_ccy: &str) -> DraftRow {
        DraftRow {
            kind: kind.into(),
            security: "ACME".into(),
            security_currency: sec_ccy.into(),
            portfolio: "Depot".into(),
            account_currency: acc_ccy.into(),
            date: "2024-02-01".into(),
            shares: "2".into(),
            quote: "50.00".into(),
            exchange_rate: String::new(),
            fees: "1.00".into(),
            taxes: String::new(),
            note: String::new(),
        }
    }

    #[test]
    fn row_uses_rate_table_when_column_is_empty() {
        let mut rates = FixedRates::new();
        rates.insert("USD", "EUR", dec!(0.90));

        let out = process_row(&row("buy", "USD", "EUR"), FormConfig::default(), &Arc::new(rates))
            .unwrap();
        assert_eq!(out.lump_sum, dec!(100.00));
        assert_eq!(out.converted_lump_sum, dec!(90.00));
        assert_eq!(out.total, dec!(91.00));
        assert_eq!(out.total_label, "Debit note");
        assert!(out.errors.is_empty());
    }

    #[test]
    fn explicit_rate_wins_over_table() {
        let mut r = row("sell", "USD", "EUR");
        r.exchange_rate = "0.5".into();
        let out = process_row(&r, FormConfig::default(), &no_rates()).unwrap();
        assert_eq!(out.converted_lump_sum, dec!(50.00));
        assert_eq!(out.total, dec!(49.00));
    }

    #[test]
    fn zero_shares_are_reported_not_rejected() {
        let mut r = row("delivery_inbound", "EUR", "EUR");
        r.shares = "0".into();
        let out = process_row(&r, FormConfig::default(), &no_rates()).unwrap();
        assert_eq!(out.errors, "shares must be greater than zero");
    }

    #[test]
    fn unknown_type_is_an_error() {
        let err = process_row(&row("dividend", "EUR", "EUR"), FormConfig::default(), &no_rates())
            .unwrap_err();
        assert!(matches!(err, FormError::UnsupportedTransactionType(_)));
    }
}
