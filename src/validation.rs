//! Field-level checks that gate the confirm action.

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use crate::models::TransactionDraft;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValidationError {
    MissingSecurity,
    MissingPortfolio,
    InvalidShares,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingSecurity => "missing security",
            Self::MissingPortfolio => "missing portfolio",
            Self::InvalidShares => "shares must be greater than zero",
        })
    }
}

/// Errors in a fixed order: security, portfolio, shares.
pub fn validate(draft: &TransactionDraft) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if draft.security.is_none() {
        errors.push(ValidationError::MissingSecurity);
    }
    if draft.portfolio.is_none() {
        errors.push(ValidationError::MissingPortfolio);
    }
    if draft.shares <= Decimal::ZERO {
        errors.push(ValidationError::InvalidShares);
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, Portfolio, Security, TransactionType};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn draft() -> TransactionDraft {
        let date = NaiveDate::from_ymd_opt(2024, 5, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        TransactionDraft::new(TransactionType::Buy, date)
    }

    #[test]
    fn empty_draft_reports_everything_in_order() {
        assert_eq!(
            validate(&draft()),
            vec![
                ValidationError::MissingSecurity,
                ValidationError::MissingPortfolio,
                ValidationError::InvalidShares,
            ]
        );
    }

    #[test]
    fn complete_draft_is_valid() {
        let mut d = draft();
        d.security = Some(Security::new("ACME", "EUR"));
        d.portfolio = Some(Portfolio::new(
            "Depot",
            Account {
                name: "Cash".into(),
                currency_code: "EUR".into(),
            },
        ));
        d.shares = dec!(0.5);
        assert!(validate(&d).is_empty());
    }

    #[test]
    fn zero_shares_is_invalid() {
        let mut d = draft();
        d.security = Some(Security::new("ACME", "EUR"));
        assert_eq!(
            validate(&d),
            vec![ValidationError::MissingPortfolio, ValidationError::InvalidShares]
        );
    }
}
