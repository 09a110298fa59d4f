//! Error type shared by the form engine, plus the usual `Result<T>` alias.

use crate::validation::ValidationError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FormError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// A primary input was malformed or out of range. The draft is left
    /// untouched so the renderer can revert or flag the field inline.
    #[error("invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Confirm was attempted while validation errors are outstanding.
    #[error("missing required fields: {}", join(.0))]
    MissingRequiredField(Vec<ValidationError>),

    #[error("unsupported transaction type: {0:?}")]
    UnsupportedTransactionType(String),

    /// An existing transaction of another model family was handed to the form.
    #[error("cannot edit a {source_type} transaction in a {form_type} form")]
    IncompatibleSource {
        form_type: &'static str,
        source_type: &'static str,
    },
}

impl FormError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_are_listed_in_message() {
        let err = FormError::MissingRequiredField(vec![
            ValidationError::MissingSecurity,
            ValidationError::InvalidShares,
        ]);
        assert_eq!(
            err.to_string(),
            "missing required fields: missing security, shares must be greater than zero"
        );
    }

    #[test]
    fn invalid_field_names_the_field() {
        let err = FormError::invalid("shares", "must not be negative");
        assert_eq!(err.to_string(), "invalid value for shares: must not be negative");
    }
}
