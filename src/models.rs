//! Common domain types: the catalog the form picks from, the draft being
//! edited and the snapshot handed to the renderer.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::FormError;

/// Kinds of security transaction the form can enter.
///
/// The set is closed; text that names anything else is rejected with
/// [`FormError::UnsupportedTransactionType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum TransactionType {
    Buy,
    Sell,
    DeliveryInbound,
    DeliveryOutbound,
}

impl TransactionType {
    pub const ALL: [TransactionType; 4] = [
        TransactionType::Buy,
        TransactionType::Sell,
        TransactionType::DeliveryInbound,
        TransactionType::DeliveryOutbound,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::DeliveryInbound => "delivery_inbound",
            Self::DeliveryOutbound => "delivery_outbound",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            "delivery_inbound" | "inbound_delivery" => Ok(Self::DeliveryInbound),
            "delivery_outbound" | "outbound_delivery" => Ok(Self::DeliveryOutbound),
            _ => Err(FormError::UnsupportedTransactionType(s.to_string())),
        }
    }
}

impl TryFrom<String> for TransactionType {
    type Error = FormError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Security {
    pub name: String,
    /// ISO 4217 code the security is quoted in.
    pub currency_code: String,
    #[serde(default)]
    pub retired: bool,
}

impl Security {
    pub fn new(name: impl Into<String>, currency_code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            currency_code: currency_code.into(),
            retired: false,
        }
    }
}

/// Cash account that settles a portfolio's buy / sell transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    pub currency_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    pub name: String,
    pub reference_account: Account,
    #[serde(default)]
    pub retired: bool,
}

impl Portfolio {
    pub fn new(name: impl Into<String>, account: Account) -> Self {
        Self {
            name: name.into(),
            reference_account: account,
            retired: false,
        }
    }

    pub fn currency_code(&self) -> &str {
        &self.reference_account.currency_code
    }
}

/// Securities and portfolios a form session can choose from.
#[derive(Debug, Clone, Default)]
pub struct Client {
    pub securities: Vec<Security>,
    pub portfolios: Vec<Portfolio>,
}

impl Client {
    pub fn active_securities(&self) -> impl Iterator<Item = &Security> {
        self.securities.iter().filter(|s| !s.retired)
    }

    pub fn active_portfolios(&self) -> impl Iterator<Item = &Portfolio> {
        self.portfolios.iter().filter(|p| !p.retired)
    }

    pub fn security(&self, name: &str) -> Option<&Security> {
        self.active_securities().find(|s| s.name == name)
    }

    pub fn portfolio(&self, name: &str) -> Option<&Portfolio> {
        self.active_portfolios().find(|p| p.name == name)
    }
}

// ---------------------------------------------------------------------------
// draft
// ---------------------------------------------------------------------------

/// Every field a renderer can address by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Security,
    Portfolio,
    Date,
    Shares,
    Quote,
    LumpSum,
    ExchangeRate,
    ConvertedLumpSum,
    Fees,
    Taxes,
    Total,
    Note,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Self::Security => "security",
            Self::Portfolio => "portfolio",
            Self::Date => "date",
            Self::Shares => "shares",
            Self::Quote => "quote",
            Self::LumpSum => "lump_sum",
            Self::ExchangeRate => "exchange_rate",
            Self::ConvertedLumpSum => "converted_lump_sum",
            Self::Fees => "fees",
            Self::Taxes => "taxes",
            Self::Total => "total",
            Self::Note => "note",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = FormError;

    /// Accepts both `snake_case` and `camelCase` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Ok(match key.as_str() {
            "security" => Self::Security,
            "portfolio" | "account" | "portfoliooraccount" => Self::Portfolio,
            "date" => Self::Date,
            "shares" => Self::Shares,
            "quote" => Self::Quote,
            "lumpsum" => Self::LumpSum,
            "exchangerate" => Self::ExchangeRate,
            "convertedlumpsum" => Self::ConvertedLumpSum,
            "fees" => Self::Fees,
            "taxes" => Self::Taxes,
            "total" => Self::Total,
            "note" => Self::Note,
            _ => return Err(FormError::invalid("field", format!("unknown field {s:?}"))),
        })
    }
}

/// The transaction being edited.
///
/// Primary inputs are written by the renderer; `lump_sum`,
/// `converted_lump_sum` and `total` are kept consistent by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub kind: TransactionType,
    pub security: Option<Security>,
    pub portfolio: Option<Portfolio>,
    pub date: NaiveDateTime,
    pub shares: Decimal,
    pub quote: Decimal,
    pub lump_sum: Decimal,
    pub exchange_rate: Decimal,
    pub converted_lump_sum: Decimal,
    pub fees: Decimal,
    pub taxes: Decimal,
    pub total: Decimal,
    pub note: String,
}

impl TransactionDraft {
    pub fn new(kind: TransactionType, date: NaiveDateTime) -> Self {
        Self {
            kind,
            security: None,
            portfolio: None,
            date,
            shares: Decimal::ZERO,
            quote: Decimal::ZERO,
            lump_sum: Decimal::ZERO,
            exchange_rate: Decimal::ONE,
            converted_lump_sum: Decimal::ZERO,
            fees: Decimal::ZERO,
            taxes: Decimal::ZERO,
            total: Decimal::ZERO,
            note: String::new(),
        }
    }

    /// Empty string while no security is chosen.
    pub fn security_currency_code(&self) -> &str {
        self.security
            .as_ref()
            .map(|s| s.currency_code.as_str())
            .unwrap_or("")
    }

    /// Empty string while no portfolio is chosen.
    pub fn account_currency_code(&self) -> &str {
        self.portfolio
            .as_ref()
            .map(Portfolio::currency_code)
            .unwrap_or("")
    }
}

/// Snapshot pushed to the renderer after every accepted edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedValues {
    pub lump_sum: Decimal,
    pub exchange_rate: Decimal,
    pub converted_lump_sum: Decimal,
    pub total: Decimal,
    pub security_currency_code: String,
    pub account_currency_code: String,
}

impl From<&TransactionDraft> for DerivedValues {
    fn from(d: &TransactionDraft) -> Self {
        Self {
            lump_sum: d.lump_sum,
            exchange_rate: d.exchange_rate,
            converted_lump_sum: d.converted_lump_sum,
            total: d.total,
            security_currency_code: d.security_currency_code().to_string(),
            account_currency_code: d.account_currency_code().to_string(),
        }
    }
}
