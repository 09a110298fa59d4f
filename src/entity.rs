//! Transactions handed to (and loaded back from) the persistence layer.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{Account, Portfolio, Security, TransactionType};
use crate::policy::TransactionModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    GrossValue,
    Fee,
    Tax,
}

/// Security-currency side of a converted unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forex {
    pub amount: Decimal,
    pub currency_code: String,
    pub exchange_rate: Decimal,
}

/// One component of a transaction amount, in the account currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unit {
    pub kind: UnitKind,
    pub amount: Decimal,
    pub forex: Option<Forex>,
}

impl Unit {
    pub fn new(kind: UnitKind, amount: Decimal) -> Self {
        Self {
            kind,
            amount,
            forex: None,
        }
    }
}

/// Fields common to both entity shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityTransaction {
    pub kind: TransactionType,
    pub security: Security,
    pub portfolio: Portfolio,
    pub date: NaiveDateTime,
    pub shares: Decimal,
    /// Total, in `currency_code`.
    pub amount: Decimal,
    pub currency_code: String,
    pub units: Vec<Unit>,
    pub note: String,
}

impl SecurityTransaction {
    pub fn unit(&self, kind: UnitKind) -> Option<&Unit> {
        self.units.iter().find(|u| u.kind == kind)
    }

    /// Sum of all units of `kind`; zero when absent.
    pub fn unit_sum(&self, kind: UnitKind) -> Decimal {
        self.units
            .iter()
            .filter(|u| u.kind == kind)
            .map(|u| u.amount)
            .sum()
    }
}

/// Cash-settled buy or sell: the portfolio side plus the settling account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuySellEntry {
    pub transaction: SecurityTransaction,
    pub account: Account,
}

/// Inbound or outbound delivery of shares, no cash movement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryTransaction {
    pub transaction: SecurityTransaction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum TransactionEntity {
    BuySell(BuySellEntry),
    Delivery(DeliveryTransaction),
}

impl TransactionEntity {
    pub fn transaction(&self) -> &SecurityTransaction {
        match self {
            Self::BuySell(e) => &e.transaction,
            Self::Delivery(d) => &d.transaction,
        }
    }

    pub fn kind(&self) -> TransactionType {
        self.transaction().kind
    }

    pub fn model(&self) -> TransactionModel {
        match self {
            Self::BuySell(_) => TransactionModel::BuySell,
            Self::Delivery(_) => TransactionModel::Delivery,
        }
    }
}
