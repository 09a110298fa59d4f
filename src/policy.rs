//! Per-type rules: which way fees and taxes move the total, what the total
//! is called and which transaction model the type belongs to.

use rust_decimal::Decimal;

use crate::models::TransactionType;

/// The two entity shapes a form can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionModel {
    /// Cash-settled trade: a portfolio transaction paired with an account
    /// transaction.
    BuySell,
    /// Securities moved in or out of a portfolio without cash.
    Delivery,
}

impl TransactionModel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BuySell => "buy/sell",
            Self::Delivery => "delivery",
        }
    }
}

impl TransactionType {
    /// `+1` when fees and taxes are added to the total, `-1` when deducted.
    pub fn sign(self) -> Decimal {
        match self {
            Self::Buy | Self::DeliveryInbound => Decimal::ONE,
            Self::Sell | Self::DeliveryOutbound => Decimal::NEGATIVE_ONE,
        }
    }

    /// Prefix shown in front of the fee and tax labels.
    pub fn sign_prefix(self) -> &'static str {
        match self {
            Self::Buy | Self::DeliveryInbound => "+ ",
            Self::Sell | Self::DeliveryOutbound => "- ",
        }
    }

    pub fn total_label(self) -> &'static str {
        match self {
            Self::Buy => "Debit note",
            Self::Sell => "Credit note",
            Self::DeliveryInbound => "Value of inbound delivery",
            Self::DeliveryOutbound => "Value of outbound delivery",
        }
    }

    pub fn model(self) -> TransactionModel {
        match self {
            Self::Buy | Self::Sell => TransactionModel::BuySell,
            Self::DeliveryInbound | Self::DeliveryOutbound => TransactionModel::Delivery,
        }
    }

    /// Whether a form opened for `self` can edit a transaction of `other`.
    pub fn accepts(self, other: TransactionType) -> bool {
        self.model() == other.model()
    }
}
