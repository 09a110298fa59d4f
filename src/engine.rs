//! Editing session for one security transaction.
//!
//! The renderer pushes raw field edits in; after every accepted edit the
//! engine re-derives the dependent amounts, re-evaluates visibility and
//! validation, and notifies its listeners before returning.
//!
//! ```rust,ignore
//! let mut form = TransactionForm::new(client, TransactionType::Buy);
//! form.subscribe(Box::new(renderer));
//! form.preselect();
//! form.set_field(Field::Shares, "10")?;
//! form.set_field(Field::Quote, "25.00")?;
//! let entity = form.to_transaction_entity()?;
//! ```

use chrono::{Local, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::config::FormConfig;
use crate::derive;
use crate::entity::{
    BuySellEntry, DeliveryTransaction, Forex, SecurityTransaction, TransactionEntity, Unit,
    UnitKind,
};
use crate::errors::{FormError, Result};
use crate::models::{Client, DerivedValues, Field, Portfolio, Security, TransactionDraft, TransactionType};
use crate::money::round_half_up;
use crate::policy::TransactionModel;
use crate::rates::ExchangeRates;
use crate::validation::{validate, ValidationError};
use crate::visibility::{needs_exchange_rate, Visibility};

/// Receives the engine's outbound notifications.
pub trait FormListener {
    fn on_fields_changed(&mut self, _values: &DerivedValues) {}
    fn on_visibility_changed(&mut self, _visibility: Visibility) {}
    fn on_validation_changed(&mut self, _errors: &[ValidationError]) {}
}

/// Which member of the conversion pair the user may type into; the other
/// one is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionInput {
    #[default]
    ExchangeRate,
    ConvertedLumpSum,
}

pub struct TransactionForm {
    client: Client,
    config: FormConfig,
    rates: Option<Box<dyn ExchangeRates>>,
    conversion_input: ConversionInput,
    draft: TransactionDraft,
    visibility: Visibility,
    errors: Vec<ValidationError>,
    listeners: Vec<Box<dyn FormListener>>,
}

impl TransactionForm {
    pub fn new(client: Client, kind: TransactionType) -> Self {
        let draft = TransactionDraft::new(kind, Local::now().naive_local());
        let errors = validate(&draft);
        Self {
            client,
            config: FormConfig::default(),
            rates: None,
            conversion_input: ConversionInput::default(),
            draft,
            visibility: Visibility::default(),
            errors,
            listeners: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: FormConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_rates(mut self, rates: Box<dyn ExchangeRates>) -> Self {
        self.rates = Some(rates);
        self
    }

    // ------------------------------------------------------------- accessors

    pub fn draft(&self) -> &TransactionDraft {
        &self.draft
    }

    pub fn kind(&self) -> TransactionType {
        self.draft.kind
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn is_confirmable(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn conversion_input(&self) -> ConversionInput {
        self.conversion_input
    }

    /// Register a listener and bring it up to date with the current state.
    pub fn subscribe(&mut self, mut listener: Box<dyn FormListener>) {
        listener.on_fields_changed(&DerivedValues::from(&self.draft));
        listener.on_visibility_changed(self.visibility);
        listener.on_validation_changed(&self.errors);
        self.listeners.push(listener);
    }

    pub fn set_conversion_input(&mut self, input: ConversionInput) {
        debug!(?input, "conversion input switched");
        self.conversion_input = input;
    }

    // --------------------------------------------------------------- inbound

    /// Parse `raw` for `field` and apply it.
    pub fn set_field(&mut self, field: Field, raw: &str) -> Result<()> {
        let raw = raw.trim();
        match field {
            Field::Security => {
                let security = self.lookup(field, raw, |c, n| c.security(n).cloned())?;
                self.set_security(security)
            }
            Field::Portfolio => {
                let portfolio = self.lookup(field, raw, |c, n| c.portfolio(n).cloned())?;
                self.set_portfolio(portfolio)
            }
            Field::Date => self.set_date(parse_date(raw)?),
            Field::Note => self.set_note(raw),
            Field::Shares => self.set_shares(parse_amount(field, raw)?),
            Field::Quote => self.set_quote(parse_amount(field, raw)?),
            Field::LumpSum => self.set_lump_sum(parse_amount(field, raw)?),
            Field::ExchangeRate => self.set_exchange_rate(parse_amount(field, raw)?),
            Field::ConvertedLumpSum => self.set_converted_lump_sum(parse_amount(field, raw)?),
            Field::Fees => self.set_fees(parse_amount(field, raw)?),
            Field::Taxes => self.set_taxes(parse_amount(field, raw)?),
            Field::Total => self.set_total(parse_amount(field, raw)?),
        }
    }

    pub fn set_security(&mut self, security: Option<Security>) -> Result<()> {
        self.edit(Field::Security, |form, d| {
            let before = currency_pair(d);
            d.security = security;
            form.currencies_changed(d, before)?;
            Ok(())
        })
    }

    pub fn set_portfolio(&mut self, portfolio: Option<Portfolio>) -> Result<()> {
        self.edit(Field::Portfolio, |form, d| {
            let before = currency_pair(d);
            d.portfolio = portfolio;
            form.currencies_changed(d, before)?;
            Ok(())
        })
    }

    pub fn set_date(&mut self, date: NaiveDateTime) -> Result<()> {
        self.edit(Field::Date, |form, d| {
            d.date = date;
            if needs_fx(d) && form.conversion_input == ConversionInput::ExchangeRate {
                if let Some(rate) = form.lookup_rate(d) {
                    d.exchange_rate = rate;
                    form.derive_from_lump_sum(d)?;
                }
            }
            Ok(())
        })
    }

    pub fn set_note(&mut self, note: &str) -> Result<()> {
        self.edit(Field::Note, |_, d| {
            d.note = note.to_string();
            Ok(())
        })
    }

    pub fn set_shares(&mut self, shares: Decimal) -> Result<()> {
        self.edit(Field::Shares, |form, d| {
            ensure_not_negative(Field::Shares, shares)?;
            d.shares = round_half_up(shares, form.config.share_scale);
            form.derive_from_prices(d)?;
            Ok(())
        })
    }

    pub fn set_quote(&mut self, quote: Decimal) -> Result<()> {
        self.edit(Field::Quote, |form, d| {
            ensure_not_negative(Field::Quote, quote)?;
            d.quote = round_half_up(quote, form.config.quote_scale);
            form.derive_from_prices(d)?;
            Ok(())
        })
    }

    /// Direct lump-sum edit: the quote is solved for the current shares.
    pub fn set_lump_sum(&mut self, lump_sum: Decimal) -> Result<()> {
        self.edit(Field::LumpSum, |form, d| {
            ensure_not_negative(Field::LumpSum, lump_sum)?;
            let lump_sum = form.config.round_amount(lump_sum, d.security_currency_code());
            d.quote = derive::quote_for(lump_sum, d.shares)?;
            d.lump_sum = lump_sum;
            form.derive_from_lump_sum(d)?;
            Ok(())
        })
    }

    pub fn set_exchange_rate(&mut self, rate: Decimal) -> Result<()> {
        self.edit(Field::ExchangeRate, |form, d| {
            form.ensure_conversion_editable(Field::ExchangeRate, d)?;
            if rate <= Decimal::ZERO {
                return Err(FormError::invalid(
                    Field::ExchangeRate.name(),
                    "must be greater than zero",
                ));
            }
            d.exchange_rate = rate;
            form.derive_from_lump_sum(d)?;
            Ok(())
        })
    }

    /// Direct edit of the converted amount: the exchange rate is solved for
    /// the current lump sum.
    pub fn set_converted_lump_sum(&mut self, converted: Decimal) -> Result<()> {
        self.edit(Field::ConvertedLumpSum, |form, d| {
            form.ensure_conversion_editable(Field::ConvertedLumpSum, d)?;
            if converted <= Decimal::ZERO {
                return Err(FormError::invalid(
                    Field::ConvertedLumpSum.name(),
                    "must be greater than zero",
                ));
            }
            let converted = form.config.round_amount(converted, d.account_currency_code());
            d.exchange_rate = derive::implied_rate(converted, d.lump_sum)?;
            d.converted_lump_sum = converted;
            form.derive_total(d)?;
            Ok(())
        })
    }

    pub fn set_fees(&mut self, fees: Decimal) -> Result<()> {
        self.edit(Field::Fees, |form, d| {
            ensure_not_negative(Field::Fees, fees)?;
            d.fees = form.config.round_amount(fees, settlement_currency(d));
            form.derive_total(d)?;
            Ok(())
        })
    }

    pub fn set_taxes(&mut self, taxes: Decimal) -> Result<()> {
        self.edit(Field::Taxes, |form, d| {
            ensure_not_negative(Field::Taxes, taxes)?;
            d.taxes = form.config.round_amount(taxes, settlement_currency(d));
            form.derive_total(d)?;
            Ok(())
        })
    }

    /// Reverse edit of the total. The converted lump sum absorbs the change;
    /// fees and taxes stay as entered. With a currency conversion in play the
    /// total snaps to the nearest value the security-currency lump sum can
    /// express.
    pub fn set_total(&mut self, total: Decimal) -> Result<()> {
        self.edit(Field::Total, |form, d| {
            ensure_not_negative(Field::Total, total)?;
            let total = form.config.round_amount(total, settlement_currency(d));
            let converted = derive::converted_for_total(total, d.fees, d.taxes, d.kind)?;
            let lump_sum = if needs_fx(d) {
                let raw = derive::unconvert(converted, d.exchange_rate)?;
                form.config.round_amount(raw, d.security_currency_code())
            } else {
                converted
            };
            d.quote = derive::quote_for(lump_sum, d.shares)?;
            d.lump_sum = lump_sum;
            form.derive_from_lump_sum(d)?;
            Ok(())
        })
    }

    /// Switch between the directions of the form's model (buy / sell or
    /// inbound / outbound); fees and taxes flip sign in the total.
    pub fn select_transaction_type(&mut self, kind: TransactionType) -> Result<()> {
        let from = self.draft.kind;
        if !from.accepts(kind) {
            warn!(%from, to = %kind, "transaction type switch rejected");
            return Err(FormError::IncompatibleSource {
                form_type: from.model().as_str(),
                source_type: kind.model().as_str(),
            });
        }

        let mut next = self.draft.clone();
        next.kind = kind;
        self.derive_total(&mut next)?;
        debug!(%from, to = %kind, total = %next.total, "transaction type switched");
        self.commit(next);
        Ok(())
    }

    /// Seed the draft from an existing transaction for editing.
    pub fn load_from(&mut self, source: &TransactionEntity) -> Result<()> {
        let kind = self.draft.kind;
        if !kind.accepts(source.kind()) {
            return Err(FormError::IncompatibleSource {
                form_type: kind.model().as_str(),
                source_type: source.model().as_str(),
            });
        }

        let tx = source.transaction();
        let mut next = TransactionDraft::new(tx.kind, tx.date);
        next.security = Some(tx.security.clone());
        next.portfolio = Some(tx.portfolio.clone());
        next.shares = tx.shares;
        next.note = tx.note.clone();
        next.fees = tx.unit_sum(UnitKind::Fee);
        next.taxes = tx.unit_sum(UnitKind::Tax);

        match tx.unit(UnitKind::GrossValue) {
            Some(Unit {
                forex: Some(fx), ..
            }) if needs_fx(&next) => {
                next.lump_sum = fx.amount;
                next.exchange_rate = fx.exchange_rate;
            }
            Some(unit) => next.lump_sum = unit.amount,
            None => {
                next.lump_sum = derive::converted_for_total(tx.amount, next.fees, next.taxes, tx.kind)?;
            }
        }
        if next.shares.is_zero() {
            // no quote reproduces a gross value without shares
            debug!(gross = %next.lump_sum, "gross value dropped, source has no shares");
            next.lump_sum = Decimal::ZERO;
        } else {
            next.quote = derive::quote_for(next.lump_sum, next.shares)?;
        }
        self.derive_from_lump_sum(&mut next)?;

        debug!(kind = %tx.kind, security = %tx.security.name, "loaded existing transaction");
        self.commit(next);
        Ok(())
    }

    /// Discard all edits and start over with an empty draft of the same type.
    pub fn reset(&mut self) {
        debug!(kind = %self.draft.kind, "form reset");
        let next = TransactionDraft::new(self.draft.kind, Local::now().naive_local());
        self.commit(next);
    }

    /// Pick the portfolio when exactly one is active, and the first active
    /// security if there is any.
    pub fn preselect(&mut self) -> Result<()> {
        let only = {
            let mut portfolios = self.client.active_portfolios();
            match (portfolios.next(), portfolios.next()) {
                (Some(p), None) => Some(p.clone()),
                _ => None,
            }
        };
        let first = self.client.active_securities().next().cloned();

        if let Some(portfolio) = only {
            self.set_portfolio(Some(portfolio))?;
        }
        if let Some(security) = first {
            self.set_security(Some(security))?;
        }
        Ok(())
    }

    // ----------------------------------------------------------- persistence

    /// Build the entity for the persistence layer. Rejected while any
    /// validation error is outstanding.
    pub fn to_transaction_entity(&self) -> Result<TransactionEntity> {
        if !self.errors.is_empty() {
            return Err(FormError::MissingRequiredField(self.errors.clone()));
        }
        let d = &self.draft;
        let (Some(security), Some(portfolio)) = (d.security.clone(), d.portfolio.clone()) else {
            return Err(FormError::MissingRequiredField(validate(d)));
        };

        let mut gross = Unit::new(UnitKind::GrossValue, d.converted_lump_sum);
        if needs_fx(d) {
            gross.forex = Some(Forex {
                amount: d.lump_sum,
                currency_code: security.currency_code.clone(),
                exchange_rate: d.exchange_rate,
            });
        }
        let mut units = vec![gross];
        if !d.fees.is_zero() {
            units.push(Unit::new(UnitKind::Fee, d.fees));
        }
        if !d.taxes.is_zero() {
            units.push(Unit::new(UnitKind::Tax, d.taxes));
        }

        let account = portfolio.reference_account.clone();
        let transaction = SecurityTransaction {
            kind: d.kind,
            currency_code: settlement_currency(d).to_string(),
            security,
            portfolio,
            date: d.date,
            shares: d.shares,
            amount: d.total,
            units,
            note: d.note.clone(),
        };

        Ok(match d.kind.model() {
            TransactionModel::BuySell => {
                TransactionEntity::BuySell(BuySellEntry { transaction, account })
            }
            TransactionModel::Delivery => {
                TransactionEntity::Delivery(DeliveryTransaction { transaction })
            }
        })
    }

    // ------------------------------------------------------------- internals

    /// Apply `f` to a copy of the draft; on success the copy replaces the
    /// draft and listeners are notified, on failure nothing changes.
    fn edit<F>(&mut self, field: Field, f: F) -> Result<()>
    where
        F: FnOnce(&Self, &mut TransactionDraft) -> Result<()>,
    {
        let mut next = self.draft.clone();
        match f(self, &mut next) {
            Ok(()) => {
                debug!(%field, total = %next.total, "edit accepted");
                self.commit(next);
                Ok(())
            }
            Err(e) => {
                warn!(%field, error = %e, "edit rejected");
                Err(e)
            }
        }
    }

    fn commit(&mut self, next: TransactionDraft) {
        self.draft = next;

        let values = DerivedValues::from(&self.draft);
        for l in &mut self.listeners {
            l.on_fields_changed(&values);
        }

        let visibility = Visibility::for_currencies(
            self.draft.security_currency_code(),
            self.draft.account_currency_code(),
        );
        if visibility != self.visibility {
            self.visibility = visibility;
            for l in &mut self.listeners {
                l.on_visibility_changed(visibility);
            }
        }

        let errors = validate(&self.draft);
        if errors != self.errors {
            self.errors = errors;
            for l in &mut self.listeners {
                l.on_validation_changed(&self.errors);
            }
        }
    }

    fn lookup<T>(
        &self,
        field: Field,
        name: &str,
        find: impl Fn(&Client, &str) -> Option<T>,
    ) -> Result<Option<T>> {
        if name.is_empty() {
            return Ok(None);
        }
        find(&self.client, name)
            .map(Some)
            .ok_or_else(|| FormError::invalid(field.name(), format!("no active {field} named {name:?}")))
    }

    fn lookup_rate(&self, d: &TransactionDraft) -> Option<Decimal> {
        self.rates.as_ref()?.rate(
            d.security_currency_code(),
            d.account_currency_code(),
            d.date.date(),
        )
    }

    fn ensure_conversion_editable(&self, field: Field, d: &TransactionDraft) -> Result<()> {
        if !needs_fx(d) {
            return Err(FormError::invalid(
                field.name(),
                "security and account share a currency",
            ));
        }
        let editable = match self.conversion_input {
            ConversionInput::ExchangeRate => Field::ExchangeRate,
            ConversionInput::ConvertedLumpSum => Field::ConvertedLumpSum,
        };
        if field != editable {
            return Err(FormError::invalid(
                field.name(),
                format!("derived from {editable}"),
            ));
        }
        Ok(())
    }

    fn currencies_changed(&self, d: &mut TransactionDraft, before: (String, String)) -> Result<()> {
        if currency_pair(d) != before {
            d.exchange_rate = if needs_fx(d) {
                self.lookup_rate(d).unwrap_or(Decimal::ONE)
            } else {
                Decimal::ONE
            };
        }
        self.derive_from_prices(d)
    }

    fn derive_from_prices(&self, d: &mut TransactionDraft) -> Result<()> {
        let scale = self.config.amount_scale(d.security_currency_code());
        d.lump_sum = derive::lump_sum(d.shares, d.quote, scale)?;
        self.derive_from_lump_sum(d)
    }

    fn derive_from_lump_sum(&self, d: &mut TransactionDraft) -> Result<()> {
        if needs_fx(d) {
            let scale = self.config.amount_scale(d.account_currency_code());
            d.converted_lump_sum = derive::convert(d.lump_sum, d.exchange_rate, scale)?;
        } else {
            d.exchange_rate = Decimal::ONE;
            d.converted_lump_sum = d.lump_sum;
        }
        self.derive_total(d)
    }

    fn derive_total(&self, d: &mut TransactionDraft) -> Result<()> {
        let scale = self.config.amount_scale(settlement_currency(d));
        d.total = derive::total(d.converted_lump_sum, d.fees, d.taxes, d.kind, scale)?;
        Ok(())
    }
}

fn needs_fx(d: &TransactionDraft) -> bool {
    needs_exchange_rate(d.security_currency_code(), d.account_currency_code())
}

fn currency_pair(d: &TransactionDraft) -> (String, String) {
    (
        d.security_currency_code().to_string(),
        d.account_currency_code().to_string(),
    )
}

/// Currency of the converted lump sum, fees, taxes and total. Falls back
/// to the security currency until a portfolio is chosen.
fn settlement_currency(d: &TransactionDraft) -> &str {
    match d.account_currency_code() {
        "" => d.security_currency_code(),
        code => code,
    }
}

fn ensure_not_negative(field: Field, value: Decimal) -> Result<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(FormError::invalid(field.name(), "must not be negative"));
    }
    Ok(())
}

/// Empty text reads as zero.
fn parse_amount(field: Field, raw: &str) -> Result<Decimal> {
    if raw.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(raw)
        .map_err(|e| FormError::invalid(field.name(), format!("{raw:?} is not a number ({e})")))
}

fn parse_date(raw: &str) -> Result<NaiveDateTime> {
    const WITH_TIME: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in WITH_TIME {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| FormError::invalid(Field::Date.name(), format!("{raw:?} is not a date")))
}
