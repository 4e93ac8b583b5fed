//! Value Objects for the storefront

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// Money value object.
///
/// Amounts are whole cents held as exact decimals with a scale of two. Derived
/// amounts (tax) are rounded to cents when they are produced, so sums of
/// stored amounts stay exact. Deserialization rejects sub-cent amounts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Largest accepted unit price.
    pub const MAX_PRICE: Money = Money(Decimal::from_parts(1_000_000_000, 0, 0, false, 0));

    pub fn new(amount: Decimal) -> Self { Self(amount) }

    /// Whole cents, e.g. `Money::from_cents(999)` is 9.99.
    pub const fn from_cents(cents: u32) -> Self { Self(Decimal::from_parts(cents, 0, 0, false, 2)) }

    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_negative(&self) -> bool { self.0.is_sign_negative() && !self.0.is_zero() }

    /// No more than two decimal places once trailing zeros are dropped.
    pub fn is_cents(&self) -> bool { self.0.normalize().scale() <= 2 }

    pub fn checked_multiply(&self, qty: u32) -> Option<Money> { self.0.checked_mul(Decimal::from(qty)).map(Money) }

    pub fn checked_add(&self, other: Money) -> Option<Money> { self.0.checked_add(other.0).map(Money) }

    /// `self × rate`, rounded half away from zero to cents.
    pub fn percent(&self, rate: Decimal) -> Option<Money> { self.0.checked_mul(rate).map(|v| Money(v).round()) }

    pub fn round(&self) -> Money {
        Money(self.0.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }
}

/// Saturates instead of overflowing; use [`Money::checked_add`] where the
/// bound matters.
impl Add for Money {
    type Output = Money;
    fn add(self, other: Money) -> Money { Money(self.0.saturating_add(other.0)) }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::ZERO, Add::add) }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;
    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        let money = Money(amount);
        if !money.is_cents() { return Err(MoneyError::SubCent); }
        let mut amount = amount.normalize();
        amount.rescale(2);
        Ok(Money(amount))
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Decimal { money.0 }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MoneyError {
    #[error("amount must not have more than two decimal places")]
    SubCent,
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "${:.2}", self.0) }
}

/// Quantity value object. Always at least one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);

    pub fn new(value: u32) -> Option<Self> { (value >= 1).then_some(Self(value)) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: Quantity) -> Self { Self(self.0.saturating_add(other.0)) }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;
    fn try_from(value: u32) -> Result<Self, Self::Error> { Quantity::new(value).ok_or(QuantityError) }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> u32 { q.0 }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("quantity must be at least 1")]
pub struct QuantityError;

/// Email address, trimmed and lower-cased.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn parse(value: impl AsRef<str>) -> Result<Self, EmailError> {
        let value = value.as_ref().trim().to_lowercase();
        if value.is_empty() { return Err(EmailError::Empty); }
        if !validator::validate_email(&value) { return Err(EmailError::Invalid); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for Email {
    type Error = EmailError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Email::parse(value) }
}

impl From<Email> for String {
    fn from(email: Email) -> String { email.0 }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EmailError {
    #[error("email is required")]
    Empty,
    #[error("email is not a valid address")]
    Invalid,
}

/// `validator` hook: rejects empty or whitespace-only strings.
pub fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() { Err(validator::ValidationError::new("required")) } else { Ok(()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_normalized() {
        let email = Email::parse("  Jane.Doe@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "jane.doe@example.com");
        assert!(Email::parse("   ").is_err());
        assert!(Email::parse("not-an-email").is_err());
    }

    #[test]
    fn test_money_sum_and_percent() {
        let total: Money = [Money::from_cents(1999), Money::from_cents(1)].into_iter().sum();
        assert_eq!(total, Money::from_cents(2000));
        assert_eq!(Money::from_cents(4000).percent(Decimal::new(8, 2)), Some(Money::from_cents(320)));
        assert_eq!(Money::from_cents(1999).percent(Decimal::new(8, 2)), Some(Money::from_cents(160)));
    }

    #[test]
    fn test_money_arithmetic_reports_overflow() {
        let huge = Money::new(Decimal::MAX);
        assert_eq!(huge.checked_multiply(2), None);
        assert_eq!(huge.checked_add(Money::from_cents(1)), None);
        assert_eq!(huge + Money::from_cents(1), huge);
        assert_eq!(Money::from_cents(250).checked_multiply(3), Some(Money::from_cents(750)));
    }

    #[test]
    fn test_money_rejects_sub_cent_amounts() {
        assert!(serde_json::from_str::<Money>("\"0.001\"").is_err());
        assert!(!Money::new(Decimal::new(1, 3)).is_cents());
        let price: Money = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(price, Money::from_cents(1250));
        assert_eq!(serde_json::to_string(&price).unwrap(), "\"12.50\"");
        let whole: Money = serde_json::from_str("\"3.000\"").unwrap();
        assert_eq!(serde_json::to_string(&whole).unwrap(), "\"3.00\"");
    }

    #[test]
    fn test_quantity_rejects_zero() {
        assert!(Quantity::new(0).is_none());
        assert_eq!(Quantity::new(2).unwrap().add(Quantity::ONE).value(), 3);
        assert!(serde_json::from_str::<Quantity>("0").is_err());
    }
}
