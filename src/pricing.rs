//! Checkout totals.
//!
//! Totals are a pure function of the line items. Tax is rounded to cents when
//! computed; subtotal and shipping are already exact cents, so
//! `total == subtotal + tax + shipping` holds exactly. Every function returns
//! `None` when an amount leaves the decimal range.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Money;

/// 8% sales tax.
pub const TAX_RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 2);

/// Orders with a subtotal strictly above this ship for free.
pub const FREE_SHIPPING_THRESHOLD: Money = Money::from_cents(5000);

pub const FLAT_SHIPPING_FEE: Money = Money::from_cents(999);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
}

impl OrderTotals {
    pub fn from_subtotal(subtotal: Money) -> Option<Self> {
        let tax = subtotal.percent(TAX_RATE)?;
        let shipping = shipping_fee(subtotal);
        let total = subtotal.checked_add(tax)?.checked_add(shipping)?;
        Some(Self { subtotal, tax, shipping, total })
    }

    /// Totals for `(unit price, quantity)` pairs.
    pub fn for_lines<I>(lines: I) -> Option<Self>
    where
        I: IntoIterator<Item = (Money, u32)>,
    {
        Self::from_subtotal(subtotal(lines)?)
    }
}

pub fn subtotal<I>(lines: I) -> Option<Money>
where
    I: IntoIterator<Item = (Money, u32)>,
{
    lines.into_iter().try_fold(Money::ZERO, |acc, (price, qty)| acc.checked_add(price.checked_multiply(qty)?))
}

pub fn shipping_fee(subtotal: Money) -> Money {
    if subtotal > FREE_SHIPPING_THRESHOLD { Money::ZERO } else { FLAT_SHIPPING_FEE }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_shipping_under_threshold() {
        let totals = OrderTotals::from_subtotal(Money::from_cents(4000)).unwrap();
        assert_eq!(totals.shipping, Money::from_cents(999));
        assert_eq!(totals.tax, Money::from_cents(320));
        assert_eq!(totals.total, Money::from_cents(5319));
        assert_eq!(totals.total, totals.subtotal + totals.tax + totals.shipping);
    }

    #[test]
    fn test_free_shipping_over_threshold() {
        let totals = OrderTotals::from_subtotal(Money::from_cents(6000)).unwrap();
        assert_eq!(totals.shipping, Money::ZERO);
        assert_eq!(totals.tax, Money::from_cents(480));
        assert_eq!(totals.total, Money::from_cents(6480));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        assert_eq!(shipping_fee(Money::from_cents(5000)), FLAT_SHIPPING_FEE);
        assert_eq!(shipping_fee(Money::from_cents(5001)), Money::ZERO);
    }

    #[test]
    fn test_for_lines() {
        let totals = OrderTotals::for_lines([(Money::from_cents(1250), 2), (Money::from_cents(999), 3)]).unwrap();
        assert_eq!(totals.subtotal, Money::from_cents(5497));
        assert_eq!(totals.tax, Money::from_cents(440));
        assert_eq!(totals.shipping, Money::ZERO);
        assert_eq!(totals.total, Money::from_cents(5937));
    }

    #[test]
    fn test_out_of_range_totals_are_none() {
        let huge = Money::new(Decimal::MAX);
        assert_eq!(subtotal([(huge, 2)]), None);
        assert_eq!(subtotal([(huge, 1), (Money::from_cents(100), 1)]), None);
        assert!(OrderTotals::for_lines([(huge, 1)]).is_none());
    }
}
