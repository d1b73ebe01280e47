//! Sale arithmetic. Everything here works in whole cents and never touches
//! the database, so the store can call it from inside a transaction.
//!
//! Sums and products are checked: an order whose amounts do not fit in an
//! i64 of cents is rejected as a bad request.

use crate::error::{Error, Result};
use crate::types::{Discount, DiscountKind, Money};

/// Tax and percentage math uses basis points: 10_000 bps = 100%.
pub const BASIS_POINTS: i64 = 10_000;

/// Default sales tax, 10%.
pub const DEFAULT_TAX_RATE_BPS: i64 = 1_000;

/// A priced sale line, as fed to the discount calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub medicine_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
}

impl PricedLine {
    pub fn total(&self) -> Result<Money> {
        line_total(self.unit_price, self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
}

fn out_of_range() -> Error {
    Error::bad_request("Sale amount out of range")
}

pub fn line_total(unit_price: Money, quantity: i64) -> Result<Money> {
    unit_price.checked_mul(quantity).ok_or_else(out_of_range)
}

fn sum_lines<'a>(mut lines: impl Iterator<Item = &'a PricedLine>) -> Result<Money> {
    lines.try_fold(Money::ZERO, |acc, line| {
        acc.checked_add(line.total()?).ok_or_else(out_of_range)
    })
}

pub fn subtotal(lines: &[PricedLine]) -> Result<Money> {
    sum_lines(lines.iter())
}

/// Amount taken off the order by `discount`.
///
/// The base is the whole subtotal, or only the lines of the scoped medicine.
/// Orders below `min_order_amount` (compared to the subtotal) get nothing. The
/// result is capped by `max_discount_amount` and never exceeds the base.
pub fn discount_amount(discount: &Discount, lines: &[PricedLine]) -> Result<Money> {
    let subtotal = subtotal(lines)?;

    if let Some(min) = discount.min_order_amount {
        if subtotal < min {
            return Ok(Money::ZERO);
        }
    }

    let base = match discount.applicable_to_medicine_id {
        Some(medicine_id) => sum_lines(lines.iter().filter(|l| l.medicine_id == medicine_id))?,
        None => subtotal,
    };
    if base.is_zero() || base.is_negative() {
        return Ok(Money::ZERO);
    }

    let raw = match discount.kind {
        // value is a percent with two decimals, so cents of it are basis points
        DiscountKind::Percentage => base.scale(discount.value.cents(), BASIS_POINTS),
        DiscountKind::Fixed => discount.value,
    };

    let capped = match discount.max_discount_amount {
        Some(max) => raw.min(max),
        None => raw,
    };
    Ok(capped.min(base))
}

#[must_use]
pub fn tax_amount(taxable: Money, rate_bps: i64) -> Money {
    if taxable.is_negative() {
        return Money::ZERO;
    }
    taxable.scale(rate_bps, BASIS_POINTS)
}

pub fn compute_totals(
    lines: &[PricedLine],
    discount: Option<&Discount>,
    tax_rate_bps: i64,
) -> Result<Totals> {
    let subtotal = subtotal(lines)?;
    let discount = match discount {
        Some(d) => discount_amount(d, lines)?,
        None => Money::ZERO,
    };
    let taxable = subtotal.checked_sub(discount).ok_or_else(out_of_range)?;
    let tax = tax_amount(taxable, tax_rate_bps);
    Ok(Totals {
        subtotal,
        discount,
        tax,
        total: taxable.checked_add(tax).ok_or_else(out_of_range)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn discount(kind: DiscountKind, value: i64) -> Discount {
        let now = Utc::now();
        Discount {
            id: 1,
            name: "promo".to_string(),
            kind,
            value: Money::from_cents(value),
            applicable_to_medicine_id: None,
            min_order_amount: None,
            max_discount_amount: None,
            valid_from: now - Duration::days(1),
            valid_to: now + Duration::days(1),
            is_active: true,
        }
    }

    fn lines() -> Vec<PricedLine> {
        vec![
            PricedLine { medicine_id: 1, quantity: 2, unit_price: Money::from_cents(1000) },
            PricedLine { medicine_id: 2, quantity: 1, unit_price: Money::from_cents(550) },
        ]
    }

    #[test]
    fn test_subtotal_sums_lines() {
        assert_eq!(subtotal(&lines()).unwrap(), Money::from_cents(2550));
        assert_eq!(subtotal(&[]).unwrap(), Money::ZERO);
    }

    #[test]
    fn test_percentage_discount() {
        // 10.00% of 25.50 = 2.55
        let d = discount(DiscountKind::Percentage, 1000);
        assert_eq!(discount_amount(&d, &lines()).unwrap(), Money::from_cents(255));
    }

    #[test]
    fn test_fixed_discount_capped_at_base() {
        let d = discount(DiscountKind::Fixed, 100_000);
        assert_eq!(discount_amount(&d, &lines()).unwrap(), Money::from_cents(2550));
    }

    #[test]
    fn test_scoped_discount_only_touches_its_medicine() {
        let mut d = discount(DiscountKind::Percentage, 5000);
        d.applicable_to_medicine_id = Some(2);
        assert_eq!(discount_amount(&d, &lines()).unwrap(), Money::from_cents(275));

        d.applicable_to_medicine_id = Some(99);
        assert_eq!(discount_amount(&d, &lines()).unwrap(), Money::ZERO);
    }

    #[test]
    fn test_min_order_and_max_cap() {
        let mut d = discount(DiscountKind::Percentage, 5000);
        d.min_order_amount = Some(Money::from_cents(3000));
        assert_eq!(discount_amount(&d, &lines()).unwrap(), Money::ZERO);

        d.min_order_amount = Some(Money::from_cents(2000));
        d.max_discount_amount = Some(Money::from_cents(500));
        assert_eq!(discount_amount(&d, &lines()).unwrap(), Money::from_cents(500));
    }

    #[test]
    fn test_totals_apply_tax_after_discount() {
        let d = discount(DiscountKind::Fixed, 550);
        let totals = compute_totals(&lines(), Some(&d), DEFAULT_TAX_RATE_BPS).unwrap();
        assert_eq!(totals.subtotal, Money::from_cents(2550));
        assert_eq!(totals.discount, Money::from_cents(550));
        assert_eq!(totals.tax, Money::from_cents(200));
        assert_eq!(totals.total, Money::from_cents(2200));
    }

    #[test]
    fn test_totals_without_discount() {
        let totals = compute_totals(&lines(), None, 0).unwrap();
        assert_eq!(totals.discount, Money::ZERO);
        assert_eq!(totals.tax, Money::ZERO);
        assert_eq!(totals.total, totals.subtotal);
    }

    #[test]
    fn test_overflowing_order_is_rejected() {
        let huge = PricedLine {
            medicine_id: 1,
            quantity: 2,
            unit_price: Money::from_cents(i64::MAX / 2 + 1),
        };
        assert!(matches!(line_total(huge.unit_price, 2), Err(Error::BadRequest(_))));
        assert!(matches!(compute_totals(&[huge], None, 0), Err(Error::BadRequest(_))));

        let half = PricedLine { quantity: 1, ..huge };
        assert!(matches!(subtotal(&[half, half]), Err(Error::BadRequest(_))));
    }
}
