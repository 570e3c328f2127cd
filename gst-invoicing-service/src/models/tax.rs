//! GST arithmetic for invoice line items.
//!
//! All amounts are exact decimals. Nothing here rounds: a line item's
//! `amount` is exactly `quantity * rate * (1 + gst_rate / 100)` and the
//! invoice totals are exact sums of those, so `subtotal + cgst + sgst + igst`
//! and the sum of item amounts are always the same number. Rounding to paise
//! happens only at presentation time via [`round_money`].

use crate::error::InvoiceError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Place of supply relative to the supplier.
///
/// Intra-state supplies are taxed as CGST + SGST, inter-state supplies as IGST.
/// Callers decide which applies; nothing here infers it from addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Supply {
    #[default]
    IntraState,
    InterState,
}

impl Supply {
    pub fn from_inter_state(inter_state: bool) -> Self {
        if inter_state {
            Supply::InterState
        } else {
            Supply::IntraState
        }
    }
}

/// GST broken down into its components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GstSplit {
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
}

impl GstSplit {
    pub fn total(&self) -> Decimal {
        self.cgst + self.sgst + self.igst
    }
}

fn ensure_non_negative(field: &str, value: Decimal) -> Result<(), InvoiceError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(InvoiceError::InvalidItem(format!(
            "{} must not be negative (got {})",
            field, value
        )));
    }
    Ok(())
}

fn out_of_range() -> InvoiceError {
    InvoiceError::InvalidItem("amount out of range".to_string())
}

/// Pre-tax value of a line: `quantity * rate`.
pub fn taxable_value(quantity: Decimal, rate: Decimal) -> Result<Decimal, InvoiceError> {
    quantity.checked_mul(rate).ok_or_else(out_of_range)
}

/// GST charged on a line: `quantity * rate * gst_rate / 100`.
pub fn gst_amount(
    quantity: Decimal,
    rate: Decimal,
    gst_rate: Decimal,
) -> Result<Decimal, InvoiceError> {
    taxable_value(quantity, rate)?
        .checked_mul(gst_rate)
        .and_then(|v| v.checked_div(HUNDRED))
        .ok_or_else(out_of_range)
}

/// Tax-inclusive amount of a line item.
///
/// Negative inputs are rejected instead of being coerced to zero, and so is
/// any result beyond what a `Decimal` can hold.
pub fn compute_item_amount(
    quantity: Decimal,
    rate: Decimal,
    gst_rate: Decimal,
) -> Result<Decimal, InvoiceError> {
    ensure_non_negative("quantity", quantity)?;
    ensure_non_negative("rate", rate)?;
    ensure_non_negative("gstRate", gst_rate)?;

    add_money(
        taxable_value(quantity, rate)?,
        gst_amount(quantity, rate, gst_rate)?,
    )
}

/// Sum of two amounts.
pub fn add_money(a: Decimal, b: Decimal) -> Result<Decimal, InvoiceError> {
    a.checked_add(b).ok_or_else(out_of_range)
}

/// Sum of many amounts.
pub fn sum_money<I>(values: I) -> Result<Decimal, InvoiceError>
where
    I: IntoIterator<Item = Result<Decimal, InvoiceError>>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| add_money(acc, value?))
}

/// Split a GST amount for the given place of supply.
pub fn split_gst(total_gst: Decimal, supply: Supply) -> GstSplit {
    match supply {
        Supply::IntraState => {
            let half = total_gst / Decimal::TWO;
            GstSplit {
                cgst: half,
                sgst: half,
                igst: Decimal::ZERO,
            }
        }
        Supply::InterState => GstSplit {
            cgst: Decimal::ZERO,
            sgst: Decimal::ZERO,
            igst: total_gst,
        },
    }
}

/// Round to paise, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Whether two amounts are equal once rounded to paise.
pub fn same_money(a: Decimal, b: Decimal) -> bool {
    round_money(a) == round_money(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn item_amount_includes_gst() {
        let amount = compute_item_amount(d("2"), d("100"), d("18")).unwrap();
        assert_eq!(amount, d("236"));
    }

    #[test]
    fn item_amount_with_zero_rate_gst_is_taxable_value() {
        let amount = compute_item_amount(d("3"), d("33.33"), Decimal::ZERO).unwrap();
        assert_eq!(amount, d("99.99"));
    }

    #[test]
    fn item_amount_keeps_fractional_paise_exact() {
        // 1 x 0.10 at 5% is 0.105, which must not be rounded away.
        let amount = compute_item_amount(Decimal::ONE, d("0.10"), d("5")).unwrap();
        assert_eq!(amount, d("0.105"));
        assert_eq!(round_money(amount), d("0.11"));
    }

    #[test]
    fn negative_inputs_are_rejected() {
        assert!(matches!(
            compute_item_amount(d("-1"), d("100"), d("18")),
            Err(InvoiceError::InvalidItem(_))
        ));
        assert!(matches!(
            compute_item_amount(d("1"), d("-100"), d("18")),
            Err(InvoiceError::InvalidItem(_))
        ));
        assert!(matches!(
            compute_item_amount(d("1"), d("100"), d("-5")),
            Err(InvoiceError::InvalidItem(_))
        ));
    }

    #[test]
    fn overflowing_amounts_are_rejected() {
        let huge = d("1000000000000000");
        assert!(matches!(
            compute_item_amount(huge, huge, d("18")),
            Err(InvoiceError::InvalidItem(reason)) if reason == "amount out of range"
        ));
        assert!(matches!(
            add_money(Decimal::MAX, Decimal::ONE),
            Err(InvoiceError::InvalidItem(_))
        ));
        assert_eq!(sum_money([Ok(d("1.5")), Ok(d("2.25"))]).unwrap(), d("3.75"));
    }

    #[test]
    fn intra_state_split_halves_gst() {
        let split = split_gst(d("10440"), Supply::IntraState);
        assert_eq!(split.cgst, d("5220"));
        assert_eq!(split.sgst, d("5220"));
        assert_eq!(split.igst, Decimal::ZERO);
        assert_eq!(split.total(), d("10440"));
    }

    #[test]
    fn inter_state_split_is_all_igst() {
        let split = split_gst(d("10440"), Supply::InterState);
        assert_eq!(split.cgst, Decimal::ZERO);
        assert_eq!(split.sgst, Decimal::ZERO);
        assert_eq!(split.igst, d("10440"));
    }

    #[test]
    fn odd_gst_splits_without_losing_a_paisa() {
        let split = split_gst(d("0.01"), Supply::IntraState);
        assert_eq!(split.cgst + split.sgst, d("0.01"));
    }

    #[test]
    fn supply_defaults_to_intra_state() {
        assert_eq!(Supply::default(), Supply::IntraState);
        assert_eq!(Supply::from_inter_state(true), Supply::InterState);
    }
}
