//! Line item model for gst-invoicing-service.

use super::tax;
use crate::error::InvoiceError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Line item on an invoice.
///
/// `amount` is derived and cannot be set directly; every setter that touches
/// quantity, rate or GST rate recomputes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hsn_sac: Option<String>,
    quantity: Decimal,
    rate: Decimal,
    gst_rate: Decimal,
    amount: Decimal,
}

/// Raw line item values as supplied by a caller.
#[derive(Debug, Clone, Default)]
pub struct CreateLineItem {
    pub description: String,
    pub hsn_sac: Option<String>,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub gst_rate: Decimal,
    /// Amount the caller computed, if any. Only checked, never stored.
    pub amount: Option<Decimal>,
}

impl InvoiceItem {
    pub fn new(input: CreateLineItem) -> Result<Self, InvoiceError> {
        let description = input.description.trim().to_string();
        if description.is_empty() {
            return Err(InvoiceError::InvalidItem(
                "description is required".to_string(),
            ));
        }
        ensure_positive("quantity", input.quantity)?;
        ensure_positive("rate", input.rate)?;

        let amount = tax::compute_item_amount(input.quantity, input.rate, input.gst_rate)?;
        if let Some(claimed) = input.amount {
            if !tax::same_money(claimed, amount) {
                return Err(InvoiceError::InvalidItem(format!(
                    "amount {} does not match computed amount {}",
                    claimed,
                    tax::round_money(amount)
                )));
            }
        }

        Ok(Self {
            description,
            hsn_sac: input.hsn_sac.filter(|code| !code.trim().is_empty()),
            quantity: input.quantity,
            rate: input.rate,
            gst_rate: input.gst_rate,
            amount,
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn hsn_sac(&self) -> Option<&str> {
        self.hsn_sac.as_deref()
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    pub fn gst_rate(&self) -> Decimal {
        self.gst_rate
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn taxable_value(&self) -> Result<Decimal, InvoiceError> {
        tax::taxable_value(self.quantity, self.rate)
    }

    pub fn gst_amount(&self) -> Result<Decimal, InvoiceError> {
        tax::gst_amount(self.quantity, self.rate, self.gst_rate)
    }

    pub fn set_quantity(&mut self, quantity: Decimal) -> Result<(), InvoiceError> {
        ensure_positive("quantity", quantity)?;
        self.amount = tax::compute_item_amount(quantity, self.rate, self.gst_rate)?;
        self.quantity = quantity;
        Ok(())
    }

    pub fn set_rate(&mut self, rate: Decimal) -> Result<(), InvoiceError> {
        ensure_positive("rate", rate)?;
        self.amount = tax::compute_item_amount(self.quantity, rate, self.gst_rate)?;
        self.rate = rate;
        Ok(())
    }

    pub fn set_gst_rate(&mut self, gst_rate: Decimal) -> Result<(), InvoiceError> {
        self.amount = tax::compute_item_amount(self.quantity, self.rate, gst_rate)?;
        self.gst_rate = gst_rate;
        Ok(())
    }

    /// Recompute `amount` from the stored inputs.
    ///
    /// Used after loading documents written by other clients, whose stored
    /// `amount` is not trusted.
    pub(crate) fn normalize(&mut self) -> Result<(), InvoiceError> {
        self.amount = tax::compute_item_amount(self.quantity, self.rate, self.gst_rate)?;
        Ok(())
    }
}

fn ensure_positive(field: &str, value: Decimal) -> Result<(), InvoiceError> {
    if value <= Decimal::ZERO {
        return Err(InvoiceError::InvalidItem(format!(
            "{} must be greater than zero (got {})",
            field, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn item(quantity: &str, rate: &str, gst_rate: &str) -> Result<InvoiceItem, InvoiceError> {
        InvoiceItem::new(CreateLineItem {
            description: "Laptop".to_string(),
            hsn_sac: Some("8471".to_string()),
            quantity: d(quantity),
            rate: d(rate),
            gst_rate: d(gst_rate),
            amount: None,
        })
    }

    #[test]
    fn amount_is_derived_on_creation() {
        let item = item("1", "50000", "18").unwrap();
        assert_eq!(item.amount(), d("59000"));
        assert_eq!(item.taxable_value().unwrap(), d("50000"));
        assert_eq!(item.gst_amount().unwrap(), d("9000"));
    }

    #[test]
    fn amount_follows_every_field_change() {
        let mut item = item("1", "100", "18").unwrap();

        item.set_quantity(d("3")).unwrap();
        assert_eq!(item.amount(), d("354"));

        item.set_rate(d("200")).unwrap();
        assert_eq!(item.amount(), d("708"));

        item.set_gst_rate(d("5")).unwrap();
        assert_eq!(item.amount(), d("630"));
    }

    #[test]
    fn rejected_change_leaves_item_untouched() {
        let mut item = item("2", "100", "12").unwrap();
        assert!(item.set_quantity(Decimal::ZERO).is_err());
        assert_eq!(item.quantity(), d("2"));
        assert_eq!(item.amount(), d("224"));
    }

    #[test]
    fn zero_quantity_or_rate_is_invalid() {
        assert!(matches!(item("0", "100", "18"), Err(InvoiceError::InvalidItem(_))));
        assert!(matches!(item("1", "0", "18"), Err(InvoiceError::InvalidItem(_))));
    }

    #[test]
    fn blank_description_is_invalid() {
        let result = InvoiceItem::new(CreateLineItem {
            description: "   ".to_string(),
            quantity: Decimal::ONE,
            rate: Decimal::ONE,
            ..Default::default()
        });
        assert!(matches!(result, Err(InvoiceError::InvalidItem(_))));
    }

    #[test]
    fn mismatching_client_amount_is_rejected() {
        let input = CreateLineItem {
            description: "Laptop".to_string(),
            quantity: d("1"),
            rate: d("50000"),
            gst_rate: d("18"),
            amount: Some(d("50000")),
            ..Default::default()
        };
        assert!(matches!(InvoiceItem::new(input), Err(InvoiceError::InvalidItem(_))));
    }

    #[test]
    fn client_amount_within_a_paisa_is_accepted() {
        let input = CreateLineItem {
            description: "Stapler".to_string(),
            quantity: d("1"),
            rate: d("0.10"),
            gst_rate: d("5"),
            amount: Some(d("0.11")),
            ..Default::default()
        };
        assert_eq!(InvoiceItem::new(input).unwrap().amount(), d("0.105"));
    }

    #[test]
    fn any_non_negative_gst_rate_is_accepted() {
        let item = item("1", "100", "0.25").unwrap();
        assert_eq!(item.amount(), d("100.25"));
    }
}
