//! Invoice model for gst-invoicing-service.
//!
//! [`Invoice`] is the aggregate root: it owns its line items and keeps the
//! derived totals consistent with them. Totals are private and only change
//! through [`Invoice::replace_items`] and [`Invoice::set_inter_state`].

use super::line_item::{CreateLineItem, InvoiceItem};
use super::tax::{self, GstSplit, Supply};
use crate::error::InvoiceError;
use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Invoice status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Pending,
    Unpaid,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 5] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Pending,
        InvoiceStatus::Unpaid,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "DRAFT",
            InvoiceStatus::Pending => "PENDING",
            InvoiceStatus::Unpaid => "UNPAID",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Overdue => "OVERDUE",
        }
    }

    /// Whether the overdue sweep may move an invoice in this status.
    pub fn can_become_overdue(&self) -> bool {
        !matches!(self, InvoiceStatus::Paid | InvoiceStatus::Overdue)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = InvoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Ok(InvoiceStatus::Draft),
            "PENDING" => Ok(InvoiceStatus::Pending),
            "UNPAID" => Ok(InvoiceStatus::Unpaid),
            "PAID" => Ok(InvoiceStatus::Paid),
            "OVERDUE" => Ok(InvoiceStatus::Overdue),
            other => Err(InvoiceError::Validation(format!(
                "Invalid invoice status: {}",
                other
            ))),
        }
    }
}

/// Derived monetary totals of an invoice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub cgst_amount: Decimal,
    pub sgst_amount: Decimal,
    pub igst_amount: Decimal,
    pub total: Decimal,
}

impl InvoiceTotals {
    pub fn from_items(items: &[InvoiceItem], supply: Supply) -> Result<Self, InvoiceError> {
        let subtotal = tax::sum_money(items.iter().map(InvoiceItem::taxable_value))?;
        let total_gst = tax::sum_money(items.iter().map(InvoiceItem::gst_amount))?;
        let GstSplit { cgst, sgst, igst } = tax::split_gst(total_gst, supply);

        Ok(Self {
            subtotal,
            cgst_amount: cgst,
            sgst_amount: sgst,
            igst_amount: igst,
            total: tax::sum_money(items.iter().map(|item| Ok(item.amount())))?,
        })
    }

    pub fn total_gst(&self) -> Decimal {
        self.cgst_amount + self.sgst_amount + self.igst_amount
    }
}

/// Derived totals a caller sent along with the raw items.
///
/// They are never stored. When present they must agree with the recomputed
/// totals to the paisa, otherwise the request is rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClaimedTotals {
    pub subtotal: Option<Decimal>,
    pub cgst_amount: Option<Decimal>,
    pub sgst_amount: Option<Decimal>,
    pub igst_amount: Option<Decimal>,
    pub total: Option<Decimal>,
}

impl ClaimedTotals {
    pub fn verify(&self, actual: &InvoiceTotals) -> Result<(), InvoiceError> {
        let pairs = [
            ("subtotal", self.subtotal, actual.subtotal),
            ("cgstAmount", self.cgst_amount, actual.cgst_amount),
            ("sgstAmount", self.sgst_amount, actual.sgst_amount),
            ("igstAmount", self.igst_amount, actual.igst_amount),
            ("total", self.total, actual.total),
        ];

        for (field, claimed, computed) in pairs {
            if let Some(claimed) = claimed {
                if !tax::same_money(claimed, computed) {
                    return Err(InvoiceError::Validation(format!(
                        "{} {} does not match computed value {}",
                        field,
                        claimed,
                        tax::round_money(computed)
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Invoice document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[serde(rename = "_id")]
    pub id: String,
    pub business: String,
    pub client: String,
    pub invoice_number: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub invoice_date: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub due_date: DateTime<Utc>,
    pub status: InvoiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    inter_state: bool,
    #[serde(default)]
    items: Vec<InvoiceItem>,
    subtotal: Decimal,
    #[serde(default)]
    cgst_amount: Decimal,
    #[serde(default)]
    sgst_amount: Decimal,
    #[serde(default)]
    igst_amount: Decimal,
    total: Decimal,
    #[serde(default)]
    pub version: i64,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub invoice_number: String,
    pub client_id: String,
    pub invoice_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub status: Option<InvoiceStatus>,
    pub notes: Option<String>,
    pub inter_state: bool,
    pub items: Vec<CreateLineItem>,
    pub claimed: ClaimedTotals,
}

/// Patch for an existing invoice. `None` leaves a field unchanged.
///
/// A patch cannot express a new owner or id.
#[derive(Debug, Clone, Default)]
pub struct UpdateInvoice {
    pub invoice_number: Option<String>,
    pub client_id: Option<String>,
    pub invoice_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<InvoiceStatus>,
    pub notes: Option<String>,
    pub inter_state: Option<bool>,
    pub items: Option<Vec<CreateLineItem>>,
    pub claimed: ClaimedTotals,
    /// Version the caller last read; enables optimistic concurrency.
    pub expected_version: Option<i64>,
}

fn build_items(items: Vec<CreateLineItem>) -> Result<Vec<InvoiceItem>, InvoiceError> {
    if items.is_empty() {
        return Err(InvoiceError::Validation(
            "An invoice needs at least one item".to_string(),
        ));
    }

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            InvoiceItem::new(item).map_err(|e| match e {
                InvoiceError::InvalidItem(reason) => {
                    InvoiceError::InvalidItem(format!("item {}: {}", index + 1, reason))
                }
                other => other,
            })
        })
        .collect()
}

fn required(field: &str, value: &str) -> Result<String, InvoiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(InvoiceError::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

impl Invoice {
    /// Build a new invoice owned by `business_id`, validating every item and
    /// deriving all totals.
    pub fn create(
        business_id: &str,
        input: CreateInvoice,
        now: DateTime<Utc>,
    ) -> Result<Self, InvoiceError> {
        let business = required("business", business_id)?;
        let invoice_number = required("invoiceNumber", &input.invoice_number)?;
        let client = required("clientId", &input.client_id)?;
        let items = build_items(input.items)?;

        let mut invoice = Self {
            id: Uuid::new_v4().to_string(),
            business,
            client,
            invoice_number,
            invoice_date: input.invoice_date,
            due_date: input.due_date,
            status: input.status.unwrap_or_default(),
            notes: input.notes,
            inter_state: input.inter_state,
            items,
            subtotal: Decimal::ZERO,
            cgst_amount: Decimal::ZERO,
            sgst_amount: Decimal::ZERO,
            igst_amount: Decimal::ZERO,
            total: Decimal::ZERO,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        invoice.recompute()?;
        input.claimed.verify(&invoice.totals())?;

        Ok(invoice)
    }

    /// Swap the line items and recompute every total. Status is untouched.
    pub fn replace_items(&mut self, items: Vec<CreateLineItem>) -> Result<(), InvoiceError> {
        self.items = build_items(items)?;
        self.recompute()
    }

    pub fn set_inter_state(&mut self, inter_state: bool) -> Result<(), InvoiceError> {
        self.inter_state = inter_state;
        self.recompute()
    }

    /// Apply a patch. Ownership and id are never touched.
    pub fn apply(&mut self, patch: UpdateInvoice, now: DateTime<Utc>) -> Result<(), InvoiceError> {
        if let Some(number) = patch.invoice_number {
            self.invoice_number = required("invoiceNumber", &number)?;
        }
        if let Some(client) = patch.client_id {
            self.client = required("clientId", &client)?;
        }
        if let Some(items) = patch.items {
            self.items = build_items(items)?;
        }
        if let Some(invoice_date) = patch.invoice_date {
            self.invoice_date = invoice_date;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(notes) = patch.notes {
            self.notes = Some(notes).filter(|n| !n.is_empty());
        }
        if let Some(inter_state) = patch.inter_state {
            self.inter_state = inter_state;
        }

        self.recompute()?;
        patch.claimed.verify(&self.totals())?;
        self.updated_at = now;
        Ok(())
    }

    /// Recompute item amounts and totals from raw item inputs.
    ///
    /// Documents loaded from storage go through this so that stale or
    /// client-computed amounts never reach a report. A stored document whose
    /// items no longer pass validation is an integrity failure, not a bad
    /// request.
    pub(crate) fn normalize(&mut self) -> Result<(), InvoiceError> {
        let result = self
            .items
            .iter_mut()
            .try_for_each(InvoiceItem::normalize)
            .and_then(|_| self.recompute());

        result.map_err(|e| {
            tracing::error!(invoice_id = %self.id, error = %e, "Stored invoice failed validation");
            InvoiceError::Integrity(format!("invoice {}: {}", self.id, e))
        })
    }

    fn recompute(&mut self) -> Result<(), InvoiceError> {
        let totals = InvoiceTotals::from_items(&self.items, self.supply())?;
        self.subtotal = totals.subtotal;
        self.cgst_amount = totals.cgst_amount;
        self.sgst_amount = totals.sgst_amount;
        self.igst_amount = totals.igst_amount;
        self.total = totals.total;
        Ok(())
    }

    pub fn supply(&self) -> Supply {
        Supply::from_inter_state(self.inter_state)
    }

    pub fn is_inter_state(&self) -> bool {
        self.inter_state
    }

    pub fn items(&self) -> &[InvoiceItem] {
        &self.items
    }

    pub fn totals(&self) -> InvoiceTotals {
        InvoiceTotals {
            subtotal: self.subtotal,
            cgst_amount: self.cgst_amount,
            sgst_amount: self.sgst_amount,
            igst_amount: self.igst_amount,
            total: self.total,
        }
    }

    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    pub fn cgst_amount(&self) -> Decimal {
        self.cgst_amount
    }

    pub fn sgst_amount(&self) -> Decimal {
        self.sgst_amount
    }

    pub fn igst_amount(&self) -> Decimal {
        self.igst_amount
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        self.due_date < now
    }
}

/// Inclusive bounds on `invoiceDate`. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at <= end)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Filter shared by listing and reporting queries.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    /// Case-insensitive substring of the invoice number.
    pub search: Option<String>,
    pub date_range: DateRange,
}

impl InvoiceFilter {
    pub fn matches(&self, invoice: &Invoice) -> bool {
        self.status.map_or(true, |s| invoice.status == s)
            && self.date_range.contains(invoice.invoice_date)
            && self.search.as_deref().map_or(true, |needle| {
                invoice
                    .invoice_number
                    .to_lowercase()
                    .contains(&needle.to_lowercase())
            })
    }
}

/// Offset pagination request. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u64 = 10;
    pub const MAX_LIMIT: u64 = 100;

    /// Zero or missing values fall back to page 1 and the default limit.
    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        Self {
            page: page.filter(|p| *p > 0).unwrap_or(1),
            limit: limit
                .filter(|l| *l > 0)
                .unwrap_or(Self::DEFAULT_LIMIT)
                .min(Self::MAX_LIMIT),
        }
    }

    /// Like [`PageRequest::new`], but rejects a page whose offset no store
    /// can address.
    pub fn checked(page: Option<u64>, limit: Option<u64>) -> Result<Self, InvoiceError> {
        let request = Self::new(page, limit);
        let offset = (request.page - 1).checked_mul(request.limit);
        match offset {
            Some(offset) if offset <= i64::MAX as u64 => Ok(request),
            _ => Err(InvoiceError::Validation(format!(
                "Page {} is out of range",
                request.page
            ))),
        }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total_count: u64) -> u64 {
        total_count.div_ceil(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of invoices.
#[derive(Debug, Clone)]
pub struct InvoicePage {
    pub items: Vec<Invoice>,
    pub total_count: u64,
    pub page: u64,
    pub total_pages: u64,
}
