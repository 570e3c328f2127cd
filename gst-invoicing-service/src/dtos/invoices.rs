use crate::error::InvoiceError;
use crate::models::{
    ClaimedTotals, Client, CreateInvoice, CreateLineItem, Invoice, InvoiceFilter, InvoiceItem,
    InvoicePage, InvoiceStatus, PageRequest, UpdateInvoice,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use super::{date_range, parse_date};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    #[serde(default)]
    pub description: String,
    pub hsn_sac: Option<String>,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub gst_rate: Decimal,
    /// Checked against the recomputed amount, never stored.
    pub amount: Option<Decimal>,
}

impl From<LineItemRequest> for CreateLineItem {
    fn from(item: LineItemRequest) -> Self {
        Self {
            description: item.description,
            hsn_sac: item.hsn_sac,
            quantity: item.quantity,
            rate: item.rate,
            gst_rate: item.gst_rate,
            amount: item.amount,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    #[validate(required, length(min = 1, message = "Invoice number is required"))]
    pub invoice_number: Option<String>,
    #[validate(required, length(min = 1, message = "Invoice date is required"))]
    pub invoice_date: Option<String>,
    #[validate(required, length(min = 1, message = "Due date is required"))]
    pub due_date: Option<String>,
    #[serde(alias = "client")]
    #[validate(required, length(min = 1, message = "Client is required"))]
    pub client_id: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub inter_state: Option<bool>,
    #[validate(required, length(min = 1, message = "At least one item is required"))]
    pub items: Option<Vec<LineItemRequest>>,
    pub subtotal: Option<Decimal>,
    pub cgst_amount: Option<Decimal>,
    pub sgst_amount: Option<Decimal>,
    pub igst_amount: Option<Decimal>,
    pub total: Option<Decimal>,
}

fn parse_status(status: Option<String>) -> Result<Option<InvoiceStatus>, InvoiceError> {
    status
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse())
        .transpose()
}

impl CreateInvoiceRequest {
    pub fn into_domain(self) -> Result<CreateInvoice, InvoiceError> {
        self.validate()?;

        Ok(CreateInvoice {
            invoice_number: self.invoice_number.unwrap_or_default(),
            client_id: self.client_id.unwrap_or_default(),
            invoice_date: parse_date("invoiceDate", &self.invoice_date.unwrap_or_default())?,
            due_date: parse_date("dueDate", &self.due_date.unwrap_or_default())?,
            status: parse_status(self.status)?,
            notes: self.notes.filter(|n| !n.is_empty()),
            inter_state: self.inter_state.unwrap_or(false),
            items: self
                .items
                .unwrap_or_default()
                .into_iter()
                .map(CreateLineItem::from)
                .collect(),
            claimed: ClaimedTotals {
                subtotal: self.subtotal,
                cgst_amount: self.cgst_amount,
                sgst_amount: self.sgst_amount,
                igst_amount: self.igst_amount,
                total: self.total,
            },
        })
    }
}

/// Patch body. Absent fields are left unchanged; `business` and `_id` are
/// not part of the body and are ignored if sent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceRequest {
    pub invoice_number: Option<String>,
    pub invoice_date: Option<String>,
    pub due_date: Option<String>,
    #[serde(alias = "client")]
    pub client_id: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub inter_state: Option<bool>,
    pub items: Option<Vec<LineItemRequest>>,
    pub subtotal: Option<Decimal>,
    pub cgst_amount: Option<Decimal>,
    pub sgst_amount: Option<Decimal>,
    pub igst_amount: Option<Decimal>,
    pub total: Option<Decimal>,
    /// Version last read by the caller. Enables the conflict check.
    pub version: Option<i64>,
}

impl UpdateInvoiceRequest {
    pub fn into_domain(self) -> Result<UpdateInvoice, InvoiceError> {
        Ok(UpdateInvoice {
            invoice_number: self.invoice_number,
            client_id: self.client_id,
            invoice_date: self
                .invoice_date
                .map(|d| parse_date("invoiceDate", &d))
                .transpose()?,
            due_date: self
                .due_date
                .map(|d| parse_date("dueDate", &d))
                .transpose()?,
            status: parse_status(self.status)?,
            notes: self.notes,
            inter_state: self.inter_state,
            items: self
                .items
                .map(|items| items.into_iter().map(CreateLineItem::from).collect()),
            claimed: ClaimedTotals {
                subtotal: self.subtotal,
                cgst_amount: self.cgst_amount,
                sgst_amount: self.sgst_amount,
                igst_amount: self.igst_amount,
                total: self.total,
            },
            expected_version: self.version,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInvoicesParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// An enum value in any case, or `all`.
    pub status: Option<String>,
    pub search: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl ListInvoicesParams {
    pub fn into_domain(self) -> Result<(InvoiceFilter, PageRequest), InvoiceError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) if s.eq_ignore_ascii_case("all") => None,
            Some(s) => Some(s.parse()?),
        };

        let filter = InvoiceFilter {
            status,
            search: self
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            date_range: date_range(self.start_date.as_deref(), self.end_date.as_deref())?,
        };

        Ok((filter, PageRequest::checked(self.page, self.limit)?))
    }
}

/// Client as embedded in invoice responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRef {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gstin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

impl ClientRef {
    /// Name only, as shown in listings.
    pub fn summary(client: &Client) -> Self {
        Self {
            id: client.id.clone(),
            name: client.name.clone(),
            address: None,
            gstin: None,
            contact: None,
        }
    }
}

impl From<Client> for ClientRef {
    fn from(client: Client) -> Self {
        Self {
            id: client.id,
            name: client.name,
            address: client.address,
            gstin: client.gstin,
            contact: client.contact,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub business: String,
    /// `null` when the client no longer exists.
    pub client: Option<ClientRef>,
    pub invoice_number: String,
    pub invoice_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub status: InvoiceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub inter_state: bool,
    pub items: Vec<InvoiceItem>,
    pub subtotal: Decimal,
    pub cgst_amount: Decimal,
    pub sgst_amount: Decimal,
    pub igst_amount: Decimal,
    pub total: Decimal,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InvoiceResponse {
    pub fn new(invoice: Invoice, client: Option<ClientRef>) -> Self {
        let totals = invoice.totals();
        Self {
            inter_state: invoice.is_inter_state(),
            items: invoice.items().to_vec(),
            subtotal: totals.subtotal,
            cgst_amount: totals.cgst_amount,
            sgst_amount: totals.sgst_amount,
            igst_amount: totals.igst_amount,
            total: totals.total,
            id: invoice.id,
            business: invoice.business,
            client,
            invoice_number: invoice.invoice_number,
            invoice_date: invoice.invoice_date,
            due_date: invoice.due_date,
            status: invoice.status,
            notes: invoice.notes,
            version: invoice.version,
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceListResponse {
    pub invoices: Vec<InvoiceResponse>,
    pub current_page: u64,
    pub total_pages: u64,
    pub total_count: u64,
}

impl InvoiceListResponse {
    pub fn new(page: InvoicePage, clients: &HashMap<String, Client>) -> Self {
        Self {
            current_page: page.page,
            total_pages: page.total_pages,
            total_count: page.total_count,
            invoices: page
                .items
                .into_iter()
                .map(|invoice| {
                    let client = clients.get(&invoice.client).map(ClientRef::summary);
                    InvoiceResponse::new(invoice, client)
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub message: String,
    pub updated_count: u64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_fields_are_reported_together() {
        let request: CreateInvoiceRequest = serde_json::from_value(serde_json::json!({
            "invoiceNumber": "INV-1",
            "items": []
        }))
        .unwrap();

        match request.into_domain() {
            Err(InvoiceError::Validation(message)) => {
                assert!(message.starts_with("Missing required invoice fields"));
                assert!(message.contains("due_date"));
                assert!(message.contains("items"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn list_params_treat_all_as_no_status() {
        let params = ListInvoicesParams {
            status: Some("ALL".to_string()),
            ..Default::default()
        };
        let (filter, page) = params.into_domain().unwrap();
        assert_eq!(filter.status, None);
        assert_eq!(page, PageRequest::new(None, None));
    }

    #[test]
    fn list_params_reject_unknown_status() {
        let params = ListInvoicesParams {
            status: Some("settled".to_string()),
            ..Default::default()
        };
        assert!(params.into_domain().is_err());
    }

    #[test]
    fn update_parses_lowercase_status() {
        let request = UpdateInvoiceRequest {
            status: Some("paid".to_string()),
            ..Default::default()
        };
        assert_eq!(
            request.into_domain().unwrap().status,
            Some(InvoiceStatus::Paid)
        );
    }
}
