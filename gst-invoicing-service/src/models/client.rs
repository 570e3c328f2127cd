//! Tenant and counterparty documents.
//!
//! Both are managed elsewhere; the invoicing service only reads them to
//! resolve the caller's business and to label invoices with client details.

use serde::{Deserialize, Serialize};

/// Business document (tenant root). One per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    /// Owning user id.
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gstin: Option<String>,
}

/// Client document, owned by a business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[serde(rename = "_id")]
    pub id: String,
    pub business: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gstin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

impl Client {
    /// Label used in reports when the client reference no longer resolves.
    pub const UNKNOWN: &'static str = "Unknown";
}
