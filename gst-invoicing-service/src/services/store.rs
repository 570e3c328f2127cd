//! Persistence seam for invoices and the directory (businesses, clients).
//!
//! Every invoice operation takes the business id and applies it as a filter.
//! There is no method that reads or writes invoices across tenants.

use crate::error::InvoiceError;
use crate::models::{Business, Client, Invoice, InvoiceFilter, InvoiceStatus, PageRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use std::collections::HashMap;

/// Stream of invoices produced for report folding.
pub type InvoiceStream = BoxStream<'static, Result<Invoice, InvoiceError>>;

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Insert a new invoice.
    ///
    /// Fails with `DuplicateInvoiceNumber` when the owning business already
    /// has an invoice with the same number.
    async fn insert(&self, invoice: &Invoice) -> Result<(), InvoiceError>;

    async fn find(&self, business_id: &str, id: &str) -> Result<Option<Invoice>, InvoiceError>;

    /// One page of matching invoices, newest `invoiceDate` first, plus the
    /// total number of matches.
    async fn list(
        &self,
        business_id: &str,
        filter: &InvoiceFilter,
        page: PageRequest,
    ) -> Result<(Vec<Invoice>, u64), InvoiceError>;

    /// Replace a stored invoice.
    ///
    /// With `expected_version` set the write only happens when the stored
    /// version still matches. Returns whether a document was replaced.
    async fn replace(
        &self,
        business_id: &str,
        invoice: &Invoice,
        expected_version: Option<i64>,
    ) -> Result<bool, InvoiceError>;

    /// Returns whether a document was deleted.
    async fn delete(&self, business_id: &str, id: &str) -> Result<bool, InvoiceError>;

    /// Set the status of one invoice and return the updated document.
    async fn set_status(
        &self,
        business_id: &str,
        id: &str,
        status: InvoiceStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Invoice>, InvoiceError>;

    /// Move every invoice that is neither PAID nor OVERDUE and whose due date
    /// is strictly before `now` to OVERDUE. Returns the number changed.
    async fn mark_overdue(&self, business_id: &str, now: DateTime<Utc>)
        -> Result<u64, InvoiceError>;

    /// All matching invoices, newest `invoiceDate` first.
    async fn stream(
        &self,
        business_id: &str,
        filter: &InvoiceFilter,
    ) -> Result<InvoiceStream, InvoiceError>;

    /// Businesses that own at least one invoice the overdue sweep would move.
    async fn open_business_ids(&self, now: DateTime<Utc>) -> Result<Vec<String>, InvoiceError>;

    async fn ping(&self) -> Result<(), InvoiceError>;
}

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn business_for_user(&self, user_id: &str) -> Result<Option<Business>, InvoiceError>;

    async fn find_client(
        &self,
        business_id: &str,
        client_id: &str,
    ) -> Result<Option<Client>, InvoiceError>;

    /// Clients of `business_id` among `client_ids`, keyed by id. Ids that do
    /// not resolve are simply absent.
    async fn clients_by_id(
        &self,
        business_id: &str,
        client_ids: &[String],
    ) -> Result<HashMap<String, Client>, InvoiceError>;
}
