//! Tenant-scoped invoice repository.
//!
//! Validation happens in the aggregate before any store call. Every store
//! call passes the caller's business id.

use crate::error::InvoiceError;
use crate::models::{
    Client, CreateInvoice, Invoice, InvoiceFilter, InvoicePage, PageRequest, UpdateInvoice,
};
use crate::services::metrics::INVOICES_TOTAL;
use crate::services::store::{DirectoryStore, InvoiceStore};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Clone)]
pub struct InvoiceRepository {
    invoices: Arc<dyn InvoiceStore>,
    directory: Arc<dyn DirectoryStore>,
}

impl InvoiceRepository {
    pub fn new(invoices: Arc<dyn InvoiceStore>, directory: Arc<dyn DirectoryStore>) -> Self {
        Self {
            invoices,
            directory,
        }
    }

    async fn ensure_client(&self, business_id: &str, client_id: &str) -> Result<(), InvoiceError> {
        self.directory
            .find_client(business_id, client_id)
            .await?
            .map(|_| ())
            .ok_or(InvoiceError::ClientNotFound)
    }

    #[instrument(skip(self, input), fields(business_id = %business_id, invoice_number = %input.invoice_number))]
    pub async fn create(
        &self,
        business_id: &str,
        input: CreateInvoice,
    ) -> Result<Invoice, InvoiceError> {
        let invoice = Invoice::create(business_id, input, Utc::now())?;

        if invoice.due_date < invoice.invoice_date {
            warn!(
                invoice_number = %invoice.invoice_number,
                "Due date is before invoice date"
            );
        }

        self.ensure_client(business_id, &invoice.client).await?;
        self.invoices.insert(&invoice).await?;

        INVOICES_TOTAL
            .with_label_values(&[invoice.status.as_str()])
            .inc();

        info!(
            invoice_id = %invoice.id,
            total = %invoice.total(),
            status = %invoice.status,
            "Invoice created"
        );

        Ok(invoice)
    }

    #[instrument(skip(self), fields(business_id = %business_id, invoice_id = %invoice_id))]
    pub async fn get(&self, business_id: &str, invoice_id: &str) -> Result<Invoice, InvoiceError> {
        self.invoices
            .find(business_id, invoice_id)
            .await?
            .ok_or(InvoiceError::NotFound)
    }

    #[instrument(skip(self, filter), fields(business_id = %business_id, page = page.page, limit = page.limit))]
    pub async fn list(
        &self,
        business_id: &str,
        filter: &InvoiceFilter,
        page: PageRequest,
    ) -> Result<InvoicePage, InvoiceError> {
        let (items, total_count) = self.invoices.list(business_id, filter, page).await?;

        Ok(InvoicePage {
            items,
            total_count,
            page: page.page,
            total_pages: page.total_pages(total_count),
        })
    }

    /// Apply a patch. Business and id are never changed.
    ///
    /// When the patch carries a version, a mismatch with the stored version
    /// fails with `Conflict`. Without one the write is last-write-wins.
    #[instrument(skip(self, patch), fields(business_id = %business_id, invoice_id = %invoice_id))]
    pub async fn update(
        &self,
        business_id: &str,
        invoice_id: &str,
        patch: UpdateInvoice,
    ) -> Result<Invoice, InvoiceError> {
        let current = self.get(business_id, invoice_id).await?;

        if let Some(expected) = patch.expected_version {
            if expected != current.version {
                return Err(InvoiceError::Conflict {
                    expected,
                    actual: current.version,
                });
            }
        }

        let expected_version = patch.expected_version;
        let client_changed = patch
            .client_id
            .as_deref()
            .is_some_and(|c| c.trim() != current.client);

        let mut updated = current.clone();
        updated.apply(patch, Utc::now())?;
        updated.version = current.version + 1;

        if updated.due_date < updated.invoice_date {
            warn!(
                invoice_number = %updated.invoice_number,
                "Due date is before invoice date"
            );
        }

        if client_changed {
            self.ensure_client(business_id, &updated.client).await?;
        }

        if !self
            .invoices
            .replace(business_id, &updated, expected_version)
            .await?
        {
            return match self.invoices.find(business_id, invoice_id).await? {
                Some(stored) => Err(InvoiceError::Conflict {
                    expected: expected_version.unwrap_or(current.version),
                    actual: stored.version,
                }),
                None => Err(InvoiceError::NotFound),
            };
        }

        info!(version = updated.version, "Invoice updated");
        Ok(updated)
    }

    #[instrument(skip(self), fields(business_id = %business_id, invoice_id = %invoice_id))]
    pub async fn delete(&self, business_id: &str, invoice_id: &str) -> Result<(), InvoiceError> {
        if !self.invoices.delete(business_id, invoice_id).await? {
            return Err(InvoiceError::NotFound);
        }
        info!("Invoice deleted");
        Ok(())
    }

    /// Resolve the clients referenced by `invoices`. Deleted clients are
    /// absent from the map.
    pub async fn clients_for(
        &self,
        business_id: &str,
        invoices: &[Invoice],
    ) -> Result<HashMap<String, Client>, InvoiceError> {
        let mut ids: Vec<String> = invoices.iter().map(|i| i.client.clone()).collect();
        ids.sort();
        ids.dedup();
        self.directory.clients_by_id(business_id, &ids).await
    }

    pub async fn client(
        &self,
        business_id: &str,
        client_id: &str,
    ) -> Result<Option<Client>, InvoiceError> {
        self.directory.find_client(business_id, client_id).await
    }
}
