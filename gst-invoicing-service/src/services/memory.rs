//! In-memory persistence.
//!
//! Backs tests and local runs without MongoDB. Enforces the same tenant
//! filter and `(business, invoiceNumber)` uniqueness as the database.

use crate::error::InvoiceError;
use crate::models::{Business, Client, Invoice, InvoiceFilter, InvoiceStatus, PageRequest};
use crate::services::store::{DirectoryStore, InvoiceStream, InvoiceStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    invoices: HashMap<String, Invoice>,
    clients: HashMap<String, Client>,
    businesses: HashMap<String, Business>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_business(&self, business: Business) {
        self.inner
            .write()
            .await
            .businesses
            .insert(business.id.clone(), business);
    }

    pub async fn insert_client(&self, client: Client) {
        self.inner
            .write()
            .await
            .clients
            .insert(client.id.clone(), client);
    }

    /// Delete a client without touching the invoices that reference it.
    pub async fn remove_client(&self, client_id: &str) -> Option<Client> {
        self.inner.write().await.clients.remove(client_id)
    }

    /// Tenant-filtered matches, newest `invoiceDate` first.
    async fn matching(&self, business_id: &str, filter: &InvoiceFilter) -> Vec<Invoice> {
        let inner = self.inner.read().await;
        let mut invoices: Vec<Invoice> = inner
            .invoices
            .values()
            .filter(|i| i.business == business_id && filter.matches(i))
            .cloned()
            .collect();
        invoices.sort_by_key(|i| Reverse((i.invoice_date, i.id.clone())));
        invoices
    }
}

fn number_taken(inner: &Inner, invoice: &Invoice) -> bool {
    inner.invoices.values().any(|existing| {
        existing.business == invoice.business
            && existing.invoice_number == invoice.invoice_number
            && existing.id != invoice.id
    })
}

fn overdue_candidate(invoice: &Invoice, now: DateTime<Utc>) -> bool {
    invoice.status.can_become_overdue() && invoice.is_past_due(now)
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    async fn insert(&self, invoice: &Invoice) -> Result<(), InvoiceError> {
        let mut inner = self.inner.write().await;
        if number_taken(&inner, invoice) {
            return Err(InvoiceError::DuplicateInvoiceNumber(
                invoice.invoice_number.clone(),
            ));
        }
        inner.invoices.insert(invoice.id.clone(), invoice.clone());
        Ok(())
    }

    async fn find(&self, business_id: &str, id: &str) -> Result<Option<Invoice>, InvoiceError> {
        let inner = self.inner.read().await;
        Ok(inner
            .invoices
            .get(id)
            .filter(|i| i.business == business_id)
            .cloned())
    }

    async fn list(
        &self,
        business_id: &str,
        filter: &InvoiceFilter,
        page: PageRequest,
    ) -> Result<(Vec<Invoice>, u64), InvoiceError> {
        let invoices = self.matching(business_id, filter).await;
        let total_count = invoices.len() as u64;
        let items = invoices
            .into_iter()
            .skip(page.skip() as usize)
            .take(page.limit as usize)
            .collect();
        Ok((items, total_count))
    }

    async fn replace(
        &self,
        business_id: &str,
        invoice: &Invoice,
        expected_version: Option<i64>,
    ) -> Result<bool, InvoiceError> {
        let mut inner = self.inner.write().await;

        let matches = inner.invoices.get(&invoice.id).is_some_and(|stored| {
            stored.business == business_id
                && expected_version.map_or(true, |v| stored.version == v)
        });
        if !matches {
            return Ok(false);
        }
        if number_taken(&inner, invoice) {
            return Err(InvoiceError::DuplicateInvoiceNumber(
                invoice.invoice_number.clone(),
            ));
        }

        inner.invoices.insert(invoice.id.clone(), invoice.clone());
        Ok(true)
    }

    async fn delete(&self, business_id: &str, id: &str) -> Result<bool, InvoiceError> {
        let mut inner = self.inner.write().await;
        let owned = inner
            .invoices
            .get(id)
            .is_some_and(|i| i.business == business_id);
        if owned {
            inner.invoices.remove(id);
        }
        Ok(owned)
    }

    async fn set_status(
        &self,
        business_id: &str,
        id: &str,
        status: InvoiceStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Invoice>, InvoiceError> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .invoices
            .get_mut(id)
            .filter(|i| i.business == business_id)
            .map(|invoice| {
                invoice.status = status;
                invoice.updated_at = now;
                invoice.version += 1;
                invoice.clone()
            }))
    }

    async fn mark_overdue(
        &self,
        business_id: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, InvoiceError> {
        let mut inner = self.inner.write().await;
        let mut updated = 0;
        for invoice in inner
            .invoices
            .values_mut()
            .filter(|i| i.business == business_id && overdue_candidate(i, now))
        {
            invoice.status = InvoiceStatus::Overdue;
            invoice.updated_at = now;
            invoice.version += 1;
            updated += 1;
        }
        Ok(updated)
    }

    async fn stream(
        &self,
        business_id: &str,
        filter: &InvoiceFilter,
    ) -> Result<InvoiceStream, InvoiceError> {
        let invoices = self.matching(business_id, filter).await;
        Ok(futures::stream::iter(invoices.into_iter().map(Ok)).boxed())
    }

    async fn open_business_ids(&self, now: DateTime<Utc>) -> Result<Vec<String>, InvoiceError> {
        let inner = self.inner.read().await;
        let ids: BTreeSet<String> = inner
            .invoices
            .values()
            .filter(|i| overdue_candidate(i, now))
            .map(|i| i.business.clone())
            .collect();
        Ok(ids.into_iter().collect())
    }

    async fn ping(&self) -> Result<(), InvoiceError> {
        Ok(())
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn business_for_user(&self, user_id: &str) -> Result<Option<Business>, InvoiceError> {
        let inner = self.inner.read().await;
        Ok(inner
            .businesses
            .values()
            .find(|b| b.user == user_id)
            .cloned())
    }

    async fn find_client(
        &self,
        business_id: &str,
        client_id: &str,
    ) -> Result<Option<Client>, InvoiceError> {
        let inner = self.inner.read().await;
        Ok(inner
            .clients
            .get(client_id)
            .filter(|c| c.business == business_id)
            .cloned())
    }

    async fn clients_by_id(
        &self,
        business_id: &str,
        client_ids: &[String],
    ) -> Result<HashMap<String, Client>, InvoiceError> {
        let inner = self.inner.read().await;
        Ok(client_ids
            .iter()
            .filter_map(|id| inner.clients.get(id))
            .filter(|c| c.business == business_id)
            .map(|c| (c.id.clone(), c.clone()))
            .collect())
    }
}
