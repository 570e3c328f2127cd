//! Invoice status lifecycle.
//!
//! Status can be set to anything through a plain update. The two operations
//! here are the higher-level transitions: paying an invoice and the overdue
//! sweep. An OVERDUE invoice whose due date is later moved into the future
//! stays OVERDUE until someone updates its status by hand.

use crate::error::InvoiceError;
use crate::models::{Invoice, InvoiceStatus};
use crate::services::metrics::STATUS_TRANSITIONS_TOTAL;
use crate::services::store::InvoiceStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct LifecycleManager {
    invoices: Arc<dyn InvoiceStore>,
}

impl LifecycleManager {
    pub fn new(invoices: Arc<dyn InvoiceStore>) -> Self {
        Self { invoices }
    }

    /// Set the invoice to PAID, whatever its current status.
    #[instrument(skip(self), fields(business_id = %business_id, invoice_id = %invoice_id))]
    pub async fn mark_paid(
        &self,
        business_id: &str,
        invoice_id: &str,
    ) -> Result<Invoice, InvoiceError> {
        let invoice = self
            .invoices
            .set_status(business_id, invoice_id, InvoiceStatus::Paid, Utc::now())
            .await?
            .ok_or(InvoiceError::NotFound)?;

        STATUS_TRANSITIONS_TOTAL
            .with_label_values(&[InvoiceStatus::Paid.as_str(), "mark_paid"])
            .inc();
        info!("Invoice marked as paid");

        Ok(invoice)
    }

    /// Move past-due invoices of one business to OVERDUE.
    ///
    /// PAID and OVERDUE invoices are never touched, so a second run with no
    /// writes in between changes nothing and returns 0.
    pub async fn sweep_overdue(&self, business_id: &str) -> Result<u64, InvoiceError> {
        self.sweep_overdue_at(business_id, Utc::now()).await
    }

    #[instrument(skip(self), fields(business_id = %business_id))]
    pub async fn sweep_overdue_at(
        &self,
        business_id: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, InvoiceError> {
        let updated = self.invoices.mark_overdue(business_id, now).await?;

        if updated > 0 {
            STATUS_TRANSITIONS_TOTAL
                .with_label_values(&[InvoiceStatus::Overdue.as_str(), "sweep"])
                .inc_by(updated as f64);
            info!(updated, "Invoices marked overdue");
        }

        Ok(updated)
    }

    /// Businesses that currently have invoices the sweep would move.
    pub async fn businesses_with_overdue(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, InvoiceError> {
        self.invoices.open_business_ids(now).await
    }
}
