//! Dashboard composition: headline stats plus the most recent invoices.

use crate::error::InvoiceError;
use crate::models::{InvoiceFilter, InvoiceStatus, PageRequest};
use crate::services::reports::{DashboardStats, ReportService};
use crate::services::repository::InvoiceRepository;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

pub const RECENT_INVOICES: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentInvoice {
    #[serde(rename = "_id")]
    pub id: String,
    pub invoice_number: String,
    pub invoice_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub status: InvoiceStatus,
    /// `None` when the client has been deleted.
    pub client_name: Option<String>,
    pub total: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    #[serde(flatten)]
    pub stats: DashboardStats,
    pub recent_invoices: Vec<RecentInvoice>,
}

#[derive(Clone)]
pub struct DashboardComposer {
    reports: ReportService,
    repository: InvoiceRepository,
}

impl DashboardComposer {
    pub fn new(reports: ReportService, repository: InvoiceRepository) -> Self {
        Self {
            reports,
            repository,
        }
    }

    /// A business with no invoices gets zeroed figures and empty lists.
    #[instrument(skip(self), fields(business_id = %business_id))]
    pub async fn compose(
        &self,
        business_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Dashboard, InvoiceError> {
        let everything = InvoiceFilter::default();
        let (stats, recent) = tokio::try_join!(
            self.reports.dashboard_stats(business_id, now),
            self.repository.list(
                business_id,
                &everything,
                PageRequest::new(Some(1), Some(RECENT_INVOICES)),
            ),
        )?;

        let clients = self.repository.clients_for(business_id, &recent.items).await?;

        let recent_invoices = recent
            .items
            .into_iter()
            .map(|invoice| RecentInvoice {
                client_name: clients.get(&invoice.client).map(|c| c.name.clone()),
                total: invoice.total(),
                id: invoice.id,
                invoice_number: invoice.invoice_number,
                invoice_date: invoice.invoice_date,
                due_date: invoice.due_date,
                status: invoice.status,
            })
            .collect();

        Ok(Dashboard {
            stats,
            recent_invoices,
        })
    }
}
