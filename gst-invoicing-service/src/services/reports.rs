//! GST reporting and aggregation.
//!
//! Every report streams the business's matching invoices out of the store
//! and folds them in process. Sums are exact decimals; the results equal a
//! naive load-everything-and-add reference to the last digit.

use crate::error::InvoiceError;
use crate::models::{Client, DateRange, Invoice, InvoiceFilter, InvoiceStatus};
use crate::services::metrics::REPORT_DURATION;
use crate::services::store::{DirectoryStore, InvoiceStore};
use chrono::{DateTime, Datelike, Duration, Months, TimeZone, Utc};
use futures::TryStreamExt;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::instrument;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Width of the rolling dashboard window.
pub const DASHBOARD_MONTHS: u32 = 6;

/// Running sums over a set of invoices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TaxTotals {
    sales: Decimal,
    cgst: Decimal,
    sgst: Decimal,
    igst: Decimal,
    gst: Decimal,
    amount: Decimal,
    count: u64,
}

impl TaxTotals {
    fn add(&mut self, invoice: &Invoice) -> Result<(), InvoiceError> {
        accumulate(&mut self.sales, invoice.subtotal())?;
        accumulate(&mut self.cgst, invoice.cgst_amount())?;
        accumulate(&mut self.sgst, invoice.sgst_amount())?;
        accumulate(&mut self.igst, invoice.igst_amount())?;
        accumulate(&mut self.gst, invoice.cgst_amount())?;
        accumulate(&mut self.gst, invoice.sgst_amount())?;
        accumulate(&mut self.gst, invoice.igst_amount())?;
        accumulate(&mut self.amount, invoice.total())?;
        self.count += 1;
        Ok(())
    }
}

/// Add `value` to a running report total.
fn accumulate(total: &mut Decimal, value: Decimal) -> Result<(), InvoiceError> {
    *total = total
        .checked_add(value)
        .ok_or_else(|| InvoiceError::Integrity("report totals out of range".to_string()))?;
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GstSummary {
    pub total_sales: Decimal,
    #[serde(rename = "totalCGST")]
    pub total_cgst: Decimal,
    #[serde(rename = "totalSGST")]
    pub total_sgst: Decimal,
    #[serde(rename = "totalIGST")]
    pub total_igst: Decimal,
    #[serde(rename = "totalGST")]
    pub total_gst: Decimal,
    pub total_amount: Decimal,
    pub invoice_count: u64,
}

impl From<TaxTotals> for GstSummary {
    fn from(t: TaxTotals) -> Self {
        Self {
            total_sales: t.sales,
            total_cgst: t.cgst,
            total_sgst: t.sgst,
            total_igst: t.igst,
            total_gst: t.gst,
            total_amount: t.amount,
            invoice_count: t.count,
        }
    }
}

/// Line items grouped by GST rate.
///
/// `totalAmount` is the taxable value (`quantity * rate`) of the group and
/// `totalTax` the GST charged on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateWiseEntry {
    pub gst_rate: Decimal,
    pub total_quantity: Decimal,
    pub total_amount: Decimal,
    pub total_tax: Decimal,
    pub item_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyEntry {
    /// Calendar month, 1 to 12.
    pub month: u32,
    pub month_name: &'static str,
    pub total_sales: Decimal,
    #[serde(rename = "totalCGST")]
    pub total_cgst: Decimal,
    #[serde(rename = "totalSGST")]
    pub total_sgst: Decimal,
    #[serde(rename = "totalIGST")]
    pub total_igst: Decimal,
    pub total_amount: Decimal,
    pub invoice_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSummary {
    pub total_invoiced: Decimal,
    pub total_paid: Decimal,
    /// `totalInvoiced - totalPaid`: every non-PAID invoice counts, drafts
    /// included.
    pub total_outstanding: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailRow {
    pub id: String,
    pub invoice_number: String,
    pub date: DateTime<Utc>,
    pub customer: String,
    pub taxable_amount: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue {
    /// `YYYY-MM`.
    pub month: String,
    pub revenue: Decimal,
    pub invoice_count: u64,
}

/// Headline figures plus the rolling monthly revenue series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub invoice_count: u64,
    pub total_invoiced: Decimal,
    pub total_paid: Decimal,
    pub total_outstanding: Decimal,
    #[serde(rename = "totalCGST")]
    pub total_cgst: Decimal,
    #[serde(rename = "totalSGST")]
    pub total_sgst: Decimal,
    #[serde(rename = "totalIGST")]
    pub total_igst: Decimal,
    /// Months without invoices are omitted.
    pub monthly_data: Vec<MonthlyRevenue>,
}

/// Inclusive `invoiceDate` bounds covering one calendar year (UTC).
pub fn year_range(year: i32) -> Result<DateRange, InvoiceError> {
    let start = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single();
    let next = year
        .checked_add(1)
        .and_then(|y| Utc.with_ymd_and_hms(y, 1, 1, 0, 0, 0).single());

    match (start, next) {
        (Some(start), Some(next)) => Ok(DateRange::new(
            Some(start),
            Some(next - Duration::milliseconds(1)),
        )),
        _ => Err(InvoiceError::Validation(format!("Invalid year: {}", year))),
    }
}

#[derive(Clone)]
pub struct ReportService {
    invoices: Arc<dyn InvoiceStore>,
    directory: Arc<dyn DirectoryStore>,
}

impl ReportService {
    pub fn new(invoices: Arc<dyn InvoiceStore>, directory: Arc<dyn DirectoryStore>) -> Self {
        Self {
            invoices,
            directory,
        }
    }

    fn range_filter(date_range: DateRange) -> InvoiceFilter {
        InvoiceFilter {
            date_range,
            ..Default::default()
        }
    }

    #[instrument(skip(self), fields(business_id = %business_id))]
    pub async fn summary(
        &self,
        business_id: &str,
        date_range: DateRange,
    ) -> Result<GstSummary, InvoiceError> {
        let timer = REPORT_DURATION.with_label_values(&["summary"]).start_timer();

        let mut stream = self
            .invoices
            .stream(business_id, &Self::range_filter(date_range))
            .await?;
        let mut totals = TaxTotals::default();
        while let Some(invoice) = stream.try_next().await? {
            totals.add(&invoice)?;
        }

        timer.observe_duration();
        Ok(totals.into())
    }

    #[instrument(skip(self), fields(business_id = %business_id))]
    pub async fn rate_wise_breakdown(
        &self,
        business_id: &str,
        date_range: DateRange,
    ) -> Result<Vec<RateWiseEntry>, InvoiceError> {
        let timer = REPORT_DURATION
            .with_label_values(&["rate_wise"])
            .start_timer();

        let mut stream = self
            .invoices
            .stream(business_id, &Self::range_filter(date_range))
            .await?;
        let mut groups: BTreeMap<Decimal, RateWiseEntry> = BTreeMap::new();
        while let Some(invoice) = stream.try_next().await? {
            for item in invoice.items() {
                let rate = item.gst_rate().normalize();
                let entry = groups.entry(rate).or_insert_with(|| RateWiseEntry {
                    gst_rate: rate,
                    ..Default::default()
                });
                accumulate(&mut entry.total_quantity, item.quantity())?;
                accumulate(&mut entry.total_amount, item.taxable_value()?)?;
                accumulate(&mut entry.total_tax, item.gst_amount()?)?;
                entry.item_count += 1;
            }
        }

        timer.observe_duration();
        Ok(groups.into_values().collect())
    }

    /// Twelve entries, January to December, zero-filled.
    #[instrument(skip(self), fields(business_id = %business_id))]
    pub async fn monthly_breakdown(
        &self,
        business_id: &str,
        year: i32,
    ) -> Result<Vec<MonthlyEntry>, InvoiceError> {
        let timer = REPORT_DURATION.with_label_values(&["monthly"]).start_timer();

        let mut stream = self
            .invoices
            .stream(business_id, &Self::range_filter(year_range(year)?))
            .await?;
        let mut months = [TaxTotals::default(); 12];
        while let Some(invoice) = stream.try_next().await? {
            months[invoice.invoice_date.month0() as usize].add(&invoice)?;
        }

        timer.observe_duration();
        Ok(months
            .iter()
            .zip(MONTH_NAMES)
            .enumerate()
            .map(|(index, (t, month_name))| MonthlyEntry {
                month: index as u32 + 1,
                month_name,
                total_sales: t.sales,
                total_cgst: t.cgst,
                total_sgst: t.sgst,
                total_igst: t.igst,
                total_amount: t.amount,
                invoice_count: t.count,
            })
            .collect())
    }

    /// Totals over every invoice of the business, whatever its status.
    #[instrument(skip(self), fields(business_id = %business_id))]
    pub async fn invoice_summary(&self, business_id: &str) -> Result<InvoiceSummary, InvoiceError> {
        let timer = REPORT_DURATION
            .with_label_values(&["invoice_summary"])
            .start_timer();

        let mut stream = self
            .invoices
            .stream(business_id, &InvoiceFilter::default())
            .await?;
        let mut summary = InvoiceSummary::default();
        while let Some(invoice) = stream.try_next().await? {
            accumulate(&mut summary.total_invoiced, invoice.total())?;
            if invoice.status == InvoiceStatus::Paid {
                accumulate(&mut summary.total_paid, invoice.total())?;
            }
        }
        summary.total_outstanding = summary.total_invoiced - summary.total_paid;

        timer.observe_duration();
        Ok(summary)
    }

    /// One row per invoice, newest first.
    #[instrument(skip(self), fields(business_id = %business_id))]
    pub async fn detail_report(
        &self,
        business_id: &str,
        date_range: DateRange,
        search: Option<String>,
    ) -> Result<Vec<DetailRow>, InvoiceError> {
        let timer = REPORT_DURATION.with_label_values(&["details"]).start_timer();

        let filter = InvoiceFilter {
            search,
            date_range,
            ..Default::default()
        };
        let invoices: Vec<Invoice> = self
            .invoices
            .stream(business_id, &filter)
            .await?
            .try_collect()
            .await?;

        let mut client_ids: Vec<String> = invoices.iter().map(|i| i.client.clone()).collect();
        client_ids.sort();
        client_ids.dedup();
        let clients: HashMap<String, Client> = self
            .directory
            .clients_by_id(business_id, &client_ids)
            .await?;

        timer.observe_duration();
        Ok(invoices
            .into_iter()
            .map(|invoice| DetailRow {
                customer: clients
                    .get(&invoice.client)
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| Client::UNKNOWN.to_string()),
                taxable_amount: invoice.subtotal(),
                cgst: invoice.cgst_amount(),
                sgst: invoice.sgst_amount(),
                igst: invoice.igst_amount(),
                total: invoice.total(),
                date: invoice.invoice_date,
                id: invoice.id,
                invoice_number: invoice.invoice_number,
            })
            .collect())
    }

    /// Dashboard headline figures over all invoices, and revenue per month
    /// for invoices dated within the last six months of `now`.
    #[instrument(skip(self), fields(business_id = %business_id))]
    pub async fn dashboard_stats(
        &self,
        business_id: &str,
        now: DateTime<Utc>,
    ) -> Result<DashboardStats, InvoiceError> {
        let timer = REPORT_DURATION
            .with_label_values(&["dashboard"])
            .start_timer();

        let window_start = now.checked_sub_months(Months::new(DASHBOARD_MONTHS));

        let mut stream = self
            .invoices
            .stream(business_id, &InvoiceFilter::default())
            .await?;
        let mut stats = DashboardStats::default();
        let mut monthly: BTreeMap<(i32, u32), (Decimal, u64)> = BTreeMap::new();
        while let Some(invoice) = stream.try_next().await? {
            stats.invoice_count += 1;
            accumulate(&mut stats.total_invoiced, invoice.total())?;
            if invoice.status == InvoiceStatus::Paid {
                accumulate(&mut stats.total_paid, invoice.total())?;
            }
            accumulate(&mut stats.total_cgst, invoice.cgst_amount())?;
            accumulate(&mut stats.total_sgst, invoice.sgst_amount())?;
            accumulate(&mut stats.total_igst, invoice.igst_amount())?;

            if window_start.map_or(true, |start| invoice.invoice_date >= start) {
                let key = (invoice.invoice_date.year(), invoice.invoice_date.month());
                let bucket = monthly.entry(key).or_insert((Decimal::ZERO, 0));
                accumulate(&mut bucket.0, invoice.total())?;
                bucket.1 += 1;
            }
        }
        stats.total_outstanding = stats.total_invoiced - stats.total_paid;
        stats.monthly_data = monthly
            .into_iter()
            .map(|((year, month), (revenue, invoice_count))| MonthlyRevenue {
                month: format!("{:04}-{:02}", year, month),
                revenue,
                invoice_count,
            })
            .collect();

        timer.observe_duration();
        Ok(stats)
    }
}
