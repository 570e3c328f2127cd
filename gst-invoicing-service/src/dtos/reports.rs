use crate::error::InvoiceError;
use crate::models::DateRange;
use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;

use super::date_range;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl DateRangeParams {
    pub fn range(&self) -> Result<DateRange, InvoiceError> {
        date_range(self.start_date.as_deref(), self.end_date.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MonthlyReportParams {
    pub year: Option<String>,
}

impl MonthlyReportParams {
    /// The requested year, or the current one when absent or empty.
    pub fn year(&self, now: DateTime<Utc>) -> Result<i32, InvoiceError> {
        match self.year.as_deref().map(str::trim) {
            None | Some("") => Ok(now.year()),
            Some(raw) => raw
                .parse::<i32>()
                .ok()
                .filter(|y| (1..=9999).contains(y))
                .ok_or_else(|| InvoiceError::Validation(format!("Invalid year: {}", raw))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailReportParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
}

impl DetailReportParams {
    pub fn into_parts(self) -> Result<(DateRange, Option<String>), InvoiceError> {
        let range = date_range(self.start_date.as_deref(), self.end_date.as_deref())?;
        let search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Ok((range, search))
    }
}
