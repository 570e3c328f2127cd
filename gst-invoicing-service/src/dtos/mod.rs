pub mod invoices;
pub mod reports;

pub use invoices::{
    ClientRef, CreateInvoiceRequest, InvoiceListResponse, InvoiceResponse, LineItemRequest,
    ListInvoicesParams, MessageResponse, SweepResponse, UpdateInvoiceRequest,
};
pub use reports::{DateRangeParams, DetailReportParams, MonthlyReportParams};

use crate::error::InvoiceError;
use crate::models::DateRange;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse a request date.
///
/// Accepts RFC 3339 timestamps, bare `YYYY-MM-DD` dates (UTC midnight) and
/// naive `YYYY-MM-DDTHH:MM:SS` timestamps (taken as UTC).
pub fn parse_date(field: &str, value: &str) -> Result<DateTime<Utc>, InvoiceError> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }

    Err(InvoiceError::Validation(format!(
        "Invalid {}: {}",
        field, value
    )))
}

/// Build an inclusive range from optional `startDate` / `endDate` values.
/// Empty strings count as absent. An inverted range matches nothing.
pub fn date_range(start: Option<&str>, end: Option<&str>) -> Result<DateRange, InvoiceError> {
    let parse = |field: &str, value: Option<&str>| {
        value
            .filter(|v| !v.trim().is_empty())
            .map(|v| parse_date(field, v))
            .transpose()
    };

    Ok(DateRange::new(
        parse("startDate", start)?,
        parse("endDate", end)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn bare_dates_are_utc_midnight() {
        assert_eq!(
            parse_date("invoiceDate", "2024-01-15").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn offsets_are_normalized_to_utc() {
        assert_eq!(
            parse_date("invoiceDate", "2024-01-15T05:30:00+05:30").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date("invoiceDate", "2024-01-15T10:00:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn garbage_is_a_validation_error() {
        assert!(matches!(
            parse_date("dueDate", "next tuesday"),
            Err(InvoiceError::Validation(_))
        ));
    }

    #[test]
    fn empty_bounds_are_unbounded() {
        assert!(date_range(Some(""), None).unwrap().is_unbounded());
    }

    #[test]
    fn inverted_range_matches_nothing() {
        let range = date_range(Some("2024-02-01"), Some("2024-01-01")).unwrap();
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()));
    }
}
