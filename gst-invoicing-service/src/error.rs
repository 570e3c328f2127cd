//! Domain error taxonomy and its mapping onto HTTP errors.

use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InvoiceError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid item: {0}")]
    InvalidItem(String),

    #[error("Invoice number {0} already exists for this business.")]
    DuplicateInvoiceNumber(String),

    #[error("Client not found for this business")]
    ClientNotFound,

    #[error("Invoice not found")]
    NotFound,

    #[error("Invoice was modified concurrently (expected version {expected}, found {actual})")]
    Conflict { expected: i64, actual: i64 },

    #[error("Not authorized, {0}")]
    Unauthorized(String),

    #[error("Stored data is inconsistent: {0}")]
    Integrity(String),

    #[error("Database error: {0}")]
    Database(anyhow::Error),
}

impl InvoiceError {
    /// Short label for the error counter.
    pub fn kind(&self) -> &'static str {
        match self {
            InvoiceError::Validation(_) => "validation",
            InvoiceError::InvalidItem(_) => "invalid_item",
            InvoiceError::DuplicateInvoiceNumber(_) => "duplicate_invoice_number",
            InvoiceError::ClientNotFound => "client_not_found",
            InvoiceError::NotFound => "not_found",
            InvoiceError::Conflict { .. } => "conflict",
            InvoiceError::Unauthorized(_) => "unauthorized",
            InvoiceError::Integrity(_) => "integrity",
            InvoiceError::Database(_) => "database",
        }
    }
}

impl From<mongodb::error::Error> for InvoiceError {
    fn from(err: mongodb::error::Error) -> Self {
        InvoiceError::Database(anyhow::Error::new(err))
    }
}

impl From<mongodb::bson::ser::Error> for InvoiceError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        InvoiceError::Database(anyhow::Error::new(err))
    }
}

impl From<validator::ValidationErrors> for InvoiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        InvoiceError::Validation(format!("Missing required invoice fields: {}", err))
    }
}

impl From<InvoiceError> for AppError {
    fn from(err: InvoiceError) -> Self {
        crate::services::metrics::ERRORS_TOTAL
            .with_label_values(&[err.kind()])
            .inc();

        match err {
            InvoiceError::Validation(_)
            | InvoiceError::InvalidItem(_)
            | InvoiceError::DuplicateInvoiceNumber(_) => AppError::BadRequest(anyhow::anyhow!(err)),
            InvoiceError::ClientNotFound | InvoiceError::NotFound => {
                AppError::NotFound(anyhow::anyhow!(err))
            }
            InvoiceError::Conflict { .. } => AppError::Conflict(anyhow::anyhow!(err)),
            InvoiceError::Unauthorized(_) => AppError::Unauthorized(anyhow::anyhow!(err)),
            InvoiceError::Integrity(_) => AppError::InternalError(anyhow::anyhow!(err)),
            InvoiceError::Database(e) => AppError::DatabaseError(e),
        }
    }
}
