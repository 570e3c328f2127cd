//! Services module for gst-invoicing-service.

pub mod auth;
pub mod dashboard;
pub mod database;
pub mod lifecycle;
pub mod memory;
pub mod metrics;
pub mod reports;
pub mod repository;
pub mod scheduler;
pub mod store;

pub use auth::TokenVerifier;
pub use dashboard::DashboardComposer;
pub use database::MongoDb;
pub use lifecycle::LifecycleManager;
pub use memory::MemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use reports::ReportService;
pub use repository::InvoiceRepository;
pub use scheduler::{OverdueSweeper, SweepConfig};
pub use store::{DirectoryStore, InvoiceStore};
