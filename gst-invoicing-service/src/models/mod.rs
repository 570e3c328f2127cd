pub mod client;
pub mod invoice;
pub mod line_item;
pub mod tax;

pub use client::{Business, Client};
pub use invoice::{
    ClaimedTotals, CreateInvoice, DateRange, Invoice, InvoiceFilter, InvoicePage, InvoiceStatus,
    InvoiceTotals, PageRequest, UpdateInvoice,
};
pub use line_item::{CreateLineItem, InvoiceItem};
pub use tax::{GstSplit, Supply};
