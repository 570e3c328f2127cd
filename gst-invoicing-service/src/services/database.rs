//! MongoDB persistence for gst-invoicing-service.

use crate::error::InvoiceError;
use crate::models::{Business, Client, Invoice, InvoiceFilter, InvoiceStatus, PageRequest};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{DirectoryStore, InvoiceStream, InvoiceStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use mongodb::bson::{doc, Bson, DateTime as BsonDateTime, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{
    FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument,
};
use mongodb::{Client as MongoClient, Collection, Database, IndexModel};
use service_core::error::AppError;
use std::collections::HashMap;
use tracing::{info, instrument};

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        info!("Creating MongoDB indexes for gst-invoicing-service");

        let invoice_number_index = IndexModel::builder()
            .keys(doc! { "business": 1, "invoiceNumber": 1 })
            .options(
                IndexOptions::builder()
                    .name("business_invoice_number_unique".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        let status_index = IndexModel::builder()
            .keys(doc! { "business": 1, "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("business_status_lookup".to_string())
                    .build(),
            )
            .build();

        let invoice_date_index = IndexModel::builder()
            .keys(doc! { "business": 1, "invoiceDate": -1 })
            .options(
                IndexOptions::builder()
                    .name("business_invoice_date_lookup".to_string())
                    .build(),
            )
            .build();

        self.invoices()
            .create_indexes([invoice_number_index, status_index, invoice_date_index], None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create indexes on invoices collection: {}", e);
                AppError::from(e)
            })?;
        info!("Created indexes on invoices.(business, invoiceNumber|status|invoiceDate)");

        let client_index = IndexModel::builder()
            .keys(doc! { "business": 1, "name": 1 })
            .options(
                IndexOptions::builder()
                    .name("business_client_lookup".to_string())
                    .build(),
            )
            .build();

        self.clients()
            .create_index(client_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create index on clients collection: {}", e);
                AppError::from(e)
            })?;

        let business_user_index = IndexModel::builder()
            .keys(doc! { "user": 1 })
            .options(
                IndexOptions::builder()
                    .name("business_user_unique".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.businesses()
            .create_index(business_user_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create index on businesses collection: {}", e);
                AppError::from(e)
            })?;

        Ok(())
    }

    pub fn invoices(&self) -> Collection<Invoice> {
        self.db.collection("invoices")
    }

    pub fn clients(&self) -> Collection<Client> {
        self.db.collection("clients")
    }

    pub fn businesses(&self) -> Collection<Business> {
        self.db.collection("businesses")
    }

    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

fn write_error(err: mongodb::error::Error, invoice_number: &str) -> InvoiceError {
    if is_duplicate_key(&err) {
        InvoiceError::DuplicateInvoiceNumber(invoice_number.to_string())
    } else {
        InvoiceError::from(err)
    }
}

/// Tenant-scoped query document for an invoice filter.
fn invoice_query(business_id: &str, filter: &InvoiceFilter) -> Document {
    let mut query = doc! { "business": business_id };

    if let Some(status) = filter.status {
        query.insert("status", status.as_str());
    }

    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        query.insert(
            "invoiceNumber",
            doc! { "$regex": regex::escape(search), "$options": "i" },
        );
    }

    let mut invoice_date = Document::new();
    if let Some(start) = filter.date_range.start {
        invoice_date.insert("$gte", BsonDateTime::from_chrono(start));
    }
    if let Some(end) = filter.date_range.end {
        invoice_date.insert("$lte", BsonDateTime::from_chrono(end));
    }
    if !invoice_date.is_empty() {
        query.insert("invoiceDate", invoice_date);
    }

    query
}

fn overdue_candidates(now: DateTime<Utc>) -> Document {
    doc! {
        "status": {
            "$nin": [InvoiceStatus::Paid.as_str(), InvoiceStatus::Overdue.as_str()]
        },
        "dueDate": { "$lt": BsonDateTime::from_chrono(now) },
    }
}

fn normalized(result: mongodb::error::Result<Invoice>) -> Result<Invoice, InvoiceError> {
    let mut invoice = result?;
    invoice.normalize()?;
    Ok(invoice)
}

fn newest_first() -> Document {
    doc! { "invoiceDate": -1, "_id": -1 }
}

#[async_trait]
impl InvoiceStore for MongoDb {
    #[instrument(skip(self, invoice), fields(business_id = %invoice.business, invoice_number = %invoice.invoice_number))]
    async fn insert(&self, invoice: &Invoice) -> Result<(), InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_invoice"])
            .start_timer();

        self.invoices()
            .insert_one(invoice, None)
            .await
            .map_err(|e| write_error(e, &invoice.invoice_number))?;

        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self), fields(business_id = %business_id, invoice_id = %id))]
    async fn find(&self, business_id: &str, id: &str) -> Result<Option<Invoice>, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_invoice"])
            .start_timer();

        let invoice = self
            .invoices()
            .find_one(doc! { "_id": id, "business": business_id }, None)
            .await?;

        timer.observe_duration();
        invoice.map(|i| normalized(Ok(i))).transpose()
    }

    #[instrument(skip(self, filter), fields(business_id = %business_id))]
    async fn list(
        &self,
        business_id: &str,
        filter: &InvoiceFilter,
        page: PageRequest,
    ) -> Result<(Vec<Invoice>, u64), InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let query = invoice_query(business_id, filter);
        let total_count = self.invoices().count_documents(query.clone(), None).await?;

        let options = FindOptions::builder()
            .sort(newest_first())
            .skip(page.skip())
            .limit(page.limit as i64)
            .build();

        let invoices: Vec<Invoice> = self
            .invoices()
            .find(query, options)
            .await?
            .map(normalized)
            .try_collect()
            .await?;

        timer.observe_duration();
        Ok((invoices, total_count))
    }

    #[instrument(skip(self, invoice), fields(business_id = %business_id, invoice_id = %invoice.id))]
    async fn replace(
        &self,
        business_id: &str,
        invoice: &Invoice,
        expected_version: Option<i64>,
    ) -> Result<bool, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["replace_invoice"])
            .start_timer();

        let mut query = doc! { "_id": invoice.id.as_str(), "business": business_id };
        if let Some(version) = expected_version {
            query.insert("version", version);
        }

        let result = self
            .invoices()
            .replace_one(query, invoice, None)
            .await
            .map_err(|e| write_error(e, &invoice.invoice_number))?;

        timer.observe_duration();
        Ok(result.matched_count > 0)
    }

    #[instrument(skip(self), fields(business_id = %business_id, invoice_id = %id))]
    async fn delete(&self, business_id: &str, id: &str) -> Result<bool, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_invoice"])
            .start_timer();

        let result = self
            .invoices()
            .delete_one(doc! { "_id": id, "business": business_id }, None)
            .await?;

        timer.observe_duration();
        Ok(result.deleted_count > 0)
    }

    #[instrument(skip(self), fields(business_id = %business_id, invoice_id = %id, status = %status))]
    async fn set_status(
        &self,
        business_id: &str,
        id: &str,
        status: InvoiceStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Invoice>, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["set_invoice_status"])
            .start_timer();

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let invoice = self
            .invoices()
            .find_one_and_update(
                doc! { "_id": id, "business": business_id },
                doc! {
                    "$set": {
                        "status": status.as_str(),
                        "updatedAt": BsonDateTime::from_chrono(now),
                    },
                    "$inc": { "version": 1_i64 },
                },
                options,
            )
            .await?;

        timer.observe_duration();
        invoice.map(|i| normalized(Ok(i))).transpose()
    }

    #[instrument(skip(self), fields(business_id = %business_id))]
    async fn mark_overdue(
        &self,
        business_id: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_overdue"])
            .start_timer();

        let mut query = overdue_candidates(now);
        query.insert("business", business_id);

        let result = self
            .invoices()
            .update_many(
                query,
                doc! {
                    "$set": {
                        "status": InvoiceStatus::Overdue.as_str(),
                        "updatedAt": BsonDateTime::from_chrono(now),
                    },
                    "$inc": { "version": 1_i64 },
                },
                None,
            )
            .await?;

        timer.observe_duration();
        Ok(result.modified_count)
    }

    #[instrument(skip(self, filter), fields(business_id = %business_id))]
    async fn stream(
        &self,
        business_id: &str,
        filter: &InvoiceFilter,
    ) -> Result<InvoiceStream, InvoiceError> {
        let options = FindOptions::builder().sort(newest_first()).build();
        let cursor = self
            .invoices()
            .find(invoice_query(business_id, filter), options)
            .await?;

        Ok(cursor.map(normalized).boxed())
    }

    #[instrument(skip(self))]
    async fn open_business_ids(&self, now: DateTime<Utc>) -> Result<Vec<String>, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["open_business_ids"])
            .start_timer();

        let ids = self
            .invoices()
            .distinct("business", overdue_candidates(now), None)
            .await?;

        timer.observe_duration();
        Ok(ids
            .into_iter()
            .filter_map(|id| match id {
                Bson::String(s) => Some(s),
                _ => None,
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), InvoiceError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                InvoiceError::from(e)
            })?;
        Ok(())
    }
}

#[async_trait]
impl DirectoryStore for MongoDb {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn business_for_user(&self, user_id: &str) -> Result<Option<Business>, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["business_for_user"])
            .start_timer();

        let business = self
            .businesses()
            .find_one(doc! { "user": user_id }, None)
            .await?;

        timer.observe_duration();
        Ok(business)
    }

    #[instrument(skip(self), fields(business_id = %business_id, client_id = %client_id))]
    async fn find_client(
        &self,
        business_id: &str,
        client_id: &str,
    ) -> Result<Option<Client>, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_client"])
            .start_timer();

        let client = self
            .clients()
            .find_one(doc! { "_id": client_id, "business": business_id }, None)
            .await?;

        timer.observe_duration();
        Ok(client)
    }

    #[instrument(skip(self, client_ids), fields(business_id = %business_id, count = client_ids.len()))]
    async fn clients_by_id(
        &self,
        business_id: &str,
        client_ids: &[String],
    ) -> Result<HashMap<String, Client>, InvoiceError> {
        if client_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["clients_by_id"])
            .start_timer();

        let clients: Vec<Client> = self
            .clients()
            .find(
                doc! { "business": business_id, "_id": { "$in": client_ids.to_vec() } },
                None,
            )
            .await?
            .try_collect()
            .await?;

        timer.observe_duration();
        Ok(clients.into_iter().map(|c| (c.id.clone(), c)).collect())
    }
}
