#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use gst_invoicing_service::models::{Business, Client};
use gst_invoicing_service::services::{MemoryStore, TokenVerifier};
use gst_invoicing_service::{build_router, AppState};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-secret";

// Two tenants, each with one client
pub const USER_A: &str = "user-a";
pub const BUSINESS_A: &str = "business-a";
pub const CLIENT_A: &str = "client-a";

pub const USER_B: &str = "user-b";
pub const BUSINESS_B: &str = "business-b";
pub const CLIENT_B: &str = "client-b";

/// A user with a valid token but no business.
pub const ORPHAN_USER: &str = "user-without-business";

pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let store = MemoryStore::new();

        for (business_id, user_id, name, client_id, client_name) in [
            (BUSINESS_A, USER_A, "Acme Traders", CLIENT_A, "Globex Retail"),
            (BUSINESS_B, USER_B, "Bharat Supplies", CLIENT_B, "Initech Labs"),
        ] {
            store
                .insert_business(Business {
                    id: business_id.to_string(),
                    name: name.to_string(),
                    user: user_id.to_string(),
                    address: None,
                    gstin: None,
                })
                .await;
            store
                .insert_client(Client {
                    id: client_id.to_string(),
                    business: business_id.to_string(),
                    name: client_name.to_string(),
                    address: Some("12 MG Road, Bengaluru".to_string()),
                    gstin: Some("29ABCDE1234F1Z5".to_string()),
                    contact: Some("accounts@example.com".to_string()),
                })
                .await;
        }

        let tokens = TokenVerifier::new(&Secret::new(JWT_SECRET.to_string()));
        let state = AppState::new(Arc::new(store.clone()), Arc::new(store.clone()), tokens);

        TestApp {
            router: build_router(state),
            store,
        }
    }

    pub fn token_for(&self, user_id: &str) -> String {
        let claims = json!({
            "userId": user_id,
            "exp": (Utc::now() + Duration::hours(1)).timestamp(),
        });
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
        )
        .expect("Failed to mint token")
    }

    /// Send a request; `user_id` of `None` sends no Authorization header.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user_id: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user_id {
            builder = builder.header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token_for(user_id)),
            );
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str, user_id: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(user_id), None).await
    }

    pub async fn post(&self, uri: &str, user_id: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(user_id), Some(body))
            .await
    }

    pub async fn put(&self, uri: &str, user_id: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(user_id), Some(body))
            .await
    }

    pub async fn delete(&self, uri: &str, user_id: &str) -> TestResponse {
        self.request(Method::DELETE, uri, Some(user_id), None).await
    }

    /// Create an invoice and return its id, failing the test on error.
    pub async fn create_invoice(&self, user_id: &str, body: Value) -> String {
        let response = self.post("/invoices", user_id, body).await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "create failed: {}",
            response.body
        );
        response.body["_id"]
            .as_str()
            .expect("Missing invoice id")
            .to_string()
    }
}

/// Minimal valid create body with one line item.
pub fn invoice_body(number: &str, client_id: &str, quantity: f64, rate: f64, gst_rate: f64) -> Value {
    json!({
        "invoiceNumber": number,
        "clientId": client_id,
        "invoiceDate": "2024-01-15",
        "dueDate": "2024-02-14",
        "status": "PENDING",
        "items": [
            {
                "description": "Consulting",
                "hsnSac": "998311",
                "quantity": quantity,
                "rate": rate,
                "gstRate": gst_rate
            }
        ]
    })
}

pub fn money(value: &Value) -> f64 {
    value
        .as_f64()
        .unwrap_or_else(|| panic!("Expected a number, got {}", value))
}
