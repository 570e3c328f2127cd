//! Status lifecycle: mark-paid, the overdue sweep and the background sweeper.

mod common;

use axum::http::StatusCode;
use chrono::{Duration as ChronoDuration, Utc};
use common::{invoice_body, TestApp, CLIENT_A, CLIENT_B, USER_A, USER_B};
use gst_invoicing_service::services::{LifecycleManager, OverdueSweeper, SweepConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn due_in(days: i64, number: &str, client_id: &str, status: &str) -> Value {
    let today = Utc::now().date_naive();
    let mut body = invoice_body(number, client_id, 1.0, 100.0, 18.0);
    body["invoiceDate"] = json!((today - ChronoDuration::days(30)).to_string());
    body["dueDate"] = json!((today + ChronoDuration::days(days)).to_string());
    body["status"] = json!(status);
    body
}

#[tokio::test]
async fn overdue_then_paid_then_sweep_again() {
    let app = TestApp::spawn().await;
    let id = app
        .create_invoice(USER_A, due_in(-1, "INV-001", CLIENT_A, "PENDING"))
        .await;
    let uri = format!("/invoices/{}", id);

    let sweep = app.post("/invoices/check-overdue", USER_A, json!({})).await;
    assert_eq!(sweep.status, StatusCode::OK);
    assert_eq!(sweep.body["updatedCount"], 1);
    assert_eq!(app.get(&uri, USER_A).await.body["status"], "OVERDUE");

    let paid = app
        .post(&format!("{}/mark-paid", uri), USER_A, json!({}))
        .await;
    assert_eq!(paid.status, StatusCode::OK);
    assert_eq!(paid.body["status"], "PAID");

    let sweep = app.post("/invoices/check-overdue", USER_A, json!({})).await;
    assert_eq!(sweep.body["updatedCount"], 0);
    assert_eq!(app.get(&uri, USER_A).await.body["status"], "PAID");
}

#[tokio::test]
async fn sweep_is_idempotent_and_skips_future_due_dates() {
    let app = TestApp::spawn().await;
    app.create_invoice(USER_A, due_in(-10, "INV-001", CLIENT_A, "PENDING"))
        .await;
    app.create_invoice(USER_A, due_in(-3, "INV-002", CLIENT_A, "DRAFT"))
        .await;
    app.create_invoice(USER_A, due_in(-3, "INV-003", CLIENT_A, "PAID"))
        .await;
    let future = app
        .create_invoice(USER_A, due_in(5, "INV-004", CLIENT_A, "UNPAID"))
        .await;

    let first = app.post("/invoices/check-overdue", USER_A, json!({})).await;
    assert_eq!(first.body["updatedCount"], 2);

    let second = app.post("/invoices/check-overdue", USER_A, json!({})).await;
    assert_eq!(second.body["updatedCount"], 0);

    let future = app.get(&format!("/invoices/{}", future), USER_A).await;
    assert_eq!(future.body["status"], "UNPAID");

    let overdue = app.get("/invoices?status=OVERDUE", USER_A).await;
    assert_eq!(overdue.body["totalCount"], 2);
}

#[tokio::test]
async fn sweep_only_touches_the_callers_business() {
    let app = TestApp::spawn().await;
    app.create_invoice(USER_A, due_in(-1, "INV-001", CLIENT_A, "PENDING"))
        .await;
    let other = app
        .create_invoice(USER_B, due_in(-1, "INV-001", CLIENT_B, "PENDING"))
        .await;

    let sweep = app.post("/invoices/check-overdue", USER_A, json!({})).await;
    assert_eq!(sweep.body["updatedCount"], 1);

    let other = app.get(&format!("/invoices/{}", other), USER_B).await;
    assert_eq!(other.body["status"], "PENDING");
}

#[tokio::test]
async fn mark_paid_on_unknown_invoice_is_not_found() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/invoices/missing/mark-paid", USER_A, json!({}))
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn background_sweeper_covers_every_business() {
    let app = TestApp::spawn().await;
    app.create_invoice(USER_A, due_in(-2, "INV-001", CLIENT_A, "PENDING"))
        .await;
    app.create_invoice(USER_B, due_in(-2, "INV-001", CLIENT_B, "UNPAID"))
        .await;
    app.create_invoice(USER_B, due_in(2, "INV-002", CLIENT_B, "UNPAID"))
        .await;

    let sweeper = OverdueSweeper::new(
        SweepConfig {
            enabled: true,
            interval: Duration::from_secs(3600),
        },
        LifecycleManager::new(Arc::new(app.store.clone())),
    );

    assert_eq!(sweeper.run_once().await, 2);
    assert_eq!(sweeper.run_once().await, 0);

    let overdue_b = app.get("/invoices?status=overdue", USER_B).await;
    assert_eq!(overdue_b.body["totalCount"], 1);
}

#[tokio::test]
async fn sweeper_stops_when_cancelled() {
    let app = TestApp::spawn().await;
    let sweeper = OverdueSweeper::new(
        SweepConfig {
            enabled: true,
            interval: Duration::from_millis(10),
        },
        LifecycleManager::new(Arc::new(app.store.clone())),
    );
    let token = sweeper.shutdown_token();

    let handle = tokio::spawn(sweeper.start());
    token.cancel();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("sweeper did not stop")
        .expect("sweeper panicked");
}
