mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{invoice_body, money, TestApp, CLIENT_A, USER_A, USER_B};
use serde_json::json;

#[tokio::test]
async fn empty_business_gets_zeroed_dashboard() {
    let app = TestApp::spawn().await;

    let response = app.get("/invoices/dashboard-stats", USER_B).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = &response.body;
    assert_eq!(body["invoiceCount"], 0);
    assert_eq!(money(&body["totalInvoiced"]), 0.0);
    assert_eq!(money(&body["totalPaid"]), 0.0);
    assert_eq!(money(&body["totalOutstanding"]), 0.0);
    assert_eq!(money(&body["totalCGST"]), 0.0);
    assert!(body["monthlyData"].as_array().unwrap().is_empty());
    assert!(body["recentInvoices"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn dashboard_combines_totals_window_and_recent_invoices() {
    let app = TestApp::spawn().await;
    let today = Utc::now().date_naive();

    for day in 1..=6 {
        let mut body = invoice_body(&format!("INV-{:03}", day), CLIENT_A, 1.0, 100.0, 18.0);
        body["invoiceDate"] = json!((today - Duration::days(day)).to_string());
        body["dueDate"] = json!((today + Duration::days(30)).to_string());
        if day == 1 {
            body["status"] = json!("PAID");
        }
        app.create_invoice(USER_A, body).await;
    }

    let mut old = invoice_body("INV-OLD", CLIENT_A, 1.0, 1000.0, 18.0);
    old["invoiceDate"] = json!((today - Duration::days(300)).to_string());
    app.create_invoice(USER_A, old).await;

    let response = app.get("/invoices/dashboard-stats", USER_A).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    let body = &response.body;

    assert_eq!(body["invoiceCount"], 7);
    assert_eq!(money(&body["totalInvoiced"]), 6.0 * 118.0 + 1180.0);
    assert_eq!(money(&body["totalPaid"]), 118.0);
    assert_eq!(money(&body["totalOutstanding"]), 5.0 * 118.0 + 1180.0);
    assert_eq!(money(&body["totalCGST"]), 6.0 * 9.0 + 90.0);
    assert_eq!(money(&body["totalIGST"]), 0.0);

    // The 300-day-old invoice falls outside the six-month window
    let monthly = body["monthlyData"].as_array().unwrap();
    let windowed: u64 = monthly
        .iter()
        .map(|m| m["invoiceCount"].as_u64().unwrap())
        .sum();
    assert_eq!(windowed, 6);
    let months: Vec<&str> = monthly.iter().map(|m| m["month"].as_str().unwrap()).collect();
    let mut sorted = months.clone();
    sorted.sort();
    assert_eq!(months, sorted);
    let newest_month = (today - Duration::days(1)).format("%Y-%m").to_string();
    assert_eq!(*months.last().unwrap(), newest_month.as_str());

    let recent = body["recentInvoices"].as_array().unwrap();
    assert_eq!(recent.len(), 5);
    assert_eq!(recent[0]["invoiceNumber"], "INV-001");
    assert_eq!(recent[0]["status"], "PAID");
    assert_eq!(recent[0]["clientName"], "Globex Retail");
    assert_eq!(recent[4]["invoiceNumber"], "INV-005");
}
