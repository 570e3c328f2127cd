mod common;

use axum::http::StatusCode;
use common::{invoice_body, money, TestApp, CLIENT_A, USER_A};
use serde_json::json;

async fn seed_two_rates(app: &TestApp) {
    let mut first = invoice_body("INV-001", CLIENT_A, 2.0, 100.0, 18.0);
    first["invoiceDate"] = json!("2024-03-10");
    app.create_invoice(USER_A, first).await;

    let mut second = invoice_body("INV-002", CLIENT_A, 1.0, 200.0, 5.0);
    second["invoiceDate"] = json!("2024-07-20");
    second["interState"] = json!(true);
    app.create_invoice(USER_A, second).await;
}

#[tokio::test]
async fn rate_wise_groups_by_rate_ascending() {
    let app = TestApp::spawn().await;
    seed_two_rates(&app).await;

    let response = app.get("/gst-reports/rate-wise", USER_A).await;

    assert_eq!(response.status, StatusCode::OK);
    let groups = response.body.as_array().unwrap();
    assert_eq!(groups.len(), 2);

    assert_eq!(money(&groups[0]["gstRate"]), 5.0);
    assert_eq!(money(&groups[0]["totalQuantity"]), 1.0);
    assert_eq!(money(&groups[0]["totalAmount"]), 200.0);
    assert_eq!(money(&groups[0]["totalTax"]), 10.0);
    assert_eq!(groups[0]["itemCount"], 1);

    assert_eq!(money(&groups[1]["gstRate"]), 18.0);
    assert_eq!(money(&groups[1]["totalQuantity"]), 2.0);
    assert_eq!(money(&groups[1]["totalAmount"]), 200.0);
    assert_eq!(money(&groups[1]["totalTax"]), 36.0);
    assert_eq!(groups[1]["itemCount"], 1);
}

#[tokio::test]
async fn summary_respects_inclusive_date_range() {
    let app = TestApp::spawn().await;
    seed_two_rates(&app).await;

    let all = app.get("/gst-reports/summary", USER_A).await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(money(&all.body["totalSales"]), 400.0);
    assert_eq!(money(&all.body["totalCGST"]), 18.0);
    assert_eq!(money(&all.body["totalSGST"]), 18.0);
    assert_eq!(money(&all.body["totalIGST"]), 10.0);
    assert_eq!(money(&all.body["totalGST"]), 46.0);
    assert_eq!(money(&all.body["totalAmount"]), 446.0);
    assert_eq!(all.body["invoiceCount"], 2);

    // The end bound equals INV-001's date exactly
    let march = app
        .get(
            "/gst-reports/summary?startDate=2024-03-01&endDate=2024-03-10",
            USER_A,
        )
        .await;
    assert_eq!(march.body["invoiceCount"], 1);
    assert_eq!(money(&march.body["totalSales"]), 200.0);
    assert_eq!(money(&march.body["totalIGST"]), 0.0);

    let empty = app
        .get("/gst-reports/summary?startDate=2025-01-01", USER_A)
        .await;
    assert_eq!(empty.body["invoiceCount"], 0);
    assert_eq!(money(&empty.body["totalAmount"]), 0.0);
}

#[tokio::test]
async fn monthly_always_has_twelve_months() {
    let app = TestApp::spawn().await;
    seed_two_rates(&app).await;

    let response = app.get("/gst-reports/monthly?year=2024", USER_A).await;

    assert_eq!(response.status, StatusCode::OK);
    let months = response.body.as_array().unwrap();
    assert_eq!(months.len(), 12);
    assert_eq!(months[0]["monthName"], "January");
    assert_eq!(months[0]["invoiceCount"], 0);
    assert_eq!(months[2]["month"], 3);
    assert_eq!(months[2]["invoiceCount"], 1);
    assert_eq!(money(&months[2]["totalSales"]), 200.0);
    assert_eq!(money(&months[6]["totalIGST"]), 10.0);
    assert_eq!(months[11]["monthName"], "December");

    let other_year = app.get("/gst-reports/monthly?year=2023", USER_A).await;
    let months = other_year.body.as_array().unwrap();
    assert_eq!(months.len(), 12);
    assert!(months.iter().all(|m| m["invoiceCount"] == 0));

    let invalid = app.get("/gst-reports/monthly?year=abc", USER_A).await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn details_label_missing_clients_unknown() {
    let app = TestApp::spawn().await;
    seed_two_rates(&app).await;

    let response = app.get("/gst-reports/details", USER_A).await;
    assert_eq!(response.status, StatusCode::OK);
    let rows = response.body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["invoiceNumber"], "INV-002");
    assert_eq!(rows[0]["customer"], "Globex Retail");
    assert_eq!(money(&rows[0]["taxableAmount"]), 200.0);
    assert_eq!(money(&rows[0]["igst"]), 10.0);
    assert_eq!(money(&rows[0]["total"]), 210.0);
    assert!(rows[0]["id"].is_string());

    app.store.remove_client(CLIENT_A).await;
    let search = app.get("/gst-reports/details?search=001", USER_A).await;
    let rows = search.body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["customer"], "Unknown");
}

#[tokio::test]
async fn invoice_summary_derives_outstanding() {
    let app = TestApp::spawn().await;

    let empty = app.get("/invoices/summary", USER_A).await;
    assert_eq!(empty.status, StatusCode::OK);
    assert_eq!(money(&empty.body["totalInvoiced"]), 0.0);
    assert_eq!(money(&empty.body["totalPaid"]), 0.0);
    assert_eq!(money(&empty.body["totalOutstanding"]), 0.0);

    let mut paid = invoice_body("INV-001", CLIENT_A, 1.0, 1000.0, 18.0);
    paid["status"] = json!("PAID");
    app.create_invoice(USER_A, paid).await;
    app.create_invoice(USER_A, invoice_body("INV-002", CLIENT_A, 1.0, 500.0, 12.0))
        .await;

    let summary = app.get("/invoices/summary", USER_A).await;
    assert_eq!(money(&summary.body["totalInvoiced"]), 1740.0);
    assert_eq!(money(&summary.body["totalPaid"]), 1180.0);
    assert_eq!(money(&summary.body["totalOutstanding"]), 560.0);
}
