//! Integration tests for the report summary, trend and CSV download endpoints.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::TestClient;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use tower::ServiceExt;

fn decimal(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

fn labels(buckets: &Value) -> Vec<&str> {
    buckets
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["label"].as_str().unwrap())
        .collect()
}

async fn seed(client: &TestClient) {
    client.create_transaction("100", "Rent", "2024-03-15T10:00:00").await;
    client.create_transaction("30.25", "Food", "2024-01-10").await;
    client.create_transaction("20", "Food", "2024-02-20").await;
    client.create_transaction("3000", "Salary", "2024-03-01").await;
    client.create_transaction("12", "Food", "2024-03-31T19:45:00").await;
    client.create_transaction("8", "Fuel", "2023-12-20").await;
}

#[tokio::test]
async fn test_summary_buckets() {
    let client = TestClient::new();
    seed(&client).await;
    client.execute(
        "INSERT INTO transactions (amount, category, date) VALUES ('5', 'Food', 'last tuesday')",
        [],
    );

    let (status, body) = client
        .get_json("/api/reports/summary?from=2024-01-01&to=2024-03-31")
        .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(body["reference_date"], "2024-03-31");
    assert_eq!(body["skipped_records"], 1);
    assert_eq!(labels(&body["monthly"]), vec!["Jan 2024", "Feb 2024", "Mar 2024"]);
    assert_eq!(labels(&body["yearly"]), vec!["2023", "2024"]);
    assert_eq!(labels(&body["today_by_time"]), vec!["19:45"]);

    assert_eq!(decimal(&body["range"]["total"]), dec!(3162.25));
    assert_eq!(decimal(&body["range"]["income"]), dec!(3000));
    assert_eq!(decimal(&body["current_month"]["expenses"]), dec!(112));
    assert_eq!(decimal(&body["today"]["total"]), dec!(12));

    let categories: Vec<&str> = body["categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["category"].as_str().unwrap())
        .collect();
    assert_eq!(categories, vec!["Salary", "Rent", "Food"]);

    let months: Vec<&str> = body["previous_months_by_category"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["month"].as_str().unwrap())
        .collect();
    assert_eq!(months, vec!["Dec 2023", "Jan 2024", "Feb 2024"]);
}

#[tokio::test]
async fn test_summary_reference_override_and_inverted_range() {
    let client = TestClient::new();
    seed(&client).await;

    let (status, body) = client
        .get_json("/api/reports/summary?from=2024-03-31&to=2024-01-01&reference=2024-03-15")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["monthly"].as_array().unwrap().is_empty());
    assert!(body["categories"].as_array().unwrap().is_empty());
    assert_eq!(decimal(&body["today"]["total"]), dec!(100));
    assert_eq!(decimal(&body["range"]["total"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_summary_rejects_bad_parameters() {
    let client = TestClient::new();

    let (status, _) = client.get_json("/api/reports/summary?from=01-01-2024").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = client.get_json("/api/reports/summary?preset=fortnight").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = client.get_json("/api/reports/summary?preset=all").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["skipped_records"], 0);
}

#[tokio::test]
async fn test_available_months_newest_first() {
    let client = TestClient::new();
    seed(&client).await;
    client.execute(
        "INSERT INTO transactions (amount, category, date) VALUES ('5', 'Food', 'n/a')",
        [],
    );

    let (status, body) = client.get_json("/api/reports/available-months").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        serde_json::json!(["2024-03", "2024-02", "2024-01", "2023-12"])
    );
}

#[tokio::test]
async fn test_savings_trend() {
    let client = TestClient::new();
    seed(&client).await;

    let (status, body) = client.get_json("/api/reports/savings-trend").await;
    assert_eq!(status, StatusCode::OK);
    let march = body
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["month"] == "2024-03")
        .unwrap();
    assert_eq!(decimal(&march["income"]), dec!(3000));
    assert_eq!(decimal(&march["expenses"]), dec!(112));
    assert_eq!(decimal(&march["net_flow"]), dec!(2888));
}

#[tokio::test]
async fn test_download_csv() {
    let client = TestClient::new();
    seed(&client).await;
    client.create_budget("Food", "10", "2024-03").await;

    let response = client
        .router()
        .oneshot(
            Request::builder()
                .uri("/api/reports/download?month=2024-03&include_transactions=true")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("report_Mar_2024.csv"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let csv = String::from_utf8(body.to_vec()).unwrap();
    assert!(csv.starts_with("Month,Mar 2024\n\nTotal Expenses,112.00\n\n"));
    assert!(csv.contains("Food,10.00,12.00,2.00\n"));
    assert!(csv.contains("\nTransactions\n"));
    assert!(csv.ends_with("5,2024-03-31,19:45,Food,12.00\n"));
}

#[tokio::test]
async fn test_download_requires_valid_month() {
    let client = TestClient::new();
    let (status, _) = client.get("/api/reports/download?month=2024-13").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_summary_defaults_reference_to_today() {
    let client = TestClient::new();
    let today = chrono::Local::now().date_naive();
    client
        .create_transaction("25", "Food", &today.format("%Y-%m-%d").to_string())
        .await;

    for uri in [
        "/api/reports/summary",
        "/api/reports/summary?preset=this_month",
        "/api/reports/summary?preset=this_year",
    ] {
        let (status, body) = client.get_json(uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reference_date"], today.to_string().as_str(), "{}", uri);
        assert_eq!(decimal(&body["today"]["total"]), dec!(25), "{}", uri);
        assert_eq!(labels(&body["today_by_time"]), vec!["00:00"], "{}", uri);
    }
}

#[tokio::test]
async fn test_summary_week_of_month_labels() {
    let client = TestClient::new();
    client.create_transaction("10", "Food", "2024-12-30").await;

    let (_, body) = client
        .get_json("/api/reports/summary?from=2024-12-01&to=2024-12-31")
        .await;
    assert_eq!(labels(&body["weekly"]), vec!["Week 6 2024"]);
}

#[tokio::test]
async fn test_download_uses_parsed_timestamp_month() {
    let client = TestClient::new();
    let stored = "2024-04-01T02:00:00+05:00";
    client.execute(
        "INSERT INTO transactions (amount, category, date) VALUES ('7', 'Food', ?1)",
        [stored],
    );
    let local = smartfin::date_utils::parse_timestamp(stored).unwrap();
    let month = local.format("%Y-%m").to_string();
    let other_month = if month == "2024-04" { "2024-03" } else { "2024-04" };

    let (status, csv) = client
        .get(&format!("/api/reports/download?month={}", month))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(csv.contains("Total Expenses,7.00\n"), "{}", csv);

    let (_, csv) = client
        .get(&format!("/api/reports/download?month={}", other_month))
        .await;
    assert!(csv.contains("Total Expenses,0.00\n"), "{}", csv);
}
