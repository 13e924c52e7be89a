//! Integration tests for recording and listing transactions.

mod common;

use axum::http::StatusCode;
use common::TestClient;
use serde_json::json;

#[tokio::test]
async fn test_health() {
    let client = TestClient::new();
    let (status, body) = client.get_json("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let client = TestClient::new();
    let (status, body) = client.get_json("/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("/nope"));
}

#[tokio::test]
async fn test_create_sets_kind_from_category() {
    let client = TestClient::new();

    let (status, body) = client
        .post_json(
            "/transactions",
            &json!({"amount": "3000", "category": "Salary", "date": "2024-03-01", "description": "March pay"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["kind"], "Income");
    assert_eq!(body["description"], "March pay");

    let (_, body) = client
        .post_json(
            "/transactions",
            &json!({"amount": "45.10", "category": "Food", "date": "2024-03-02T12:30:00"}),
        )
        .await;
    assert_eq!(body["kind"], "Expense");
}

#[tokio::test]
async fn test_duplicate_transaction_rejected() {
    let client = TestClient::new();
    client.create_transaction("12.00", "Food", "2024-03-02").await;

    let (status, body) = client
        .post_json(
            "/transactions",
            &json!({"amount": "12.00", "category": "Food", "date": "2024-03-02"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Duplicate"));

    // Same amount and date in another category is fine.
    client.create_transaction("12.00", "Fuel", "2024-03-02").await;
}

#[tokio::test]
async fn test_invalid_amount_and_date_rejected() {
    let client = TestClient::new();

    let (status, _) = client
        .post_json(
            "/transactions",
            &json!({"amount": "twelve", "category": "Food", "date": "2024-03-02"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = client
        .post_json(
            "/transactions",
            &json!({"amount": "12", "category": "Food", "date": "02/03/2024"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid date"));
}

#[tokio::test]
async fn test_list_filters_by_day_range() {
    let client = TestClient::new();
    client.create_transaction("10", "Food", "2024-01-31T23:30:00").await;
    client.create_transaction("20", "Food", "2024-02-01").await;
    client.create_transaction("30", "Food", "2024-02-29T08:00:00").await;
    client.create_transaction("40", "Food", "2024-03-01").await;

    let (status, body) = client
        .get_json("/transactions?from_date=2024-02-01&to_date=2024-02-29")
        .await;
    assert_eq!(status, StatusCode::OK);
    let amounts: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["amount"].as_str().unwrap())
        .collect();
    assert_eq!(amounts, vec!["20", "30"]);

    let (status, _) = client.get_json("/transactions?from_date=yesterday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_show_and_delete() {
    let client = TestClient::new();
    let id = client.create_transaction("9.99", "Books", "2024-05-05").await;

    let (status, body) = client.get_json(&format!("/transactions/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["category"], "Books");

    assert_eq!(
        client.delete(&format!("/transactions/{}", id)).await,
        StatusCode::NO_CONTENT
    );

    let (status, body) = client.get_json(&format!("/transactions/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
    assert_eq!(
        client.delete(&format!("/transactions/{}", id)).await,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_negative_and_oversized_amounts_rejected() {
    let client = TestClient::new();

    let (status, body) = client
        .post_json(
            "/transactions",
            &json!({"amount": "-50", "category": "Food", "date": "2024-03-02"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("negative"));

    let (status, _) = client
        .post_json(
            "/transactions",
            &json!({"amount": "79228162514264337593543950335", "category": "Food", "date": "2024-03-02"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = client
        .post_json(
            "/transactions",
            &json!({"amount": "1000000000000", "category": "Salary", "date": "2024-03-02"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = client.get_json("/transactions").await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_offset_timestamp_stored_as_local_time() {
    let client = TestClient::new();
    let submitted = "2024-04-01T02:00:00+05:00";
    let local = smartfin::date_utils::parse_timestamp(submitted).unwrap();

    let (status, body) = client
        .post_json(
            "/transactions",
            &json!({"amount": "7", "category": "Food", "date": submitted}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body["date"],
        local.format("%Y-%m-%dT%H:%M:%S").to_string().as_str()
    );

    let day = local.format("%Y-%m-%d").to_string();
    let (_, body) = client
        .get_json(&format!("/transactions?from_date={}&to_date={}", day, day))
        .await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}
