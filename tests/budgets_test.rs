//! Integration tests for budgets and spending reconciliation.

mod common;

use axum::http::StatusCode;
use common::TestClient;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn decimal(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_create_and_list_by_month() {
    let client = TestClient::new();
    client.create_budget("Food", "400", "2024-03").await;
    client.create_budget("Fuel", "120", "2024-03").await;
    client.create_budget("Food", "450", "2024-04").await;

    let (status, body) = client.get_json("/budgets?month=2024-03").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Food", "Fuel"]);
    assert_eq!(decimal(&body[0]["spent"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_duplicate_budget_in_month_rejected() {
    let client = TestClient::new();
    client.create_budget("Food", "400", "2024-03").await;

    let (status, body) = client
        .post_json(
            "/budgets",
            &json!({"name": "Food", "budget_limit": "300", "month": "2024-03"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("already exists"));
}

#[tokio::test]
async fn test_invalid_budget_rejected() {
    let client = TestClient::new();

    let (status, _) = client
        .post_json(
            "/budgets",
            &json!({"name": "Food", "budget_limit": "-1", "month": "2024-03"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = client
        .post_json(
            "/budgets",
            &json!({"name": "Food", "budget_limit": "10", "month": "March"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_and_delete() {
    let client = TestClient::new();
    let id = client.create_budget("Travel", "1000", "2024-06").await;

    let (status, body) = client
        .put_json(&format!("/budgets/{}", id), &json!({"budget_limit": "1500"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["budget_limit"]), dec!(1500));

    assert_eq!(
        client.delete(&format!("/budgets/{}", id)).await,
        StatusCode::NO_CONTENT
    );
    let (status, _) = client.get_json(&format!("/budgets/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = client
        .put_json("/budgets/999", &json!({"spent": "1"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reconcile_updates_spent_once() {
    let client = TestClient::new();
    let food = client.create_budget("Food", "100", "2024-03").await;
    client.create_budget("Rent", "900", "2024-03").await;

    client.create_transaction("40", "Food", "2024-03-02").await;
    client.create_transaction("2.5", "Food", "2024-03-31T21:00:00").await;
    client.create_transaction("100", "Food", "2024-04-01").await;

    let (status, body) = client.post_empty("/budgets/reconcile?month=2024-03").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checked"], 2);
    let updates = body["updates"].as_array().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["budget_id"], food);
    assert_eq!(decimal(&updates[0]["new_spent"]), dec!(42.5));

    let (_, budget) = client.get_json(&format!("/budgets/{}", food)).await;
    assert_eq!(decimal(&budget["spent"]), dec!(42.5));

    let (status, body) = client.post_empty("/budgets/reconcile?month=2024-03").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["updates"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_reconcile_uses_parsed_timestamp_month() {
    let client = TestClient::new();
    let stored = "2024-04-01T02:00:00+05:00";
    client.execute(
        "INSERT INTO transactions (amount, category, date) VALUES ('7', 'Food', ?1)",
        [stored],
    );
    let month = smartfin::date_utils::parse_timestamp(stored)
        .unwrap()
        .format("%Y-%m")
        .to_string();
    let other_month = if month == "2024-04" { "2024-03" } else { "2024-04" };

    let counted = client.create_budget("Food", "100", &month).await;
    client.create_budget("Food", "100", other_month).await;

    let (_, body) = client
        .post_empty(&format!("/budgets/reconcile?month={}", month))
        .await;
    assert_eq!(body["updates"][0]["budget_id"], counted);
    assert_eq!(decimal(&body["updates"][0]["new_spent"]), dec!(7));

    let (_, body) = client
        .post_empty(&format!("/budgets/reconcile?month={}", other_month))
        .await;
    assert!(body["updates"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_budget_limit_rejected() {
    let client = TestClient::new();
    let (status, _) = client
        .post_json(
            "/budgets",
            &json!({"name": "Food", "budget_limit": "1000000000000.01", "month": "2024-03"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
