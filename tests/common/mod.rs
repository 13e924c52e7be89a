//! Shared test utilities for integration tests.
//!
//! `TestClient` drives the full router against an in-memory database.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use smartfin::config::{Config, TrendModelKind};
use smartfin::db::{create_in_memory_pool, migrations};
use smartfin::server;
use smartfin::state::AppState;
use std::path::{Path, PathBuf};
use tower::ServiceExt;

pub struct TestClient {
    state: AppState,
}

impl TestClient {
    /// A fresh in-memory database with the placeholder trend model.
    pub fn new() -> Self {
        Self::with_trend_model(TrendModelKind::Placeholder)
    }

    pub fn with_trend_model(trend_model: TrendModelKind) -> Self {
        let pool = create_in_memory_pool().expect("Failed to create in-memory pool");
        {
            let conn = pool.get().expect("Failed to get connection");
            migrations::run_migrations(&conn, Path::new("migrations"))
                .expect("Failed to run migrations");
        }

        let config = Config {
            host: "127.0.0.1".into(),
            port: 7070,
            database_path: PathBuf::from(":memory:"),
            migrations_path: PathBuf::from("migrations"),
            trend_model,
        };

        Self {
            state: AppState::new(pool, config),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        server::router(self.state.clone())
    }

    /// Run raw SQL against the test database, for rows the API would reject.
    pub fn execute(&self, sql: &str, params: impl rusqlite::Params) {
        let conn = self.state.db.get().expect("Failed to get connection");
        conn.execute(sql, params).expect("Failed to execute SQL");
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8_lossy(&body).to_string())
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, String) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    /// Get JSON from an endpoint and parse it.
    pub async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let (status, body) = self.get(uri).await;
        (status, serde_json::from_str(&body).unwrap_or(Value::Null))
    }

    pub async fn send_json(&self, method: &str, uri: &str, body: &Value) -> (StatusCode, Value) {
        let (status, body) = self
            .send(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await;
        (status, serde_json::from_str(&body).unwrap_or(Value::Null))
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        self.send_json("POST", uri, body).await
    }

    pub async fn put_json(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        self.send_json("PUT", uri, body).await
    }

    pub async fn post_empty(&self, uri: &str) -> (StatusCode, Value) {
        let (status, body) = self
            .send(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        (status, serde_json::from_str(&body).unwrap_or(Value::Null))
    }

    pub async fn delete(&self, uri: &str) -> StatusCode {
        self.send(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .0
    }

    // =========================================================================
    // Helpers for creating entities through the API
    // =========================================================================

    /// Create a transaction and return its id.
    pub async fn create_transaction(&self, amount: &str, category: &str, date: &str) -> i64 {
        let (status, body) = self
            .post_json(
                "/transactions",
                &serde_json::json!({
                    "amount": amount,
                    "category": category,
                    "date": date,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create transaction: {}", body);
        body["id"].as_i64().unwrap()
    }

    pub async fn create_budget(&self, name: &str, limit: &str, month: &str) -> i64 {
        let (status, body) = self
            .post_json(
                "/budgets",
                &serde_json::json!({
                    "name": name,
                    "budget_limit": limit,
                    "month": month,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create budget: {}", body);
        body["id"].as_i64().unwrap()
    }

    pub async fn create_goal(&self, name: &str, target: &str, current: &str, monthly: &str) -> i64 {
        let (status, body) = self
            .post_json(
                "/goals",
                &serde_json::json!({
                    "name": name,
                    "target_amount": target,
                    "current_savings": current,
                    "monthly_contribution": monthly,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create goal: {}", body);
        body["id"].as_i64().unwrap()
    }
}
