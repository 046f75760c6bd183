//! HTTP surface, driven through `oneshot`

mod common;

use axum::Router;
use axum::body::Body;
use common::{Fixture, merchant_a};
use http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use market_server::api::create_router;
use market_server::{Config, ServerState};
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    app: Router,
    token: String,
}

fn test_app() -> TestApp {
    let fx = Fixture::new();
    let state = ServerState::with_store(Config::for_tests(), fx.store.clone()).unwrap();
    let token = state.jwt.generate_token(&merchant_a()).unwrap();
    TestApp {
        app: create_router(state),
        token,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::get(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    async fn json(&self, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app();
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let app = test_app();
    let request = Request::get("/api/resources/products")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 1001);

    let request = Request::get("/api/resources/products")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 1004);
}

#[tokio::test]
async fn list_returns_scoped_page() {
    let app = test_app();
    let (status, body) = app.get("/api/resources/products?page=1&pageSize=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["pageSize"], 10);
    let ids: Vec<i64> = body["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|item| item["id"].as_i64())
        .collect();
    assert_eq!(ids, vec![5, 9]);

    let (status, body) = app.get("/api/resources/orders?status=pending").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"][0]["reference"], "ORD-101");
}

#[tokio::test]
async fn invalid_list_input_is_a_bad_request() {
    let app = test_app();

    let (status, body) = app.get("/api/resources/products?pageSize=500").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 2);

    let (status, _) = app.get("/api/resources/products?page=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/resources/customers?minAmount=5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.get("/api/resources/users").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 3);
}

#[tokio::test]
async fn bulk_reports_partial_failure() {
    let app = test_app();
    let (status, body) = app
        .json(
            "POST",
            "/api/resources/products/bulk/publish",
            json!({"ids": [5, 9, 7]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "3 processed: 2 succeeded, 1 failed");
    assert_eq!(body["data"]["success"], json!([5, 9]));
    assert_eq!(
        body["data"]["failed"],
        json!([{"id": 7, "error": "Permission denied"}])
    );

    let (status, body) = app
        .json("POST", "/api/resources/products/bulk/publish", json!({"ids": []}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 2);
}

#[tokio::test]
async fn single_mutations_reject_hard() {
    let app = test_app();

    let (status, body) = app
        .json("PUT", "/api/orders/102/status", json!({"status": "delivered"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 2001);

    let (status, body) = app
        .json("PUT", "/api/orders/100/status", json!({"status": "processing"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["entity"]["status"], "processing");

    let request = Request::delete("/api/resources/products/7")
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token))
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn stats_endpoints() {
    let app = test_app();

    let (status, body) = app.get("/api/stats?resources=orders,products").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["order"]["total"], 2);
    assert_eq!(body["data"]["product"]["published"], 1);

    let (status, body) = app.get("/api/stats/dashboard").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_object().map(|m| m.len()), Some(6));

    let (status, body) = app.get("/api/stats/merchants").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["merchantId"], 42);
    assert_eq!(body["data"][0]["revenue"], 80.0);

    let (status, _) = app.get("/api/stats").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
