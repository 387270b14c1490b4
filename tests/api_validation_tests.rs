// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API input validation tests.
//!
//! All of these reject before any database access, so they run against
//! the offline mock.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;

fn json_post(uri: &str, token: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-service-token", token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_award_rejects_zero_subtotal() {
    let (app, state) = common::create_test_app();

    let body = r#"{"user_id": "u1", "order_id": "order-1", "subtotal_cents": 0}"#;
    let response = app
        .oneshot(json_post(
            "/internal/loyalty/award-order",
            &state.config.service_token,
            body,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_award_rejects_empty_order_id() {
    let (app, state) = common::create_test_app();

    let body = r#"{"user_id": "u1", "order_id": "", "subtotal_cents": 2500}"#;
    let response = app
        .oneshot(json_post(
            "/internal/loyalty/award-order",
            &state.config.service_token,
            body,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_award_rejects_oversized_order_id() {
    let (app, state) = common::create_test_app();

    let long_id = "x".repeat(129);
    let body = format!(
        r#"{{"user_id": "u1", "order_id": "{}", "subtotal_cents": 2500}}"#,
        long_id
    );
    let response = app
        .oneshot(json_post(
            "/internal/loyalty/award-order",
            &state.config.service_token,
            &body,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_adjust_rejects_zero_delta() {
    let (app, state) = common::create_test_app();

    let body = r#"{"user_id": "u1", "delta": 0, "reason": "no-op",
                   "idempotency_key": "adj-1"}"#;
    let response = app
        .oneshot(json_post(
            "/internal/loyalty/adjust",
            &state.config.service_token,
            body,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_adjust_rejects_empty_reason() {
    let (app, state) = common::create_test_app();

    let body = r#"{"user_id": "u1", "delta": 50, "reason": "",
                   "idempotency_key": "adj-2"}"#;
    let response = app
        .oneshot(json_post(
            "/internal/loyalty/adjust",
            &state.config.service_token,
            body,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_history_rejects_invalid_cursor() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("user-123", &state.config.jwt_signing_key);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/loyalty/history?cursor=not%20a%20cursor")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_redeem_rejects_empty_idempotency_key() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("user-123", &state.config.jwt_signing_key);

    let body = r#"{"reward_id": "free-drink", "idempotency_key": ""}"#;
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/loyalty/redeem")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_payout_rejects_zero_window() {
    let (app, state) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/internal/loyalty/payout?window_days=0")
                .header("x-service-token", state.config.service_token.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_payout_rejects_oversized_window() {
    let (app, state) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/internal/loyalty/payout?window_days=9999")
                .header("x-service-token", state.config.service_token.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
