// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Service-to-service authentication for `/internal/*` routes.
//!
//! The order subsystem, the scheduler, and the admin console authenticate
//! with a shared token injected at deploy time. Comparison is constant
//! time to avoid leaking prefix matches.

use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum::http::StatusCode;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Header carrying the shared service token.
pub const SERVICE_TOKEN_HEADER: &str = "x-service-token";

/// Require a valid service token for internal routes.
pub async fn require_service_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let presented = request
        .headers()
        .get(SERVICE_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    let expected = state.config.service_token.as_bytes();
    let matches: bool = presented.as_bytes().ct_eq(expected).into();

    if !matches {
        tracing::warn!("Blocked internal request with invalid service token");
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(request).await)
}
