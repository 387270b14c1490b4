// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
///
/// Rejections carry enough structured context (current balance, next reset
/// time, validation reason) for the caller to render a specific message.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Spin already used today")]
    Cooldown {
        /// Next eligible reset boundary (start of next UTC day, RFC3339)
        next_reset: String,
    },

    #[error("Insufficient balance: have {balance}, need {required}")]
    InsufficientBalance { balance: i64, required: i64 },

    #[error("Transaction contention, retries exhausted")]
    ConcurrencyConflict,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    /// Current balance, on insufficient-balance rejections
    #[serde(skip_serializing_if = "Option::is_none")]
    balance: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    required: Option<i64>,
    /// Next spin reset boundary, on cooldown rejections (UTC RFC3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    next_reset: Option<String>,
    /// Whether the caller can safely retry the same request
    #[serde(skip_serializing_if = "Option::is_none")]
    retryable: Option<bool>,
}

impl ErrorResponse {
    fn new(error: &str, details: Option<String>) -> Self {
        Self {
            error: error.to_string(),
            details,
            balance: None,
            required: None,
            next_reset: None,
            retryable: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("unauthorized", None),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("invalid_token", None),
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("not_found", Some(msg.clone())),
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("validation_error", Some(msg.clone())),
            ),
            AppError::Cooldown { next_reset } => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorResponse {
                    next_reset: Some(next_reset.clone()),
                    ..ErrorResponse::new("spin_cooldown", None)
                },
            ),
            AppError::InsufficientBalance { balance, required } => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    balance: Some(*balance),
                    required: Some(*required),
                    ..ErrorResponse::new("insufficient_balance", None)
                },
            ),
            AppError::ConcurrencyConflict => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse {
                    // Idempotency keys make the end-to-end retry safe
                    retryable: Some(true),
                    ..ErrorResponse::new("concurrency_conflict", None)
                },
            ),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("database_error", None),
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("internal_error", None),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl AppError {
    /// True for transient failures that are safe to resend with the same
    /// idempotency key.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::ConcurrencyConflict | AppError::Database(_))
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
