//! Error handling for the Agro Marketplace settlement core
//!
//! Maps domain and infrastructure failures onto consistent JSON error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::DomainError;
use thiserror::Error;

/// Postgres SQLSTATE for `lock_not_available` (raised by `lock_timeout`)
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business rule errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Lock contention: {0}")]
    LockContention(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(LOCK_NOT_AVAILABLE) {
                return AppError::LockContention(db_err.message().to_string());
            }
        }
        AppError::DatabaseError(err)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::ValidationError(errors.to_string())
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
        }
    }

    fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl AppError {
    /// HTTP status and body for this error
    pub fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("UNAUTHORIZED", msg.clone()),
            ),
            AppError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                ErrorDetail::new("FORBIDDEN", msg.clone()),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", message.clone()).with_field(field.clone()),
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", msg.clone()),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::Domain(err) => domain_status_and_detail(err),
            AppError::LockContention(msg) => (
                StatusCode::CONFLICT,
                ErrorDetail::new(
                    "LOCK_CONTENTION",
                    format!("Resource is busy, retry the request: {}", msg),
                ),
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("CONFIGURATION_ERROR", format!("Configuration error: {}", msg)),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred"),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", msg.clone()),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred"),
            ),
        }
    }
}

fn domain_status_and_detail(err: &DomainError) -> (StatusCode, ErrorDetail) {
    let message = err.to_string();
    match err {
        DomainError::InsufficientStock { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorDetail::new("INSUFFICIENT_STOCK", message),
        ),
        DomainError::InsufficientFunds { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorDetail::new("INSUFFICIENT_FUNDS", message),
        ),
        DomainError::NoCommissionConfigured => (
            StatusCode::CONFLICT,
            ErrorDetail::new("NO_COMMISSION_CONFIGURED", message),
        ),
        DomainError::NonPositiveAmount { field } => (
            StatusCode::BAD_REQUEST,
            ErrorDetail::new("VALIDATION_ERROR", message).with_field(*field),
        ),
        DomainError::ExcessPrecision { field } => (
            StatusCode::BAD_REQUEST,
            ErrorDetail::new("VALIDATION_ERROR", message).with_field(*field),
        ),
        DomainError::NegativeShare { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorDetail::new("NEGATIVE_SHARE", message),
        ),
        DomainError::ResaleBelowCost { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorDetail::new("RESALE_BELOW_COST", message).with_field("resale_price"),
        ),
        DomainError::StockUnavailable(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorDetail::new("STOCK_UNAVAILABLE", message),
        ),
        DomainError::InvalidTransition { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorDetail::new("INVALID_STATE_TRANSITION", message),
        ),
        DomainError::InvalidRate(_) => (
            StatusCode::BAD_REQUEST,
            ErrorDetail::new("VALIDATION_ERROR", message).with_field("rate_percent"),
        ),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
