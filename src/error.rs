//! Error handling for the application

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::models::invoice::InvoiceError;
use crate::planner::dispatch::ITINERARY_UPDATE_FAILED;
use crate::planner::PlannerError;
use crate::quotation::responses::ErrorResponse;
use crate::quotation::QuotationError;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Quotation(#[from] QuotationError),

    #[error(transparent)]
    Invoice(#[from] InvoiceError),

    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::Quotation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "quotation_error"),
            AppError::Invoice(InvoiceError::InvalidTransition { .. }) => {
                (StatusCode::CONFLICT, "invalid_transition")
            }
            AppError::Invoice(InvoiceError::UnknownStatus(_)) => {
                (StatusCode::BAD_REQUEST, "bad_request")
            }
            AppError::Planner(_) => (StatusCode::INTERNAL_SERVER_ERROR, "planner_error"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();

        // Server-side failures are logged in full and sanitized for the client
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Database error".to_string()
            }
            AppError::Planner(e) => {
                tracing::error!("Planner error: {}", e);
                ITINERARY_UPDATE_FAILED.to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal error".to_string()
            }
            other => other.to_string(),
        };

        let details = match &self {
            AppError::Invoice(InvoiceError::InvalidTransition { from, to }) => {
                Some(serde_json::json!({ "from": from, "to": to }))
            }
            AppError::Quotation(QuotationError::MissingExchangeRate { from, to }) => {
                Some(serde_json::json!({ "from": from, "to": to }))
            }
            _ => None,
        };

        let body = ErrorResponse {
            error_type: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
