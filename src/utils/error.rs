use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Venue is not available: {0}")]
    VenueUnavailable(String),

    #[error("Expected attendees ({requested}) exceed venue capacity ({capacity})")]
    CapacityExceeded { requested: i32, capacity: i32 },

    #[error("Budget ({budget}) is less than the venue cost ({required})")]
    InsufficientBudget { budget: Decimal, required: Decimal },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal failure")]
    InternalFailure(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_)
            | AppError::InvalidToken
            | AppError::TokenExpired
            | AppError::AuthenticationFailed => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::ValidationError(_)
            | AppError::MissingFields(_)
            | AppError::VenueUnavailable(_)
            | AppError::CapacityExceeded { .. }
            | AppError::InsufficientBudget { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::InvalidTransition(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(_) | AppError::InternalFailure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::AuthenticationFailed => "AUTHENTICATION_FAILED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::ValidationError(_) | AppError::MissingFields(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::VenueUnavailable(_) => "VENUE_UNAVAILABLE",
            AppError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            AppError::InsufficientBudget { .. } => "INSUFFICIENT_BUDGET",
            AppError::Conflict(_) => "CONFLICT",
            AppError::InvalidTransition(_) => "INVALID_TRANSITION",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalFailure(_) => "INTERNAL_FAILURE",
        }
    }

    /// Machine-readable payload for errors that name offending values.
    pub fn details(&self) -> Option<Value> {
        match self {
            AppError::MissingFields(fields) => Some(json!({ "missingFields": fields })),
            AppError::CapacityExceeded {
                requested,
                capacity,
            } => Some(json!({
                "expectedAttendees": requested.to_string(),
                "capacity": capacity.to_string(),
            })),
            AppError::InsufficientBudget { budget, required } => Some(json!({
                "budget": budget.to_string(),
                "required": required.to_string(),
            })),
            _ => None,
        }
    }

    fn log(&self) {
        match self {
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
            AppError::InternalFailure(msg) => {
                error!(message = %msg, "Internal failure");
            }
            other => {
                warn!(code = other.code(), message = %other, "Request rejected");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::DatabaseError(_) | AppError::InternalFailure(_) => {
                "An internal error occurred".to_string()
            }
            AppError::Unauthenticated(msg)
            | AppError::Forbidden(msg)
            | AppError::ValidationError(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::InvalidTransition(msg) => msg.clone(),
            other => other.to_string(),
        };

        error_response(status, code, public_message, self.details())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::ValidationError(err.body_text())
    }
}
