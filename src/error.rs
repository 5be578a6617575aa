use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::models::job::StatusPair;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error("illegal transition from {from} to {to}")]
    IllegalTransition { from: StatusPair, to: StatusPair },

    #[error("only the assigned agent may do this")]
    NotAssignedAgent,

    #[error("not owner")]
    NotOwner,

    #[error("{0}")]
    Forbidden(String),

    #[error("job was already accepted by another agent")]
    AlreadyAccepted,

    #[error("job is completed, failed or deleted")]
    TerminalJob,

    #[error("secret code does not match")]
    InvalidSecretCode,

    #[error("payment collaborator did not respond in time")]
    PaymentTimeout,

    #[error("external service error: {0}")]
    ExternalService(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::InvalidCoordinate { .. } => "invalid_coordinate",
            AppError::IllegalTransition { .. } => "illegal_transition",
            AppError::NotAssignedAgent => "not_assigned_agent",
            AppError::NotOwner => "not_owner",
            AppError::Forbidden(_) => "forbidden",
            AppError::AlreadyAccepted => "already_accepted",
            AppError::TerminalJob => "terminal_job",
            AppError::InvalidSecretCode => "invalid_secret_code",
            AppError::PaymentTimeout => "payment_timeout",
            AppError::ExternalService(_) => "external_service",
            AppError::NotFound(_) => "not_found",
            AppError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidCoordinate { .. } => StatusCode::BAD_REQUEST,
            AppError::NotAssignedAgent | AppError::NotOwner | AppError::Forbidden(_) => {
                StatusCode::FORBIDDEN
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::IllegalTransition { .. } | AppError::AlreadyAccepted | AppError::TerminalJob => {
                StatusCode::CONFLICT
            }
            AppError::InvalidSecretCode => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::PaymentTimeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AppError::NotFound(what),
            StoreError::Duplicate(what) => AppError::Validation(format!("{what} already exists")),
            other => AppError::ExternalService(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}
