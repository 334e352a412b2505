//! Error taxonomy shared by the store, the session controller and the HTTP layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::domain::Id;

#[derive(Debug, Error)]
pub enum AppError {
    /// A referenced row does not exist.
    #[error("{table} {id} not found")]
    NotFound { table: &'static str, id: String },

    /// Input is malformed or breaks a schema rule.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Input is well-formed but clashes with existing rows.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The session cannot accept this event in its current state.
    #[error("invalid transition: {event} while {state}")]
    InvalidTransition { state: String, event: String },

    /// The content bank could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),
}

impl AppError {
    pub fn not_found(table: &'static str, id: Id) -> Self {
        AppError::NotFound { table, id: id.to_string() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) | AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound { .. } => "not_found",
            AppError::Validation(_) => "validation",
            AppError::Conflict(_) => "conflict",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::Config(_) => "config",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.code(), message: self.to_string() };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_variants_to_http_status() {
        assert_eq!(AppError::not_found("lessons", 4).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        let e = AppError::InvalidTransition { state: "presenting".into(), event: "retry".into() };
        assert_eq!(e.status(), StatusCode::CONFLICT);
        assert_eq!(e.to_string(), "invalid transition: retry while presenting");
    }
}
