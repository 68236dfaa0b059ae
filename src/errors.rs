use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::{DbErr, SqlErr};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Branch, ParseValueError};
use crate::services::reading_validation::ReadingViolation;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Forbidden",
    "message": "Readings for 2024-03 (JHB) are locked",
    "details": null,
    "request_id": "5f0c3a8e-2b1d-4d7e-9a61-0c2f4e8b7d13",
    "timestamp": "2024-04-02T07:15:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    #[schema(example = "Forbidden")]
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Structured detail, e.g. every violating row of a rejected readings batch
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("{} submitted reading(s) rejected", .0.len())]
    InvalidReadings(Vec<ReadingViolation>),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Readings for {year}-{month:02} ({branch}) are locked")]
    SubmissionLocked { year: i32, month: i32, branch: Branch },

    #[error("Part belongs to model {part_model_id}, which does not match the model of machine {machine_id}")]
    ModelMismatch {
        machine_id: Uuid,
        machine_model_id: Option<Uuid>,
        part_model_id: Uuid,
    },

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Unique-key violations are the caller's problem (a duplicate serial, say);
/// everything else stays a storage failure.
impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => ServiceError::Conflict(detail),
            _ => ServiceError::DatabaseError(err),
        }
    }
}

impl From<ParseValueError> for ServiceError {
    fn from(err: ParseValueError) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(format!("{} {} not found", entity, id))
    }

    /// HTTP status for this error; handlers never pick statuses themselves.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) | Self::InvalidReadings(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) | Self::SubmissionLocked { .. } => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::ModelMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    /// Client-facing message. Storage and internal failures stay generic.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::InvalidReadings(violations) => Some(json!(violations
                .iter()
                .map(|violation| {
                    let mut entry = json!(violation);
                    entry["message"] = json!(violation.to_string());
                    entry
                })
                .collect::<Vec<_>>())),
            Self::SubmissionLocked { year, month, branch } => Some(json!({
                "year": year,
                "month": month,
                "branch": branch,
            })),
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: self.details(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
