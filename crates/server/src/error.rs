//! API error taxonomy and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::MaintenanceSnapshot;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Missing or invalid session")]
    Unauthorized,

    #[error("Question not found")]
    QuestionNotFound,

    #[error("Reply not found")]
    ReplyNotFound,

    /// Writes rejected while maintenance is active; carries the snapshot so
    /// clients can render the banner.
    #[error("Service is under maintenance")]
    Maintenance(MaintenanceSnapshot),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::QuestionNotFound | ApiError::ReplyNotFound => StatusCode::NOT_FOUND,
            ApiError::Maintenance(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = match &self {
            ApiError::Maintenance(snapshot) => json!({
                "error": { "message": self.to_string() },
                "maintenance": snapshot,
            }),
            _ => json!({
                "error": { "message": self.to_string() }
            }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maintenance_error_maps_to_503() {
        let err = ApiError::Maintenance(MaintenanceSnapshot {
            status: true,
            message: "back soon".into(),
            logo_url: None,
            until: None,
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(
            ApiError::QuestionNotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::ReplyNotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
    }
}
