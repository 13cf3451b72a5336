//! API error handling.
//!
//! Every failing handler answers with `{ code, message, details? }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use musewave::records::RecordError;
use musewave::MuseError;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// 422, used for both malformed bodies and rejected field values.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorResponse {
            code: self.code,
            message: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<MuseError> for ApiError {
    fn from(err: MuseError) -> Self {
        match err {
            MuseError::Validation(errors) => {
                let details = serde_json::to_value(&errors.errors).unwrap_or_default();
                ApiError::validation(errors.to_string()).with_details(details)
            }
            MuseError::Worker(e) => {
                tracing::warn!("Rejected submission: {}", e);
                ApiError::service_unavailable("Server is shutting down")
            }
            other => {
                tracing::error!("Unexpected error: {}", other);
                ApiError::internal("An unexpected error occurred")
            }
        }
    }
}

impl From<RecordError> for ApiError {
    fn from(err: RecordError) -> Self {
        tracing::error!("Record store error: {}", err);
        ApiError::internal("Record store error occurred")
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use musewave::error::WorkerError;
    use musewave::pipeline::ValidationErrors;

    #[test]
    fn test_validation_error_carries_field_details() {
        let mut errors = ValidationErrors::default();
        errors.push("duration", "must be between 30 and 180 seconds");

        let api_err = ApiError::from(MuseError::Validation(errors));
        assert_eq!(api_err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(api_err.code, "VALIDATION_ERROR");

        let details = api_err.details.unwrap();
        assert_eq!(details[0]["field"], "duration");
        assert!(details[0]["message"].as_str().unwrap().contains("30"));
    }

    #[test]
    fn test_shutdown_maps_to_service_unavailable() {
        let api_err = ApiError::from(MuseError::Worker(WorkerError::ShuttingDown(
            "job".to_string(),
        )));
        assert_eq!(api_err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(api_err.details.is_none());
    }

    #[test]
    fn test_record_error_is_internal() {
        let api_err = ApiError::from(RecordError::LockPoisoned);
        assert_eq!(api_err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api_err.code, "INTERNAL_ERROR");
    }
}
