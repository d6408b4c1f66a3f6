use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use crate::errors::CostscopeError;

/// An error response: a status code and a `{"error": message}` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }
}

impl CostscopeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CostscopeError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CostscopeError::Config(_) => StatusCode::BAD_REQUEST,
            CostscopeError::RunNotFound(_) => StatusCode::NOT_FOUND,
            CostscopeError::NoDataAvailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CostscopeError::Cancelled(_) => StatusCode::CONFLICT,
            CostscopeError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CostscopeError> for ApiError {
    fn from(e: CostscopeError) -> Self {
        Self::new(e.status_code(), e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(json!({"error": self.message}))).into_response()
    }
}

impl IntoResponse for CostscopeError {
    fn into_response(self) -> axum::response::Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(CostscopeError::InvalidRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(CostscopeError::RunNotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            CostscopeError::StoreUnavailable("x".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(CostscopeError::Internal("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_api_error_from_costscope_error() {
        let err = ApiError::from(CostscopeError::InvalidRequest("no regions".into()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid request: no regions");
    }
}
