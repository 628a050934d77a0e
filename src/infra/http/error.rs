use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use quaderno_api_types::ErrorResponse;

use crate::application::{analytics::AnalyticsError, error::ErrorReport};

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
const INVALID_BODY_MESSAGE: &str = "Invalid JSON body";

/// JSON error for the analytics API. Callers only ever see a fixed message;
/// the detail travels in the attached [`ErrorReport`].
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
    source: &'static str,
    detail: String,
}

impl ApiError {
    pub fn internal(source: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: INTERNAL_ERROR_MESSAGE,
            source,
            detail: detail.into(),
        }
    }

    pub fn invalid_body(source: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: INVALID_BODY_MESSAGE,
            source,
            detail: detail.into(),
        }
    }

    pub fn from_analytics(source: &'static str, error: AnalyticsError) -> Self {
        Self::internal(source, error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message.to_string(),
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(self.source, self.status, self.detail).attach(&mut response);
        response
    }
}
