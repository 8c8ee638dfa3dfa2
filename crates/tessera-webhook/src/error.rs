//! Webhook errors and their HTTP rendering

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;

/// Error type for webhook operations
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The admission review request was invalid or malformed
    #[error("invalid admission review: {0}")]
    InvalidReview(String),

    /// The process was started with unusable settings
    #[error("configuration error: {0}")]
    Config(String),

    /// The HTTPS listener failed
    #[error("server error: {0}")]
    Server(String),

    /// Admission could not reach a verdict on the submitted object
    #[error(transparent)]
    Admission(#[from] tessera_common::Error),
}

impl WebhookError {
    fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidReview(_) => StatusCode::BAD_REQUEST,
            WebhookError::Admission(e) if e.is_user_error() => StatusCode::UNPROCESSABLE_ENTITY,
            WebhookError::Config(_) | WebhookError::Server(_) | WebhookError::Admission(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            WebhookError::InvalidReview(_) => "BadRequest",
            WebhookError::Admission(e) if e.is_user_error() => "Invalid",
            WebhookError::Config(_) | WebhookError::Server(_) | WebhookError::Admission(_) => {
                "InternalError"
            }
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        let status = Status {
            code: Some(i32::from(code.as_u16())),
            message: Some(self.to_string()),
            reason: Some(self.reason().to_string()),
            status: Some("Failure".to_string()),
            ..Default::default()
        };
        (code, Json(status)).into_response()
    }
}
