use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ddns_core::Error;
use ddns_core::error::UNAUTHORIZED_MESSAGE;

use crate::model::MessageBody;

const NOT_CONFIGURED_MESSAGE: &str = "Provider credentials are not configured.";
const INTERNAL_MESSAGE: &str = "An internal error occurred.";
const UPDATE_TIMEOUT_MESSAGE: &str =
    "The update did not finish in time. It may still be applied; check /status.";

/// Error returned by every handler
///
/// Renders as `{"status": "error", "message": ...}`. Internal detail is
/// logged, never returned.
#[derive(Debug)]
pub(crate) enum ApiError {
    /// Error raised by the core
    Core(Error),
    /// Malformed request (bad JSON, missing fields)
    BadRequest(String),
    /// Missing or wrong admin credentials
    AdminUnauthorized,
    /// The update outlived the request timeout and is still running
    UpdateTimeout,
    /// Failure inside the HTTP layer itself
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::AdminUnauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::UpdateTimeout => {
                tracing::warn!("Update exceeded the request timeout, left running");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    UPDATE_TIMEOUT_MESSAGE.to_string(),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
            }
            ApiError::Core(err) => match err {
                Error::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                Error::Unauthorized => (StatusCode::FORBIDDEN, UNAUTHORIZED_MESSAGE.to_string()),
                Error::NotFound(msg) => (StatusCode::NOT_FOUND, format!("Not found: {}", msg)),
                Error::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
                Error::NotConfigured(detail) => {
                    tracing::warn!("Update refused: {}", detail);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        NOT_CONFIGURED_MESSAGE.to_string(),
                    )
                }
                Error::Decryption(_) => {
                    tracing::warn!("Stored provider credentials could not be decrypted");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        NOT_CONFIGURED_MESSAGE.to_string(),
                    )
                }
                Error::Provider { .. } => {
                    tracing::warn!("{}", err);
                    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
                }
                other => {
                    tracing::error!("Internal error: {}", other);
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(MessageBody::error(message))).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Core(err)
    }
}
