use axum::{Json, http::StatusCode};
use serde_json::{Value, json};

use crate::domain::error::{DomainError, LookupFailure};

pub(crate) fn bad_request(message: impl Into<String>) -> (StatusCode, Json<Value>) {
    error_response(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message)
}

pub(crate) fn unavailable(message: impl Into<String>) -> (StatusCode, Json<Value>) {
    error_response(StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", message)
}

/// Lookup failures are delivered with 200 so Slack renders the message
/// instead of a generic transport error.
pub(crate) fn lookup_failure(failure: LookupFailure) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "ok": false,
            "error": {
                "code": failure,
                "message": failure.message(),
            }
        })),
    )
}

pub(crate) fn domain_error(error: &DomainError) -> (StatusCode, Json<Value>) {
    match error {
        DomainError::InvalidRequest(_) | DomainError::Upstream(_) => bad_request(error.to_string()),
        DomainError::Storage(_) | DomainError::Unavailable(_) => unavailable(error.to_string()),
    }
}

fn error_response(
    status: StatusCode,
    code: &str,
    message: impl Into<String>,
) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({
            "ok": false,
            "error": {
                "code": code,
                "message": message.into(),
            }
        })),
    )
}
