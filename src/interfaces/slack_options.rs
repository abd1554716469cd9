//! Entry point for Slack options-load callbacks.
//!
//! Slack posts these either as JSON or as a form body whose `payload` field
//! carries the JSON document. Every payload echoes the app's verification
//! token and names the select that asked for options.

use std::str::FromStr;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{Instrument, field, info_span, warn};
use uuid::Uuid;

use crate::{
    application::{
        search::{SearchOutcome, SearchQuery, search_company_members, search_projects},
        state::SharedState,
    },
    domain::error::DomainError,
    security::verification::verify_token,
};

use super::responses;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const FORM_PAYLOAD_FIELD: &str = "payload";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionsCallback {
    Projects,
    CompanyMembers,
}

impl OptionsCallback {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::CompanyMembers => "company-members",
        }
    }
}

impl FromStr for OptionsCallback {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "projects" => Ok(Self::Projects),
            "company-members" => Ok(Self::CompanyMembers),
            other => Err(DomainError::InvalidRequest(format!(
                "unknown options callback '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallbackEnvelope {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

pub async fn options_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let span = info_span!(
        "options_load",
        request_id = %Uuid::new_v4(),
        callback = field::Empty
    );

    async move {
        match handle_options_load(&state, &headers, &body).await {
            Ok(SearchOutcome::Options(options)) => (StatusCode::OK, Json(options)).into_response(),
            Ok(SearchOutcome::Failure(failure)) => {
                responses::lookup_failure(failure).into_response()
            }
            Err(error) => {
                warn!("options load rejected: {error}");
                responses::domain_error(&error).into_response()
            }
        }
    }
    .instrument(span)
    .await
}

async fn handle_options_load(
    state: &SharedState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<SearchOutcome, DomainError> {
    let payload = parse_payload(headers, body)?;
    let callback = authorize_callback(&payload, &state.config().verification_token)?;
    tracing::Span::current().record("callback", callback.as_str());

    let query = SearchQuery::from_payload(&payload)?;
    match callback {
        OptionsCallback::Projects => search_projects(state, &query).await,
        OptionsCallback::CompanyMembers => search_company_members(state, &query).await,
    }
}

/// Checks the verification token before looking at the callback name, so a
/// forged request learns nothing about which callbacks exist.
pub fn authorize_callback(
    payload: &Value,
    verification_token: &str,
) -> Result<OptionsCallback, DomainError> {
    let envelope = CallbackEnvelope::deserialize(payload).map_err(|error| {
        DomainError::InvalidRequest(format!("invalid options payload: {error}"))
    })?;

    let (Some(token), Some(name)) = (envelope.token, envelope.name) else {
        return Err(DomainError::InvalidRequest(
            "payload requires token and name".to_owned(),
        ));
    };

    verify_token(Some(&token), verification_token)
        .map_err(|failure| DomainError::InvalidRequest(failure.message().to_owned()))?;

    name.parse()
}

pub fn parse_payload(headers: &HeaderMap, body: &[u8]) -> Result<Value, DomainError> {
    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with(FORM_CONTENT_TYPE));

    let payload = if is_form {
        let Some((_, raw)) = url::form_urlencoded::parse(body)
            .find(|(key, _)| key == FORM_PAYLOAD_FIELD)
        else {
            return Err(DomainError::InvalidRequest(
                "form body is missing payload field".to_owned(),
            ));
        };
        serde_json::from_str::<Value>(&raw)
    } else {
        serde_json::from_slice::<Value>(body)
    };

    let payload = payload
        .map_err(|error| DomainError::InvalidRequest(format!("payload is not JSON: {error}")))?;
    if !payload.is_object() {
        return Err(DomainError::InvalidRequest(
            "payload must be a JSON object".to_owned(),
        ));
    }

    Ok(payload)
}
