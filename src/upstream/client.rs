use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::{
    application::config::{RuntimeConfig, UpstreamClientCredentials},
    domain::error::DomainError,
};

use super::queries;

/// Upper bound on how much of a failed upstream body is read for logging.
const LOGGED_BODY_LIMIT: usize = 1024;

/// Successful response of the refresh-token grant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Serialize)]
struct RefreshForm<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    graphql_url: String,
    token_url: String,
    credentials: Option<UpstreamClientCredentials>,
}

impl UpstreamClient {
    pub fn new(config: &RuntimeConfig) -> Result<Self, DomainError> {
        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()
            .map_err(|error| {
                DomainError::Unavailable(format!("failed to construct http client: {error}"))
            })?;

        Ok(Self {
            http,
            graphql_url: config.upstream_graphql_url.clone(),
            token_url: config.upstream_token_url.clone(),
            credentials: config.upstream_credentials.clone(),
        })
    }

    pub async fn fetch_projects(&self, access_token: &str) -> Result<Value, DomainError> {
        self.graphql(access_token, queries::PROJECTS_INCLUDING_COMPANY)
            .await
    }

    pub async fn fetch_company_members(&self, access_token: &str) -> Result<Value, DomainError> {
        self.graphql(access_token, queries::COMPANY_MEMBERS).await
    }

    /// Exchanges a refresh token for a new access token. Fails without
    /// calling out when no OAuth client is configured.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, DomainError> {
        let Some(credentials) = self.credentials.as_ref() else {
            return Err(DomainError::Upstream(
                "token refresh requires an upstream OAuth client".to_owned(),
            ));
        };

        let form = RefreshForm {
            grant_type: "refresh_token",
            refresh_token,
            client_id: &credentials.client_id,
            client_secret: &credentials.client_secret,
        };

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|error| DomainError::Upstream(format!("token refresh failed: {error}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(DomainError::Upstream(format!(
                "token refresh failed with {status}"
            )));
        }

        response
            .json::<TokenGrant>()
            .await
            .map_err(|error| DomainError::Upstream(format!("token refresh decode failed: {error}")))
    }

    async fn graphql(&self, access_token: &str, query: &str) -> Result<Value, DomainError> {
        debug!(url = %self.graphql_url, "sending upstream graphql query");

        let response = self
            .http
            .post(&self.graphql_url)
            .bearer_auth(access_token)
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(|error| {
                warn!("upstream graphql request failed: {error}");
                DomainError::Upstream("graphql request failed".to_owned())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = body_prefix(response, LOGGED_BODY_LIMIT).await;
            warn!(%status, body = %body, "upstream graphql request failed");
            return Err(DomainError::Upstream(format!(
                "graphql request failed with {status}"
            )));
        }

        let payload = response
            .json::<Value>()
            .await
            .map_err(|error| {
                warn!("upstream graphql response was not json: {error}");
                DomainError::Upstream("graphql decode failed".to_owned())
            })?;

        let has_data = payload.get("data").is_some_and(|data| !data.is_null());
        if !has_data && let Some(errors) = payload.get("errors") {
            let errors = errors.to_string();
            warn!(
                errors = %truncate(&errors, LOGGED_BODY_LIMIT),
                "upstream graphql returned errors"
            );
            return Err(DomainError::Upstream("graphql returned errors".to_owned()));
        }

        Ok(payload)
    }
}

/// Reads at most `limit` bytes of a response body without buffering the rest.
async fn body_prefix(mut response: reqwest::Response, limit: usize) -> String {
    let mut collected = Vec::new();
    while collected.len() < limit {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(limit - collected.len());
                collected.extend_from_slice(&chunk[..take]);
            }
            Ok(None) | Err(_) => break,
        }
    }
    String::from_utf8_lossy(&collected).into_owned()
}

fn truncate(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
