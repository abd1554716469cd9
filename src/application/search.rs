use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    application::{
        credentials::{Resolution, ResolvedCredential, resolve_credentials},
        state::SharedState,
    },
    domain::{
        error::{DomainError, LookupFailure},
        models::OptionsResponse,
        options::{member_options, project_options},
    },
    upstream::{extract_members, extract_projects},
};

/// The part of an options-load payload the search handlers read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub team_id: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    team: Option<TeamRef>,
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TeamRef {
    id: Option<String>,
}

impl SearchQuery {
    pub fn from_payload(payload: &Value) -> Result<Self, DomainError> {
        let parsed = SearchPayload::deserialize(payload).map_err(|error| {
            DomainError::InvalidRequest(format!("invalid options payload: {error}"))
        })?;

        let Some(team_id) = parsed.team.and_then(|team| team.id) else {
            return Err(DomainError::InvalidRequest("missing team.id".to_owned()));
        };
        let Some(value) = parsed.value else {
            return Err(DomainError::InvalidRequest("missing value".to_owned()));
        };

        Ok(Self { team_id, value })
    }
}

/// A search either produces options or stops on an expected lookup failure.
/// Protocol-level failures travel separately as [`DomainError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Options(OptionsResponse),
    Failure(LookupFailure),
}

pub async fn search_projects(
    state: &SharedState,
    query: &SearchQuery,
) -> Result<SearchOutcome, DomainError> {
    let credential = match resolve(state, query).await? {
        Ok(credential) => credential,
        Err(failure) => return Ok(SearchOutcome::Failure(failure)),
    };

    let payload = state
        .upstream()
        .fetch_projects(&credential.access_token)
        .await?;
    let projects = extract_projects(&payload)?;
    let fetched = projects.len();

    let options = project_options(projects, &query.value);
    debug!(
        team_id = %credential.team.team_id,
        fetched,
        returned = options.len(),
        "project options resolved"
    );

    Ok(SearchOutcome::Options(OptionsResponse { options }))
}

pub async fn search_company_members(
    state: &SharedState,
    query: &SearchQuery,
) -> Result<SearchOutcome, DomainError> {
    let credential = match resolve(state, query).await? {
        Ok(credential) => credential,
        Err(failure) => return Ok(SearchOutcome::Failure(failure)),
    };

    let payload = state
        .upstream()
        .fetch_company_members(&credential.access_token)
        .await?;
    let members = extract_members(&payload)?;
    let fetched = members.len();

    let options = member_options(members, &query.value);
    debug!(
        team_id = %credential.team.team_id,
        fetched,
        returned = options.len(),
        "company member options resolved"
    );

    Ok(SearchOutcome::Options(OptionsResponse { options }))
}

async fn resolve(
    state: &SharedState,
    query: &SearchQuery,
) -> Result<Result<ResolvedCredential, LookupFailure>, DomainError> {
    match resolve_credentials(state, &query.team_id).await? {
        Resolution::Resolved(credential) => Ok(Ok(credential)),
        Resolution::Failure(failure) => {
            info!(team_id = %query.team_id, code = failure.code(), "options lookup failed");
            Ok(Err(failure))
        }
    }
}
