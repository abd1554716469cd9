//! Resolves the upstream access token that acts on behalf of a Slack team.
//!
//! The chain is team record, then owning user, then that user's stored
//! upstream token. An expired token is refreshed once and written back;
//! concurrent requests for the same user wait on the first refresh.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::{
    application::state::SharedState,
    domain::{
        error::{DomainError, LookupFailure},
        models::{TeamRecord, UpstreamToken, UserRecord},
    },
    upstream::TokenGrant,
};

#[derive(Debug, Clone)]
pub struct ResolvedCredential {
    pub team: TeamRecord,
    pub access_token: String,
}

#[derive(Debug, Clone)]
pub enum Resolution {
    Resolved(ResolvedCredential),
    Failure(LookupFailure),
}

pub async fn resolve_credentials(
    state: &SharedState,
    team_id: &str,
) -> Result<Resolution, DomainError> {
    let Some(team) = state.store().get_team(team_id).await? else {
        return Ok(Resolution::Failure(LookupFailure::TeamNotFound));
    };

    let Some(user) = state.store().get_user(&team.owner_user_id).await? else {
        return Ok(Resolution::Failure(LookupFailure::UserNotFound));
    };

    let Some(access_token) = access_token_with_refresh(state, &user).await? else {
        return Ok(Resolution::Failure(LookupFailure::NoUpstreamToken));
    };

    Ok(Resolution::Resolved(ResolvedCredential {
        team,
        access_token,
    }))
}

async fn access_token_with_refresh(
    state: &SharedState,
    user: &UserRecord,
) -> Result<Option<String>, DomainError> {
    let Some(token) = state.store().get_upstream_token(&user.id).await? else {
        return Ok(None);
    };

    if !token.is_expired_at(now_ms()) {
        return Ok(Some(token.access_token));
    }

    let lock = state.refresh_lock(&user.id).await;
    let _guard = lock.lock().await;

    // Another request may have refreshed while this one waited.
    let Some(token) = state.store().get_upstream_token(&user.id).await? else {
        return Ok(None);
    };
    let now_ms = now_ms();
    if !token.is_expired_at(now_ms) {
        return Ok(Some(token.access_token));
    }

    let Some(refresh_token) = token.refresh_token.as_deref() else {
        info!(user_id = %user.id, "upstream token expired and cannot be refreshed");
        return Ok(None);
    };

    let grant = match state.upstream().refresh_token(refresh_token).await {
        Ok(grant) => grant,
        Err(error) => {
            warn!(user_id = %user.id, "upstream token refresh failed: {error}");
            return Ok(None);
        }
    };

    let refreshed = apply_grant(&token, grant, now_ms);
    if let Some(expires_at) = refreshed
        .expires_at_ms
        .and_then(|ms| DateTime::<Utc>::from_timestamp_millis(i64::try_from(ms).ok()?))
    {
        info!(user_id = %user.id, expires_at = %expires_at.to_rfc3339(), "refreshed upstream token");
    } else {
        info!(user_id = %user.id, "refreshed upstream token without expiry");
    }

    state.store().save_upstream_token(&refreshed).await?;
    Ok(Some(refreshed.access_token))
}

/// Builds the stored token after a refresh. The previous refresh token is
/// kept when the grant does not rotate it.
fn apply_grant(previous: &UpstreamToken, grant: TokenGrant, now_ms: u64) -> UpstreamToken {
    UpstreamToken {
        user_id: previous.user_id.clone(),
        access_token: grant.access_token,
        refresh_token: grant.refresh_token.or_else(|| previous.refresh_token.clone()),
        expires_at_ms: grant
            .expires_in
            .map(|seconds| now_ms.saturating_add(seconds.saturating_mul(1_000))),
        scope: grant.scope.or_else(|| previous.scope.clone()),
        updated_at_ms: now_ms,
    }
}

fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}
