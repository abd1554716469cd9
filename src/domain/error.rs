use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Expected lookup failures that are reported to Slack as a normal JSON body
/// rather than as an HTTP failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LookupFailure {
    TeamNotFound,
    UserNotFound,
    NoUpstreamToken,
}

impl LookupFailure {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::TeamNotFound => "teamNotFound",
            Self::UserNotFound => "userNotFound",
            Self::NoUpstreamToken => "noUpstreamToken",
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::TeamNotFound => "this Slack workspace is not linked",
            Self::UserNotFound => "the owner of this Slack workspace no longer exists",
            Self::NoUpstreamToken => "the workspace owner has no valid upstream authorization",
        }
    }
}
