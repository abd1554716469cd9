use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRecord {
    pub team_id: String,
    pub team_name: String,
    pub owner_user_id: String,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamToken {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// `None` means the token does not expire.
    pub expires_at_ms: Option<u64>,
    pub scope: Option<String>,
    pub updated_at_ms: u64,
}

impl UpstreamToken {
    /// Tokens are refreshed slightly before their stated expiry so a request
    /// in flight does not race the deadline.
    pub const EXPIRY_SKEW_MS: u64 = 60_000;

    #[must_use]
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        self.expires_at_ms
            .is_some_and(|expires_at| now_ms.saturating_add(Self::EXPIRY_SKEW_MS) >= expires_at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Project {
    pub pk: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Member {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlackOption {
    pub text: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionsResponse {
    pub options: Vec<SlackOption>,
}
