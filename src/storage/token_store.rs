use crate::{
    domain::{error::DomainError, models::UpstreamToken},
    storage::{SqliteStore, util},
};

type TokenRow = (String, String, Option<String>, Option<i64>, Option<String>, i64);

impl SqliteStore {
    pub async fn get_upstream_token(
        &self,
        user_id: &str,
    ) -> Result<Option<UpstreamToken>, DomainError> {
        let row = sqlx::query_as::<_, TokenRow>(
            "SELECT user_id, access_token, refresh_token, expires_at_ms, scope, updated_at_ms \
             FROM upstream_tokens WHERE user_id = ? LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|error| DomainError::Storage(format!("failed to get upstream token: {error}")))?;

        Ok(row.map(map_token_row))
    }

    pub async fn save_upstream_token(&self, token: &UpstreamToken) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO upstream_tokens(user_id, access_token, refresh_token, expires_at_ms, scope, updated_at_ms) \
             VALUES(?, ?, ?, ?, ?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET \
               access_token = excluded.access_token, \
               refresh_token = excluded.refresh_token, \
               expires_at_ms = excluded.expires_at_ms, \
               scope = excluded.scope, \
               updated_at_ms = excluded.updated_at_ms",
        )
        .bind(&token.user_id)
        .bind(&token.access_token)
        .bind(token.refresh_token.as_deref())
        .bind(token.expires_at_ms.map(util::to_db_ms))
        .bind(token.scope.as_deref())
        .bind(util::to_db_ms(token.updated_at_ms))
        .execute(self.pool())
        .await
        .map_err(|error| {
            DomainError::Storage(format!("failed to save upstream token: {error}"))
        })?;

        Ok(())
    }
}

fn map_token_row(row: TokenRow) -> UpstreamToken {
    let (user_id, access_token, refresh_token, expires_at_ms, scope, updated_at_ms) = row;
    UpstreamToken {
        user_id,
        access_token,
        refresh_token,
        expires_at_ms: expires_at_ms.map(util::from_db_ms),
        scope,
        updated_at_ms: util::from_db_ms(updated_at_ms),
    }
}
