use crate::{
    domain::{error::DomainError, models::UserRecord},
    storage::SqliteStore,
};

impl SqliteStore {
    pub async fn get_user(&self, id: &str) -> Result<Option<UserRecord>, DomainError> {
        let row = sqlx::query_as::<_, (String, String, String)>(
            "SELECT id, email, username FROM users WHERE id = ? LIMIT 1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(|error| DomainError::Storage(format!("failed to get user: {error}")))?;

        Ok(row.map(|(id, email, username)| UserRecord {
            id,
            email,
            username,
        }))
    }

    pub async fn upsert_user(&self, user: &UserRecord) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO users(id, email, username) VALUES(?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET email = excluded.email, username = excluded.username",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.username)
        .execute(self.pool())
        .await
        .map_err(|error| DomainError::Storage(format!("failed to upsert user: {error}")))?;

        Ok(())
    }
}
