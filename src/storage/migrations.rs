use sqlx::{Executor, SqlitePool};

use crate::domain::error::DomainError;

pub async fn migrate(pool: &SqlitePool) -> Result<(), DomainError> {
    let migration = r#"
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;

    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY NOT NULL,
        email TEXT NOT NULL,
        username TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS slack_teams (
        team_id TEXT PRIMARY KEY NOT NULL,
        team_name TEXT NOT NULL,
        owner_user_id TEXT NOT NULL,
        created_at_ms INTEGER NOT NULL,
        updated_at_ms INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_slack_teams_owner ON slack_teams(owner_user_id);

    CREATE TABLE IF NOT EXISTS upstream_tokens (
        user_id TEXT PRIMARY KEY NOT NULL,
        access_token TEXT NOT NULL,
        refresh_token TEXT,
        expires_at_ms INTEGER,
        scope TEXT,
        updated_at_ms INTEGER NOT NULL
    );
    "#;

    pool.execute(migration)
        .await
        .map_err(|error| DomainError::Storage(format!("migration failed: {error}")))?;

    Ok(())
}
