use crate::{
    domain::{error::DomainError, models::TeamRecord},
    storage::{SqliteStore, util},
};

type TeamRow = (String, String, String, i64, i64);

impl SqliteStore {
    pub async fn get_team(&self, team_id: &str) -> Result<Option<TeamRecord>, DomainError> {
        let row = sqlx::query_as::<_, TeamRow>(
            "SELECT team_id, team_name, owner_user_id, created_at_ms, updated_at_ms \
             FROM slack_teams WHERE team_id = ? LIMIT 1",
        )
        .bind(team_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|error| DomainError::Storage(format!("failed to get slack team: {error}")))?;

        Ok(row.map(map_team_row))
    }

    pub async fn upsert_team(&self, team: &TeamRecord) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO slack_teams(team_id, team_name, owner_user_id, created_at_ms, updated_at_ms) \
             VALUES(?, ?, ?, ?, ?) \
             ON CONFLICT(team_id) DO UPDATE SET \
               team_name = excluded.team_name, \
               owner_user_id = excluded.owner_user_id, \
               updated_at_ms = excluded.updated_at_ms",
        )
        .bind(&team.team_id)
        .bind(&team.team_name)
        .bind(&team.owner_user_id)
        .bind(util::to_db_ms(team.created_at_ms))
        .bind(util::to_db_ms(team.updated_at_ms))
        .execute(self.pool())
        .await
        .map_err(|error| DomainError::Storage(format!("failed to upsert slack team: {error}")))?;

        Ok(())
    }

    pub async fn remove_team(&self, team_id: &str) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM slack_teams WHERE team_id = ?")
            .bind(team_id)
            .execute(self.pool())
            .await
            .map_err(|error| {
                DomainError::Storage(format!("failed to remove slack team: {error}"))
            })?;
        Ok(result.rows_affected() > 0)
    }
}

fn map_team_row(row: TeamRow) -> TeamRecord {
    let (team_id, team_name, owner_user_id, created_at_ms, updated_at_ms) = row;
    TeamRecord {
        team_id,
        team_name,
        owner_user_id,
        created_at_ms: util::from_db_ms(created_at_ms),
        updated_at_ms: util::from_db_ms(updated_at_ms),
    }
}
