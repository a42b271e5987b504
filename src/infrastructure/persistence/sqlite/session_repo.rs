//! SQLite Session Repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::DbPool;
use crate::application::ports::{RepositoryError, SessionRepositoryPort};
use crate::domain::session::{
    Session, SessionChanges, SessionId, SessionStatus, SongDuration, TipHandles,
};

/// SQLite Session Repository
pub struct SqliteSessionRepository {
    pool: DbPool,
}

impl SqliteSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct SessionRow {
    id: String,
    status: String,
    song_duration_seconds: i64,
    tip_venmo: Option<String>,
    tip_cashapp: Option<String>,
    tip_paypal: Option<String>,
    created_at: String,
    updated_at: String,
}

pub(super) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

impl TryFrom<SessionRow> for Session {
    type Error = RepositoryError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(Session {
            id: SessionId::parse(&row.id)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?,
            status: row
                .status
                .parse::<SessionStatus>()
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?,
            song_duration: SongDuration::new(row.song_duration_seconds as u32)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?,
            tips: TipHandles {
                venmo: row.tip_venmo,
                cashapp: row.tip_cashapp,
                paypal: row.tip_paypal,
            },
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

const SESSION_COLUMNS: &str =
    "id, status, song_duration_seconds, tip_venmo, tip_cashapp, tip_paypal, created_at, updated_at";

#[async_trait]
impl SessionRepositoryPort for SqliteSessionRepository {
    async fn create(&self, session: &Session) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, status, song_duration_seconds, tip_venmo, tip_cashapp, tip_paypal, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(session.id.as_str())
        .bind(session.status.as_str())
        .bind(session.song_duration.seconds() as i64)
        .bind(session.tips.venmo.as_deref())
        .bind(session.tips.cashapp.as_deref())
        .bind(session.tips.paypal.as_deref())
        .bind(session.created_at.to_rfc3339())
        .bind(session.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Duplicate(session.id.to_string())
            }
            e => RepositoryError::DatabaseError(e.to_string()),
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, RepositoryError> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM sessions WHERE id = ?",
            SESSION_COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(Session::try_from).transpose()
    }

    async fn find_by_status(
        &self,
        status: SessionStatus,
    ) -> Result<Vec<Session>, RepositoryError> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM sessions WHERE status = ? ORDER BY created_at ASC",
            SESSION_COLUMNS
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(Session::try_from).collect()
    }

    async fn persist_status(
        &self,
        id: &SessionId,
        status: SessionStatus,
        changes: &SessionChanges,
    ) -> Result<(), RepositoryError> {
        let tips = changes.tips.as_ref();
        let result = sqlx::query(
            r#"
            UPDATE sessions SET
                status = ?,
                song_duration_seconds = COALESCE(?, song_duration_seconds),
                tip_venmo = CASE WHEN ? THEN ? ELSE tip_venmo END,
                tip_cashapp = CASE WHEN ? THEN ? ELSE tip_cashapp END,
                tip_paypal = CASE WHEN ? THEN ? ELSE tip_paypal END,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(changes.song_duration.map(|d| d.seconds() as i64))
        .bind(tips.is_some())
        .bind(tips.and_then(|t| t.venmo.clone()))
        .bind(tips.is_some())
        .bind(tips.and_then(|t| t.cashapp.clone()))
        .bind(tips.is_some())
        .bind(tips.and_then(|t| t.paypal.clone()))
        .bind(Utc::now().to_rfc3339())
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
