//! SQLite Song Repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::FromRow;

use super::session_repo::parse_timestamp;
use super::DbPool;
use crate::application::ports::{RepositoryError, SongRepositoryPort};
use crate::domain::queue::PositionUpdate;
use crate::domain::session::SessionId;
use crate::domain::song::{
    DelayMinutes, DelayWindow, Song, SongChanges, SongDetails, SongId, SongStatus,
};

/// SQLite Song Repository
pub struct SqliteSongRepository {
    pool: DbPool,
}

impl SqliteSongRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct SongRow {
    id: String,
    session_id: String,
    singer_name: String,
    artist: String,
    title: String,
    position: i64,
    status: String,
    delayed_until: Option<String>,
    delay_minutes: Option<i64>,
    created_at: String,
    updated_at: String,
}

fn serialization(e: impl ToString) -> RepositoryError {
    RepositoryError::SerializationError(e.to_string())
}

impl TryFrom<SongRow> for Song {
    type Error = RepositoryError;

    fn try_from(row: SongRow) -> Result<Self, Self::Error> {
        // 延后字段总是成对写入
        let delay = match (row.delayed_until, row.delay_minutes) {
            (Some(until), Some(minutes)) => Some(DelayWindow {
                until: parse_timestamp(&until)?,
                minutes: DelayMinutes::new(minutes as u32).map_err(serialization)?,
            }),
            _ => None,
        };

        Ok(Song {
            id: SongId::parse(&row.id)
                .ok_or_else(|| serialization(format!("Invalid song id: {}", row.id)))?,
            session_id: SessionId::parse(&row.session_id).map_err(serialization)?,
            details: SongDetails::new(row.singer_name, row.artist, row.title)
                .map_err(serialization)?,
            position: row.position as u32,
            status: row.status.parse::<SongStatus>().map_err(serialization)?,
            delay,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

const SONG_COLUMNS: &str = "id, session_id, singer_name, artist, title, position, status, delayed_until, delay_minutes, created_at, updated_at";

#[async_trait]
impl SongRepositoryPort for SqliteSongRepository {
    async fn create(&self, song: &Song) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO songs (id, session_id, singer_name, artist, title, position, status, delayed_until, delay_minutes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(song.id.to_string())
        .bind(song.session_id.as_str())
        .bind(song.details.singer_name())
        .bind(song.details.artist())
        .bind(song.details.title())
        .bind(song.position as i64)
        .bind(song.status.as_str())
        .bind(song.delay.map(|d| d.until.to_rfc3339()))
        .bind(song.delay.map(|d| d.minutes.minutes() as i64))
        .bind(song.created_at.to_rfc3339())
        .bind(song.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &SongId) -> Result<Option<Song>, RepositoryError> {
        let row: Option<SongRow> =
            sqlx::query_as(&format!("SELECT {} FROM songs WHERE id = ?", SONG_COLUMNS))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(Song::try_from).transpose()
    }

    async fn find_by_session(&self, session_id: &SessionId) -> Result<Vec<Song>, RepositoryError> {
        let rows: Vec<SongRow> = sqlx::query_as(&format!(
            "SELECT {} FROM songs WHERE session_id = ? ORDER BY position ASC, created_at ASC",
            SONG_COLUMNS
        ))
        .bind(session_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(Song::try_from).collect()
    }

    async fn find_by_status(&self, status: SongStatus) -> Result<Vec<Song>, RepositoryError> {
        let rows: Vec<SongRow> = sqlx::query_as(&format!(
            "SELECT {} FROM songs WHERE status = ? ORDER BY created_at ASC",
            SONG_COLUMNS
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(Song::try_from).collect()
    }

    async fn count_by_session(&self, session_id: &SessionId) -> Result<usize, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs WHERE session_id = ?")
            .bind(session_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(count as usize)
    }

    async fn persist_status(
        &self,
        id: &SongId,
        status: SongStatus,
        changes: &SongChanges,
    ) -> Result<(), RepositoryError> {
        let delay = changes.delay.flatten();
        let details = changes.details.as_ref();
        let result = sqlx::query(
            r#"
            UPDATE songs SET
                status = ?,
                delayed_until = CASE WHEN ? THEN ? ELSE delayed_until END,
                delay_minutes = CASE WHEN ? THEN ? ELSE delay_minutes END,
                singer_name = COALESCE(?, singer_name),
                artist = COALESCE(?, artist),
                title = COALESCE(?, title),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(changes.delay.is_some())
        .bind(delay.map(|d| d.until.to_rfc3339()))
        .bind(changes.delay.is_some())
        .bind(delay.map(|d| d.minutes.minutes() as i64))
        .bind(details.map(|d| d.singer_name().to_string()))
        .bind(details.map(|d| d.artist().to_string()))
        .bind(details.map(|d| d.title().to_string()))
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn persist_reorder(
        &self,
        session_id: &SessionId,
        updates: &[PositionUpdate],
    ) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        for update in updates {
            let result = sqlx::query(
                "UPDATE songs SET position = ?, updated_at = ? WHERE id = ? AND session_id = ?",
            )
            .bind(update.position as i64)
            .bind(&now)
            .bind(update.song_id.to_string())
            .bind(session_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

            // 未提交的事务在 drop 时回滚
            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound(update.song_id.to_string()));
            }
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, id: &SongId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM songs WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::SessionRepositoryPort;
    use crate::domain::session::{Session, SongDuration};
    use crate::infrastructure::persistence::sqlite::test_util::memory_pool;
    use crate::infrastructure::persistence::sqlite::SqliteSessionRepository;

    async fn setup() -> (SqliteSongRepository, Session) {
        let pool = memory_pool().await;
        let session = Session::new(SongDuration::default());
        SqliteSessionRepository::new(pool.clone())
            .create(&session)
            .await
            .unwrap();
        (SqliteSongRepository::new(pool), session)
    }

    async fn add(repo: &SqliteSongRepository, session: &Session, singer: &str) -> Song {
        let count = repo.count_by_session(&session.id).await.unwrap();
        let details = SongDetails::new(singer, "Toto", "Africa").unwrap();
        let song = Song::new(session.id.clone(), details, count);
        repo.create(&song).await.unwrap();
        song
    }

    #[tokio::test]
    async fn test_song_roundtrip_in_position_order() {
        let (repo, session) = setup().await;
        let a = add(&repo, &session, "Ana").await;
        let b = add(&repo, &session, "Ben").await;

        let songs = repo.find_by_session(&session.id).await.unwrap();
        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0].id, a.id);
        assert_eq!(songs[1].id, b.id);
        assert_eq!(songs[1].position, 2);
        assert_eq!(songs[1].details.singer_name(), "Ben");
        assert_eq!(repo.count_by_session(&session.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_persist_delay_fields_and_clear() {
        let (repo, session) = setup().await;
        let a = add(&repo, &session, "Ana").await;

        let window = DelayWindow::starting_at(Utc::now(), DelayMinutes::new(5).unwrap());
        let changes = SongChanges::default().with_delay(Some(window));
        repo.persist_status(&a.id, SongStatus::Delayed, &changes)
            .await
            .unwrap();

        let loaded = repo.find_by_id(&a.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, SongStatus::Delayed);
        let delay = loaded.delay.unwrap();
        assert_eq!(delay.minutes.minutes(), 5);
        assert_eq!(delay.until.timestamp(), window.until.timestamp());

        // 不携带延后变化时保持原值
        repo.persist_status(&a.id, SongStatus::Delayed, &SongChanges::default())
            .await
            .unwrap();
        assert!(repo.find_by_id(&a.id).await.unwrap().unwrap().delay.is_some());

        let cleared = SongChanges::default().with_delay(None);
        repo.persist_status(&a.id, SongStatus::Waiting, &cleared)
            .await
            .unwrap();
        let loaded = repo.find_by_id(&a.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, SongStatus::Waiting);
        assert!(loaded.delay.is_none());
    }

    #[tokio::test]
    async fn test_find_by_status() {
        let (repo, session) = setup().await;
        let a = add(&repo, &session, "Ana").await;
        let b = add(&repo, &session, "Ben").await;

        let window = DelayWindow::starting_at(Utc::now(), DelayMinutes::new(2).unwrap());
        let changes = SongChanges::default().with_delay(Some(window));
        repo.persist_status(&b.id, SongStatus::Delayed, &changes)
            .await
            .unwrap();

        let delayed = repo.find_by_status(SongStatus::Delayed).await.unwrap();
        assert_eq!(delayed.len(), 1);
        assert_eq!(delayed[0].id, b.id);
        assert!(delayed[0].delay.is_some());

        let waiting = repo.find_by_status(SongStatus::Waiting).await.unwrap();
        assert_eq!(waiting.len(), 1);
        assert_eq!(waiting[0].id, a.id);
        assert!(repo.find_by_status(SongStatus::Done).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persist_details() {
        let (repo, session) = setup().await;
        let a = add(&repo, &session, "Ana").await;

        let changes = SongChanges {
            details: Some(SongDetails::new("Ana", "Journey", "Don't Stop Believin'").unwrap()),
            ..Default::default()
        };
        repo.persist_status(&a.id, SongStatus::Waiting, &changes)
            .await
            .unwrap();

        let loaded = repo.find_by_id(&a.id).await.unwrap().unwrap();
        assert_eq!(loaded.details.artist(), "Journey");
        assert_eq!(loaded.details.title(), "Don't Stop Believin'");
    }

    #[tokio::test]
    async fn test_reorder_is_all_or_nothing() {
        let (repo, session) = setup().await;
        let a = add(&repo, &session, "Ana").await;
        let b = add(&repo, &session, "Ben").await;
        let c = add(&repo, &session, "Cy").await;

        repo.persist_reorder(
            &session.id,
            &[
                PositionUpdate { song_id: a.id.clone(), position: 3 },
                PositionUpdate { song_id: c.id.clone(), position: 1 },
            ],
        )
        .await
        .unwrap();
        let ids: Vec<SongId> = repo
            .find_by_session(&session.id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![c.id.clone(), b.id.clone(), a.id.clone()]);

        // 包含未知歌曲时整体回滚
        let err = repo
            .persist_reorder(
                &session.id,
                &[
                    PositionUpdate { song_id: b.id.clone(), position: 9 },
                    PositionUpdate { song_id: SongId::new(), position: 1 },
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
        assert_eq!(repo.find_by_id(&b.id).await.unwrap().unwrap().position, 2);
    }

    #[tokio::test]
    async fn test_delete_song() {
        let (repo, session) = setup().await;
        let a = add(&repo, &session, "Ana").await;

        assert!(repo.delete(&a.id).await.unwrap());
        assert!(!repo.delete(&a.id).await.unwrap());
        assert!(repo.find_by_id(&a.id).await.unwrap().is_none());

        let err = repo
            .persist_status(&a.id, SongStatus::Playing, &SongChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }
}
