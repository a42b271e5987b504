//! Queue Query Handlers

use std::collections::HashMap;
use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::gateway::parse_session_id;
use crate::application::ports::{SessionRepositoryPort, SongRepositoryPort};
use crate::application::queries::GetQueue;
use crate::domain::queue::{estimate_waits, next_playable};
use crate::domain::song::{Song, SongStatus};

// ============================================================================
// Response DTOs
// ============================================================================

/// 队列中的一首歌
#[derive(Debug, Clone)]
pub struct QueueSongResponse {
    pub song_id: String,
    pub singer_name: String,
    pub artist: String,
    pub title: String,
    pub position: u32,
    pub status: String,
    pub delayed_until: Option<String>,
    pub delay_minutes: Option<u32>,
    /// 仅 waiting 歌曲有值
    pub songs_ahead: Option<u32>,
    pub estimated_wait_secs: Option<u64>,
    pub created_at: String,
}

impl From<&Song> for QueueSongResponse {
    fn from(song: &Song) -> Self {
        Self {
            song_id: song.id.to_string(),
            singer_name: song.details.singer_name().to_string(),
            artist: song.details.artist().to_string(),
            title: song.details.title().to_string(),
            position: song.position,
            status: song.status.to_string(),
            delayed_until: song.delay.map(|d| d.until.to_rfc3339()),
            delay_minutes: song.delay.map(|d| d.minutes.minutes()),
            songs_ahead: None,
            estimated_wait_secs: None,
            created_at: song.created_at.to_rfc3339(),
        }
    }
}

/// 队列响应
#[derive(Debug, Clone)]
pub struct QueueResponse {
    pub session_id: String,
    pub session_status: String,
    pub song_duration_seconds: u32,
    pub now_playing: Option<QueueSongResponse>,
    pub next_song_id: Option<String>,
    pub songs: Vec<QueueSongResponse>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GetQueue Handler - 按位置排序并附带等待估算
pub struct GetQueueHandler {
    song_repo: Arc<dyn SongRepositoryPort>,
    session_repo: Arc<dyn SessionRepositoryPort>,
}

impl GetQueueHandler {
    pub fn new(
        song_repo: Arc<dyn SongRepositoryPort>,
        session_repo: Arc<dyn SessionRepositoryPort>,
    ) -> Self {
        Self {
            song_repo,
            session_repo,
        }
    }

    pub async fn handle(&self, query: GetQueue) -> Result<QueueResponse, ApplicationError> {
        let session_id = parse_session_id(&query.session_id)?;
        let session = self
            .session_repo
            .find_by_id(&session_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Session", &query.session_id))?;

        let songs = self.song_repo.find_by_session(&session_id).await?;
        let mut waits: HashMap<_, _> = estimate_waits(&songs, session.song_duration)
            .into_iter()
            .map(|w| (w.song_id.clone(), w))
            .collect();

        let now_playing = songs
            .iter()
            .find(|s| s.status == SongStatus::Playing)
            .map(QueueSongResponse::from);
        let next_song_id = next_playable(&songs).map(|s| s.id.to_string());

        let songs = songs
            .iter()
            .filter(|s| query.include_finished || !s.status.is_terminal())
            .map(|song| {
                let mut response = QueueSongResponse::from(song);
                if let Some(wait) = waits.remove(&song.id) {
                    response.songs_ahead = Some(wait.songs_ahead);
                    response.estimated_wait_secs = Some(wait.estimated_wait_secs);
                }
                response
            })
            .collect();

        Ok(QueueResponse {
            session_id: session.id.to_string(),
            session_status: session.status.to_string(),
            song_duration_seconds: session.song_duration.seconds(),
            now_playing,
            next_song_id,
            songs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::test_support::MemoryStore;

    #[tokio::test]
    async fn test_queue_with_wait_estimates() {
        let store = Arc::new(MemoryStore::default());
        let session = store.insert_session();
        let mut a = store.insert_song(&session.id, "Ana");
        let b = store.insert_song(&session.id, "Ben");
        let c = store.insert_song(&session.id, "Cy");
        let mut d = store.insert_song(&session.id, "Dee");
        a.status = SongStatus::Playing;
        d.status = SongStatus::Done;
        store.put_song(a.clone());
        store.put_song(d);

        let handler = GetQueueHandler::new(store.clone(), store.clone());
        let queue = handler
            .handle(GetQueue {
                session_id: session.id.to_string(),
                include_finished: false,
            })
            .await
            .unwrap();

        assert_eq!(queue.now_playing.unwrap().song_id, a.id.to_string());
        assert_eq!(queue.next_song_id, Some(b.id.to_string()));
        assert_eq!(queue.songs.len(), 3);

        let b_row = queue.songs.iter().find(|s| s.song_id == b.id.to_string()).unwrap();
        assert_eq!(b_row.songs_ahead, Some(1));
        assert_eq!(b_row.estimated_wait_secs, Some(270));
        let c_row = queue.songs.iter().find(|s| s.song_id == c.id.to_string()).unwrap();
        assert_eq!(c_row.songs_ahead, Some(2));
        assert_eq!(c_row.estimated_wait_secs, Some(540));
        let a_row = queue.songs.iter().find(|s| s.song_id == a.id.to_string()).unwrap();
        assert_eq!(a_row.songs_ahead, None);

        let all = handler
            .handle(GetQueue {
                session_id: session.id.to_string(),
                include_finished: true,
            })
            .await
            .unwrap();
        assert_eq!(all.songs.len(), 4);
    }
}
