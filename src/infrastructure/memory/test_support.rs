//! 测试用内存仓储

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::application::ports::{RepositoryError, SessionRepositoryPort, SongRepositoryPort};
use crate::domain::queue::PositionUpdate;
use crate::domain::session::{Session, SessionChanges, SessionId, SessionStatus, SongDuration};
use crate::domain::song::{Song, SongChanges, SongDetails, SongId, SongStatus};

/// 同时实现两个仓储端口；`fail_writes` 打开后所有写操作失败
#[derive(Default)]
pub struct MemoryStore {
    songs: Mutex<HashMap<SongId, Song>>,
    sessions: Mutex<HashMap<SessionId, Session>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
    code_collisions: AtomicUsize,
}

impl MemoryStore {
    pub fn insert_session(&self) -> Session {
        let session = Session::new(SongDuration::default());
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session.clone());
        session
    }

    /// 追加一首 waiting 歌曲，位置为现有数量 + 1
    pub fn insert_song(&self, session_id: &SessionId, singer: &str) -> Song {
        let mut songs = self.songs.lock().unwrap();
        let count = songs.values().filter(|s| &s.session_id == session_id).count();
        let details = SongDetails::new(singer, "Artist", "Title").unwrap();
        let song = Song::new(session_id.clone(), details, count);
        songs.insert(song.id.clone(), song.clone());
        song
    }

    pub fn put_song(&self, song: Song) {
        self.songs.lock().unwrap().insert(song.id.clone(), song);
    }

    pub fn put_session(&self, session: Session) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session);
    }

    pub fn song(&self, id: &SongId) -> Option<Song> {
        self.songs.lock().unwrap().get(id).cloned()
    }

    pub fn session(&self, id: &SessionId) -> Option<Session> {
        self.sessions.lock().unwrap().get(id).cloned()
    }

    pub fn set_session_status(&self, id: &SessionId, status: SessionStatus) {
        if let Some(session) = self.sessions.lock().unwrap().get_mut(id) {
            session.status = status;
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// 接下来的 `count` 次场次创建按场次码冲突失败
    pub fn set_code_collisions(&self, count: usize) {
        self.code_collisions.store(count, Ordering::SeqCst);
    }

    /// 成功写入次数
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_write(&self) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::DatabaseError("disk I/O error".into()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl SongRepositoryPort for MemoryStore {
    async fn create(&self, song: &Song) -> Result<(), RepositoryError> {
        self.check_write()?;
        self.songs
            .lock()
            .unwrap()
            .insert(song.id.clone(), song.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &SongId) -> Result<Option<Song>, RepositoryError> {
        Ok(self.song(id))
    }

    async fn find_by_session(&self, session_id: &SessionId) -> Result<Vec<Song>, RepositoryError> {
        let mut songs: Vec<Song> = self
            .songs
            .lock()
            .unwrap()
            .values()
            .filter(|s| &s.session_id == session_id)
            .cloned()
            .collect();
        songs.sort_by_key(|s| (s.position, s.created_at));
        Ok(songs)
    }

    async fn find_by_status(&self, status: SongStatus) -> Result<Vec<Song>, RepositoryError> {
        let mut songs: Vec<Song> = self
            .songs
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.status == status)
            .cloned()
            .collect();
        songs.sort_by_key(|s| s.created_at);
        Ok(songs)
    }

    async fn count_by_session(&self, session_id: &SessionId) -> Result<usize, RepositoryError> {
        Ok(self
            .songs
            .lock()
            .unwrap()
            .values()
            .filter(|s| &s.session_id == session_id)
            .count())
    }

    async fn persist_status(
        &self,
        id: &SongId,
        status: SongStatus,
        changes: &SongChanges,
    ) -> Result<(), RepositoryError> {
        self.check_write()?;
        let mut songs = self.songs.lock().unwrap();
        let song = songs
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        song.status = status;
        if let Some(delay) = changes.delay {
            song.delay = delay;
        }
        if let Some(details) = &changes.details {
            song.details = details.clone();
        }
        song.updated_at = Utc::now();
        Ok(())
    }

    async fn persist_reorder(
        &self,
        session_id: &SessionId,
        updates: &[PositionUpdate],
    ) -> Result<(), RepositoryError> {
        self.check_write()?;
        let mut songs = self.songs.lock().unwrap();
        if updates.iter().any(|u| {
            songs
                .get(&u.song_id)
                .map_or(true, |s| &s.session_id != session_id)
        }) {
            return Err(RepositoryError::NotFound("song not in session".into()));
        }
        for update in updates {
            if let Some(song) = songs.get_mut(&update.song_id) {
                song.position = update.position;
            }
        }
        Ok(())
    }

    async fn delete(&self, id: &SongId) -> Result<bool, RepositoryError> {
        self.check_write()?;
        Ok(self.songs.lock().unwrap().remove(id).is_some())
    }
}

#[async_trait]
impl SessionRepositoryPort for MemoryStore {
    async fn create(&self, session: &Session) -> Result<(), RepositoryError> {
        let collide = self
            .code_collisions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if collide || self.session(&session.id).is_some() {
            return Err(RepositoryError::Duplicate(session.id.to_string()));
        }
        self.check_write()?;
        self.put_session(session.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, RepositoryError> {
        Ok(self.session(id))
    }

    async fn find_by_status(
        &self,
        status: SessionStatus,
    ) -> Result<Vec<Session>, RepositoryError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.status == status)
            .cloned()
            .collect())
    }

    async fn persist_status(
        &self,
        id: &SessionId,
        status: SessionStatus,
        changes: &SessionChanges,
    ) -> Result<(), RepositoryError> {
        self.check_write()?;
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        session.status = status;
        if let Some(duration) = changes.song_duration {
            session.song_duration = duration;
        }
        if let Some(tips) = &changes.tips {
            session.tips = tips.clone();
        }
        session.updated_at = Utc::now();
        Ok(())
    }
}
