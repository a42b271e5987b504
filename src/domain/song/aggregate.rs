//! Song Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DelayWindow, SongDetails, SongId, SongStatus};
use crate::domain::session::SessionId;

/// Song 聚合根 - 一条点歌请求
///
/// 不变量:
/// - position 在同一场次内为正整数
/// - 进入 done/skipped 后不可再变（只允许删除）
/// - status 只能经由 SongMachine 修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    pub session_id: SessionId,
    pub details: SongDetails,
    pub position: u32,
    pub status: SongStatus,
    pub delay: Option<DelayWindow>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Song {
    /// 新建点歌请求
    ///
    /// `existing_count` 为场次内已有歌曲数，新歌位置为其 + 1
    pub fn new(session_id: SessionId, details: SongDetails, existing_count: usize) -> Self {
        let now = Utc::now();
        Self {
            id: SongId::new(),
            session_id,
            details,
            position: existing_count as u32 + 1,
            status: SongStatus::Waiting,
            delay: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_song_creation() {
        let details = SongDetails::new("Ana", "Queen", "Bohemian Rhapsody").unwrap();
        let song = Song::new(SessionId::parse("ABCD").unwrap(), details, 2);

        assert_eq!(song.position, 3);
        assert_eq!(song.status, SongStatus::Waiting);
        assert!(song.delay.is_none());
    }
}
