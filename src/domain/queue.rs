//! Queue Position Model - 队列顺序模型
//!
//! 规则:
//! - 下一首可播放 = 场次内 status 为 waiting 且 position 最小的歌曲
//! - position 相同时按输入顺序取第一首（稳定）
//! - 重排是全有或全无的：任一条目无效则不做任何修改

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::session::SongDuration;
use crate::domain::song::{Song, SongId, SongStatus};

/// 重排错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("歌曲不属于该场次: {0}")]
    UnknownSong(SongId),

    #[error("位置必须为正整数: {0}")]
    InvalidPosition(SongId),
}

/// 单首歌曲的新位置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub song_id: SongId,
    pub position: u32,
}

/// 返回下一首可播放的歌曲
pub fn next_playable(songs: &[Song]) -> Option<&Song> {
    // min_by_key 在并列时返回第一个元素
    songs
        .iter()
        .filter(|s| s.status == SongStatus::Waiting)
        .min_by_key(|s| s.position)
}

/// 批量覆盖位置
///
/// 先校验全部条目，再统一写入；不校验连续性和唯一性
pub fn apply_reorder(songs: &mut [Song], updates: &[PositionUpdate]) -> Result<(), QueueError> {
    for update in updates {
        if update.position == 0 {
            return Err(QueueError::InvalidPosition(update.song_id.clone()));
        }
        if !songs.iter().any(|s| s.id == update.song_id) {
            return Err(QueueError::UnknownSong(update.song_id.clone()));
        }
    }

    for update in updates {
        if let Some(song) = songs.iter_mut().find(|s| s.id == update.song_id) {
            song.position = update.position;
        }
    }
    Ok(())
}

/// 守卫使用的只读队列查询
pub trait QueueView {
    /// 下一首可播放歌曲的 ID
    fn next_playable(&self) -> Option<&SongId>;

    /// 除 `song_id` 外是否有歌曲处于 playing
    fn has_playing_except(&self, song_id: &SongId) -> bool;
}

#[derive(Debug, Clone)]
struct QueueEntry {
    id: SongId,
    position: u32,
    status: SongStatus,
}

/// 某一时刻的队列快照
#[derive(Debug, Clone, Default)]
pub struct QueueSnapshot {
    entries: Vec<QueueEntry>,
    next: Option<SongId>,
}

impl QueueSnapshot {
    pub fn from_songs(songs: &[Song]) -> Self {
        let entries = songs
            .iter()
            .map(|s| QueueEntry {
                id: s.id.clone(),
                position: s.position,
                status: s.status,
            })
            .collect();
        let next = next_playable(songs).map(|s| s.id.clone());
        Self { entries, next }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 某首歌的当前位置
    pub fn position_of(&self, song_id: &SongId) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| &e.id == song_id)
            .map(|e| e.position)
    }
}

impl QueueView for QueueSnapshot {
    fn next_playable(&self) -> Option<&SongId> {
        self.next.as_ref()
    }

    fn has_playing_except(&self, song_id: &SongId) -> bool {
        self.entries
            .iter()
            .any(|e| e.status == SongStatus::Playing && &e.id != song_id)
    }
}

/// 排队歌曲的等待估算
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaitEstimate {
    pub song_id: SongId,
    /// 前面还有几首（含正在演唱的一首）
    pub songs_ahead: u32,
    pub estimated_wait_secs: u64,
}

/// 估算每首 waiting 歌曲的等待时间
///
/// 正在演唱的歌曲计为一个完整时段
pub fn estimate_waits(songs: &[Song], song_duration: SongDuration) -> Vec<WaitEstimate> {
    let playing = songs.iter().any(|s| s.status == SongStatus::Playing) as u32;

    let mut waiting: Vec<&Song> = songs
        .iter()
        .filter(|s| s.status == SongStatus::Waiting)
        .collect();
    waiting.sort_by_key(|s| s.position);

    waiting
        .into_iter()
        .enumerate()
        .map(|(index, song)| {
            let songs_ahead = index as u32 + playing;
            WaitEstimate {
                song_id: song.id.clone(),
                songs_ahead,
                estimated_wait_secs: songs_ahead as u64 * song_duration.seconds() as u64,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::SessionId;
    use crate::domain::song::SongDetails;

    fn song(position: u32, status: SongStatus) -> Song {
        let details = SongDetails::new("Ana", "Queen", "Bohemian Rhapsody").unwrap();
        let mut song = Song::new(SessionId::parse("ABCD").unwrap(), details, 0);
        song.position = position;
        song.status = status;
        song
    }

    #[test]
    fn test_next_playable_picks_lowest_waiting() {
        let songs = vec![
            song(1, SongStatus::Done),
            song(3, SongStatus::Waiting),
            song(2, SongStatus::Delayed),
            song(4, SongStatus::Waiting),
        ];
        assert_eq!(next_playable(&songs).unwrap().id, songs[1].id);
    }

    #[test]
    fn test_next_playable_empty_queue() {
        let songs = vec![song(1, SongStatus::Playing), song(2, SongStatus::Skipped)];
        assert!(next_playable(&songs).is_none());
        assert!(next_playable(&[]).is_none());
    }

    #[test]
    fn test_next_playable_is_idempotent_and_stable_on_ties() {
        let songs = vec![song(2, SongStatus::Waiting), song(2, SongStatus::Waiting)];
        let first = next_playable(&songs).unwrap().id.clone();
        let second = next_playable(&songs).unwrap().id.clone();
        assert_eq!(first, second);
        assert_eq!(first, songs[0].id);
    }

    #[test]
    fn test_reorder_swap_changes_next() {
        let mut songs = vec![
            song(1, SongStatus::Waiting),
            song(2, SongStatus::Waiting),
            song(3, SongStatus::Waiting),
        ];
        let updates = vec![
            PositionUpdate { song_id: songs[0].id.clone(), position: 3 },
            PositionUpdate { song_id: songs[2].id.clone(), position: 1 },
        ];
        apply_reorder(&mut songs, &updates).unwrap();
        assert_eq!(next_playable(&songs).unwrap().id, songs[2].id);
    }

    #[test]
    fn test_reorder_is_all_or_nothing() {
        let mut songs = vec![song(1, SongStatus::Waiting), song(2, SongStatus::Waiting)];
        let stranger = SongId::new();
        let updates = vec![
            PositionUpdate { song_id: songs[0].id.clone(), position: 2 },
            PositionUpdate { song_id: stranger.clone(), position: 1 },
        ];
        assert_eq!(
            apply_reorder(&mut songs, &updates),
            Err(QueueError::UnknownSong(stranger))
        );
        assert_eq!(songs[0].position, 1);

        let zero = vec![PositionUpdate { song_id: songs[1].id.clone(), position: 0 }];
        assert!(apply_reorder(&mut songs, &zero).is_err());
        assert_eq!(songs[1].position, 2);
    }

    #[test]
    fn test_snapshot_view() {
        let songs = vec![song(1, SongStatus::Playing), song(2, SongStatus::Waiting)];
        let snapshot = QueueSnapshot::from_songs(&songs);
        assert_eq!(snapshot.next_playable(), Some(&songs[1].id));
        assert!(snapshot.has_playing_except(&songs[1].id));
        assert!(!snapshot.has_playing_except(&songs[0].id));
        assert_eq!(snapshot.position_of(&songs[1].id), Some(2));
    }

    #[test]
    fn test_wait_estimates() {
        let songs = vec![
            song(1, SongStatus::Playing),
            song(3, SongStatus::Waiting),
            song(2, SongStatus::Waiting),
            song(4, SongStatus::Delayed),
        ];
        let waits = estimate_waits(&songs, SongDuration::new(200).unwrap());
        assert_eq!(waits.len(), 2);
        assert_eq!(waits[0].song_id, songs[2].id);
        assert_eq!(waits[0].songs_ahead, 1);
        assert_eq!(waits[0].estimated_wait_secs, 200);
        assert_eq!(waits[1].estimated_wait_secs, 400);
    }
}
