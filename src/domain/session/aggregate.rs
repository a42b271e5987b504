//! Session Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{SessionId, SessionStatus, SongDuration, TipHandles};

/// Session 聚合根 - 一位 DJ 的一场活动
///
/// 不变量:
/// - 进入 `ended` 后状态不再变化
/// - 状态只能经由 SessionMachine 修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub status: SessionStatus,
    pub song_duration: SongDuration,
    pub tips: TipHandles,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// 创建新场次，初始状态为 active
    pub fn new(song_duration: SongDuration) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::generate(),
            status: SessionStatus::Active,
            song_duration,
            tips: TipHandles::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 是否接受新的点歌
    pub fn accepts_requests(&self) -> bool {
        self.status == SessionStatus::Active
    }
}
