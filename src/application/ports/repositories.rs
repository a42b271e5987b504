//! Repository Ports - 出站端口
//!
//! 核心与持久化之间的窄契约：加载状态、加载同场次歌曲、提交状态、原子重排
//! 具体实现在 infrastructure 层（如 SQLite）

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::queue::PositionUpdate;
use crate::domain::session::{Session, SessionChanges, SessionId, SessionStatus};
use crate::domain::song::{Song, SongChanges, SongId, SongStatus};

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// ============================================================================
// Song Repository
// ============================================================================

/// Song Repository Port
#[async_trait]
pub trait SongRepositoryPort: Send + Sync {
    /// 保存新点歌
    async fn create(&self, song: &Song) -> Result<(), RepositoryError>;

    /// 根据 ID 查找点歌
    async fn find_by_id(&self, id: &SongId) -> Result<Option<Song>, RepositoryError>;

    /// 获取场次内所有点歌，按 (position, created_at) 排序
    async fn find_by_session(&self, session_id: &SessionId) -> Result<Vec<Song>, RepositoryError>;

    /// 获取处于指定状态的全部点歌（启动时恢复定时器）
    async fn find_by_status(&self, status: SongStatus) -> Result<Vec<Song>, RepositoryError>;

    /// 场次内点歌数量
    async fn count_by_session(&self, session_id: &SessionId) -> Result<usize, RepositoryError>;

    /// 提交状态及上下文变化
    async fn persist_status(
        &self,
        id: &SongId,
        status: SongStatus,
        changes: &SongChanges,
    ) -> Result<(), RepositoryError>;

    /// 原子地写入一组新位置（全有或全无）
    async fn persist_reorder(
        &self,
        session_id: &SessionId,
        updates: &[PositionUpdate],
    ) -> Result<(), RepositoryError>;

    /// 删除点歌，返回是否存在
    async fn delete(&self, id: &SongId) -> Result<bool, RepositoryError>;
}

// ============================================================================
// Session Repository
// ============================================================================

/// Session Repository Port
#[async_trait]
pub trait SessionRepositoryPort: Send + Sync {
    /// 保存新场次
    async fn create(&self, session: &Session) -> Result<(), RepositoryError>;

    /// 根据 ID 查找场次
    async fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, RepositoryError>;

    /// 获取处于指定状态的全部场次
    async fn find_by_status(&self, status: SessionStatus)
        -> Result<Vec<Session>, RepositoryError>;

    /// 提交状态及上下文变化
    async fn persist_status(
        &self,
        id: &SessionId,
        status: SessionStatus,
        changes: &SessionChanges,
    ) -> Result<(), RepositoryError>;
}
