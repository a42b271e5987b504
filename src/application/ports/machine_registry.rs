//! Machine Registry Port - 状态机实例注册表
//!
//! 每个实体 ID 对应一个常驻内存的状态机实例，同一实体的迁移严格串行
//! 具体实现在 infrastructure/memory 层

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use super::RepositoryError;
use crate::domain::machine::{EntityKind, MachineError};
use crate::domain::session::{SessionEvent, SessionEventKind, SessionId, SessionStatus};
use crate::domain::song::{SongEvent, SongEventKind, SongId, SongStatus};

/// 注册表错误
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error(transparent)]
    Rejected(#[from] MachineError),

    /// 迁移合法但写入失败，内存状态未提交
    #[error("Persistence failed: {0}")]
    Persistence(RepositoryError),

    /// 加载状态失败
    #[error("Storage error: {0}")]
    Storage(RepositoryError),
}

impl RegistryError {
    pub fn not_found(kind: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// 供界面渲染的状态机视图
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineSnapshot {
    /// 状态名
    pub value: String,
    /// 上下文字段
    pub context: serde_json::Value,
    /// 事件名（小写）-> 当前是否可发送
    pub can: BTreeMap<String, bool>,
}

/// Machine Registry Port
#[async_trait]
pub trait MachineRegistryPort: Send + Sync {
    /// 当前点歌状态视图（守卫基于最新队列计算）
    async fn song_state(&self, id: &SongId) -> Result<MachineSnapshot, RegistryError>;

    /// 当前场次状态视图
    async fn session_state(&self, id: &SessionId) -> Result<MachineSnapshot, RegistryError>;

    /// 向点歌状态机发送事件
    async fn send_song(&self, id: &SongId, event: SongEvent) -> Result<SongStatus, RegistryError>;

    /// 向场次状态机发送事件
    async fn send_session(
        &self,
        id: &SessionId,
        event: SessionEvent,
    ) -> Result<SessionStatus, RegistryError>;

    /// 纯查询：点歌事件当前是否可发送
    async fn can_song(&self, id: &SongId, kind: SongEventKind) -> Result<bool, RegistryError>;

    /// 纯查询：点歌事件当前被拒绝时返回拒绝原因
    async fn check_song(&self, id: &SongId, kind: SongEventKind) -> Result<(), RegistryError>;

    /// 纯查询：场次事件当前是否可发送
    async fn can_session(
        &self,
        id: &SessionId,
        kind: SessionEventKind,
    ) -> Result<bool, RegistryError>;

    /// 删除点歌（不是状态迁移），同时销毁实例并取消定时器
    ///
    /// `only_if_waiting` 为 true 时仅允许删除排队中的点歌
    async fn delete_song(&self, id: &SongId, only_if_waiting: bool) -> Result<(), RegistryError>;

    /// 手动移除缓存实例，不影响持久化数据
    async fn evict(&self, kind: EntityKind, id: &str);

    /// 取消所有定时器并清空缓存
    async fn shutdown(&self);
}
