//! Session Commands - 场次相关命令

use crate::domain::session::TipHandles;

/// 创建场次命令
#[derive(Debug, Clone, Default)]
pub struct CreateSession {
    /// 缺省使用配置中的默认值
    pub song_duration_seconds: Option<u32>,
    pub tip_handles: Option<TipHandles>,
}

/// 创建场次响应
#[derive(Debug, Clone)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub status: String,
    pub song_duration_seconds: u32,
    pub created_at: String,
}
