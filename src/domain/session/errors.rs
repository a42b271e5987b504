//! Session Context - Errors

use thiserror::Error;

use super::SessionId;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("场次不存在: {0}")]
    NotFound(SessionId),

    #[error("无效的场次代码: {0}")]
    InvalidCode(String),

    #[error("无效的单曲时长: {0}")]
    InvalidDuration(String),

    #[error("无效的打赏账号: {0}")]
    InvalidTips(String),
}
