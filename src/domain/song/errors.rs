//! Song Context - Errors

use thiserror::Error;

use super::SongId;

#[derive(Debug, Error)]
pub enum SongError {
    #[error("点歌不存在: {0}")]
    NotFound(SongId),

    #[error("无效的歌曲信息: {0}")]
    InvalidDetails(String),

    #[error("无效的延后时间: {0}")]
    InvalidDelay(String),
}
