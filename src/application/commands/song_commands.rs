//! Song Commands - 点歌相关命令

/// 歌手提交点歌
#[derive(Debug, Clone)]
pub struct SubmitSongRequest {
    pub session_id: String,
    pub singer_name: String,
    pub artist: String,
    pub title: String,
}

/// 提交点歌响应
#[derive(Debug, Clone)]
pub struct SubmitSongResponse {
    pub song_id: String,
    pub session_id: String,
    pub position: u32,
    pub status: String,
}

/// 修改歌曲详情（仅 waiting），未提供的字段保持原值
#[derive(Debug, Clone, Default)]
pub struct EditSongDetails {
    pub song_id: String,
    pub singer_name: Option<String>,
    pub artist: Option<String>,
    pub title: Option<String>,
}

/// 延后演唱
#[derive(Debug, Clone, Default)]
pub struct DelaySong {
    pub song_id: String,
    /// 缺省使用配置中的默认延后分钟数
    pub minutes: Option<u32>,
}

/// 状态迁移类命令的响应
#[derive(Debug, Clone)]
pub struct SongStateResponse {
    pub song_id: String,
    pub status: String,
}

/// 歌手撤回点歌（仅 waiting）
#[derive(Debug, Clone)]
pub struct CancelSongRequest {
    pub song_id: String,
}

/// DJ 删除点歌（任意状态）
#[derive(Debug, Clone)]
pub struct DeleteSong {
    pub song_id: String,
}

/// 删除响应
#[derive(Debug, Clone)]
pub struct DeleteSongResponse {
    pub song_id: String,
}

/// 重排中的一项
#[derive(Debug, Clone)]
pub struct ReorderEntry {
    pub song_id: String,
    pub position: u32,
}

/// DJ 批量重排队列
#[derive(Debug, Clone)]
pub struct ReorderQueue {
    pub session_id: String,
    pub positions: Vec<ReorderEntry>,
}

/// 重排响应
#[derive(Debug, Clone)]
pub struct ReorderQueueResponse {
    pub session_id: String,
    pub updated: usize,
}
