//! Queue Queries

/// 获取场次队列
#[derive(Debug, Clone)]
pub struct GetQueue {
    pub session_id: String,
    /// 是否包含 done/skipped 歌曲
    pub include_finished: bool,
}
