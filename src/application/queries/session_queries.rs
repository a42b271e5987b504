//! Session Queries

/// 获取场次详情
#[derive(Debug, Clone)]
pub struct GetSession {
    pub session_id: String,
}
