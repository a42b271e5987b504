//! Session Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::gateway::parse_session_id;
use crate::application::ports::{MachineRegistryPort, SessionRepositoryPort};
use crate::application::queries::GetSession;
use crate::domain::session::TipHandles;

// ============================================================================
// Response DTOs
// ============================================================================

/// 场次详情响应
#[derive(Debug, Clone)]
pub struct SessionResponse {
    pub session_id: String,
    /// 状态机当前状态
    pub status: String,
    pub song_duration_seconds: u32,
    pub tip_handles: TipHandles,
    pub created_at: String,
    pub updated_at: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GetSession Handler
pub struct GetSessionHandler {
    registry: Arc<dyn MachineRegistryPort>,
    session_repo: Arc<dyn SessionRepositoryPort>,
}

impl GetSessionHandler {
    pub fn new(
        registry: Arc<dyn MachineRegistryPort>,
        session_repo: Arc<dyn SessionRepositoryPort>,
    ) -> Self {
        Self {
            registry,
            session_repo,
        }
    }

    pub async fn handle(&self, query: GetSession) -> Result<SessionResponse, ApplicationError> {
        let session_id = parse_session_id(&query.session_id)?;
        let session = self
            .session_repo
            .find_by_id(&session_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Session", &query.session_id))?;

        // 以状态机为准（包括尚未写入存储的定时迁移）
        let snapshot = self.registry.session_state(&session_id).await?;

        Ok(SessionResponse {
            session_id: session.id.to_string(),
            status: snapshot.value,
            song_duration_seconds: session.song_duration.seconds(),
            tip_handles: session.tips,
            created_at: session.created_at.to_rfc3339(),
            updated_at: session.updated_at.to_rfc3339(),
        })
    }
}
