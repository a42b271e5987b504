//! Session Command Handlers

use std::sync::Arc;

use crate::application::commands::session_commands::*;
use crate::application::error::ApplicationError;
use crate::application::ports::{RepositoryError, SessionRepositoryPort};
use crate::domain::session::{Session, SongDuration, TipHandles};

/// 场次码冲突时最多生成的次数
const MAX_CODE_ATTEMPTS: u32 = 5;

/// CreateSession Handler - 新建场次，初始为 active
pub struct CreateSessionHandler {
    session_repo: Arc<dyn SessionRepositoryPort>,
    default_song_duration: SongDuration,
}

impl CreateSessionHandler {
    pub fn new(
        session_repo: Arc<dyn SessionRepositoryPort>,
        default_song_duration: SongDuration,
    ) -> Self {
        Self {
            session_repo,
            default_song_duration,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateSession,
    ) -> Result<CreateSessionResponse, ApplicationError> {
        let song_duration = match cmd.song_duration_seconds {
            Some(seconds) => SongDuration::new(seconds).map_err(ApplicationError::validation)?,
            None => self.default_song_duration,
        };

        let tips = match cmd.tip_handles {
            Some(tips) => TipHandles::new(tips.venmo, tips.cashapp, tips.paypal)
                .map_err(ApplicationError::validation)?,
            None => TipHandles::default(),
        };

        let mut attempt = 1;
        let session = loop {
            let mut session = Session::new(song_duration);
            session.tips = tips.clone();
            match self.session_repo.create(&session).await {
                Ok(()) => break session,
                Err(RepositoryError::Duplicate(code)) if attempt < MAX_CODE_ATTEMPTS => {
                    tracing::warn!(session_id = %code, attempt, "Session code already taken, regenerating");
                    attempt += 1;
                }
                Err(e) => return Err(ApplicationError::PersistenceError(e.to_string())),
            }
        };

        tracing::info!(
            session_id = %session.id,
            song_duration_seconds = song_duration.seconds(),
            "Session created"
        );

        Ok(CreateSessionResponse {
            session_id: session.id.to_string(),
            status: session.status.to_string(),
            song_duration_seconds: song_duration.seconds(),
            created_at: session.created_at.to_rfc3339(),
        })
    }
}
