//! Application State
//!
//! 持有所有 Command/Query Handlers 与 Transition Gateway

use std::sync::Arc;

use crate::application::{
    // Command handlers
    CancelSongRequestHandler, CreateSessionHandler, DelaySongHandler, DeleteSongHandler,
    EditSongDetailsHandler, ReorderQueueHandler, SubmitSongRequestHandler,
    // Query handlers
    GetQueueHandler, GetSessionHandler,
    // Gateway
    DelayPolicy, TransitionGateway,
    // Ports
    MachineRegistryPort, SessionRepositoryPort, SongRepositoryPort,
};
use crate::domain::session::SongDuration;

/// 应用状态
pub struct AppState {
    // ========== Gateway ==========
    pub gateway: TransitionGateway,

    // ========== Command Handlers ==========
    pub create_session_handler: CreateSessionHandler,
    pub submit_song_handler: SubmitSongRequestHandler,
    pub edit_song_handler: EditSongDetailsHandler,
    pub delay_song_handler: DelaySongHandler,
    pub cancel_song_handler: CancelSongRequestHandler,
    pub delete_song_handler: DeleteSongHandler,
    pub reorder_queue_handler: ReorderQueueHandler,

    // ========== Query Handlers ==========
    pub get_session_handler: GetSessionHandler,
    pub get_queue_handler: GetQueueHandler,
}

impl AppState {
    /// 创建应用状态
    pub fn new(
        registry: Arc<dyn MachineRegistryPort>,
        song_repo: Arc<dyn SongRepositoryPort>,
        session_repo: Arc<dyn SessionRepositoryPort>,
        delay_policy: DelayPolicy,
        default_song_duration: SongDuration,
    ) -> Self {
        Self {
            gateway: TransitionGateway::new(
                registry.clone(),
                song_repo.clone(),
                session_repo.clone(),
                delay_policy,
            ),

            // Command handlers
            create_session_handler: CreateSessionHandler::new(
                session_repo.clone(),
                default_song_duration,
            ),
            submit_song_handler: SubmitSongRequestHandler::new(
                song_repo.clone(),
                session_repo.clone(),
            ),
            edit_song_handler: EditSongDetailsHandler::new(
                registry.clone(),
                song_repo.clone(),
                session_repo.clone(),
            ),
            delay_song_handler: DelaySongHandler::new(
                registry.clone(),
                song_repo.clone(),
                session_repo.clone(),
                delay_policy,
            ),
            cancel_song_handler: CancelSongRequestHandler::new(
                registry.clone(),
                song_repo.clone(),
                session_repo.clone(),
            ),
            delete_song_handler: DeleteSongHandler::new(registry.clone()),
            reorder_queue_handler: ReorderQueueHandler::new(
                song_repo.clone(),
                session_repo.clone(),
            ),

            // Query handlers
            get_session_handler: GetSessionHandler::new(registry, session_repo.clone()),
            get_queue_handler: GetQueueHandler::new(song_repo, session_repo),
        }
    }
}
