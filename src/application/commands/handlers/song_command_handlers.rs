//! Song Command Handlers
//!
//! 点歌的创建、修改、延后、撤回、删除及队列重排

use std::sync::Arc;

use crate::application::commands::song_commands::*;
use crate::application::error::ApplicationError;
use crate::application::gateway::{
    load_song_in_open_session, merge_details, parse_session_id, parse_song_id, resolve_delay,
    DelayPolicy,
};
use crate::application::ports::{MachineRegistryPort, SessionRepositoryPort, SongRepositoryPort};
use crate::domain::queue::{apply_reorder, PositionUpdate};
use crate::domain::song::{Song, SongDetails, SongEvent, SongId};

/// SubmitSongRequest Handler - 新歌排在队尾
pub struct SubmitSongRequestHandler {
    song_repo: Arc<dyn SongRepositoryPort>,
    session_repo: Arc<dyn SessionRepositoryPort>,
}

impl SubmitSongRequestHandler {
    pub fn new(
        song_repo: Arc<dyn SongRepositoryPort>,
        session_repo: Arc<dyn SessionRepositoryPort>,
    ) -> Self {
        Self {
            song_repo,
            session_repo,
        }
    }

    pub async fn handle(
        &self,
        cmd: SubmitSongRequest,
    ) -> Result<SubmitSongResponse, ApplicationError> {
        let session_id = parse_session_id(&cmd.session_id)?;
        let session = self
            .session_repo
            .find_by_id(&session_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Session", &cmd.session_id))?;

        if !session.accepts_requests() {
            return Err(ApplicationError::SessionClosed(session.id.to_string()));
        }

        let details = SongDetails::new(cmd.singer_name, cmd.artist, cmd.title)
            .map_err(ApplicationError::validation)?;
        let count = self.song_repo.count_by_session(&session_id).await?;
        let song = Song::new(session_id, details, count);

        self.song_repo
            .create(&song)
            .await
            .map_err(|e| ApplicationError::PersistenceError(e.to_string()))?;

        tracing::info!(
            song_id = %song.id,
            session_id = %song.session_id,
            position = song.position,
            "Song requested"
        );

        Ok(SubmitSongResponse {
            song_id: song.id.to_string(),
            session_id: song.session_id.to_string(),
            position: song.position,
            status: song.status.to_string(),
        })
    }
}

/// EditSongDetails Handler - 经由 EDIT 事件修改详情
pub struct EditSongDetailsHandler {
    registry: Arc<dyn MachineRegistryPort>,
    song_repo: Arc<dyn SongRepositoryPort>,
    session_repo: Arc<dyn SessionRepositoryPort>,
}

impl EditSongDetailsHandler {
    pub fn new(
        registry: Arc<dyn MachineRegistryPort>,
        song_repo: Arc<dyn SongRepositoryPort>,
        session_repo: Arc<dyn SessionRepositoryPort>,
    ) -> Self {
        Self {
            registry,
            song_repo,
            session_repo,
        }
    }

    pub async fn handle(
        &self,
        cmd: EditSongDetails,
    ) -> Result<SongStateResponse, ApplicationError> {
        let song_id = parse_song_id(&cmd.song_id)?;
        let song = load_song_in_open_session(
            self.song_repo.as_ref(),
            self.session_repo.as_ref(),
            &song_id,
        )
        .await?;

        let details = merge_details(&song.details, cmd.singer_name, cmd.artist, cmd.title)?;
        let status = self
            .registry
            .send_song(&song_id, SongEvent::Edit(details))
            .await?;

        Ok(SongStateResponse {
            song_id: cmd.song_id,
            status: status.to_string(),
        })
    }
}

/// DelaySong Handler - 经由 DELAY 事件延后
pub struct DelaySongHandler {
    registry: Arc<dyn MachineRegistryPort>,
    song_repo: Arc<dyn SongRepositoryPort>,
    session_repo: Arc<dyn SessionRepositoryPort>,
    delay_policy: DelayPolicy,
}

impl DelaySongHandler {
    pub fn new(
        registry: Arc<dyn MachineRegistryPort>,
        song_repo: Arc<dyn SongRepositoryPort>,
        session_repo: Arc<dyn SessionRepositoryPort>,
        delay_policy: DelayPolicy,
    ) -> Self {
        Self {
            registry,
            song_repo,
            session_repo,
            delay_policy,
        }
    }

    pub async fn handle(&self, cmd: DelaySong) -> Result<SongStateResponse, ApplicationError> {
        let song_id = parse_song_id(&cmd.song_id)?;

        load_song_in_open_session(
            self.song_repo.as_ref(),
            self.session_repo.as_ref(),
            &song_id,
        )
        .await?;
        let minutes = resolve_delay(
            self.registry.as_ref(),
            &self.delay_policy,
            &song_id,
            cmd.minutes,
        )
        .await?;

        let status = self
            .registry
            .send_song(&song_id, SongEvent::Delay(minutes))
            .await?;

        Ok(SongStateResponse {
            song_id: cmd.song_id,
            status: status.to_string(),
        })
    }
}

/// CancelSongRequest Handler - 歌手撤回，只允许 waiting
pub struct CancelSongRequestHandler {
    registry: Arc<dyn MachineRegistryPort>,
    song_repo: Arc<dyn SongRepositoryPort>,
    session_repo: Arc<dyn SessionRepositoryPort>,
}

impl CancelSongRequestHandler {
    pub fn new(
        registry: Arc<dyn MachineRegistryPort>,
        song_repo: Arc<dyn SongRepositoryPort>,
        session_repo: Arc<dyn SessionRepositoryPort>,
    ) -> Self {
        Self {
            registry,
            song_repo,
            session_repo,
        }
    }

    pub async fn handle(
        &self,
        cmd: CancelSongRequest,
    ) -> Result<DeleteSongResponse, ApplicationError> {
        let song_id = parse_song_id(&cmd.song_id)?;
        load_song_in_open_session(
            self.song_repo.as_ref(),
            self.session_repo.as_ref(),
            &song_id,
        )
        .await?;

        self.registry.delete_song(&song_id, true).await?;

        Ok(DeleteSongResponse {
            song_id: cmd.song_id,
        })
    }
}

/// DeleteSong Handler - DJ 删除，任意状态均可
pub struct DeleteSongHandler {
    registry: Arc<dyn MachineRegistryPort>,
}

impl DeleteSongHandler {
    pub fn new(registry: Arc<dyn MachineRegistryPort>) -> Self {
        Self { registry }
    }

    pub async fn handle(&self, cmd: DeleteSong) -> Result<DeleteSongResponse, ApplicationError> {
        let song_id = parse_song_id(&cmd.song_id)?;
        self.registry.delete_song(&song_id, false).await?;

        Ok(DeleteSongResponse {
            song_id: cmd.song_id,
        })
    }
}

/// ReorderQueue Handler - 全部生效或全部不生效
pub struct ReorderQueueHandler {
    song_repo: Arc<dyn SongRepositoryPort>,
    session_repo: Arc<dyn SessionRepositoryPort>,
}

impl ReorderQueueHandler {
    pub fn new(
        song_repo: Arc<dyn SongRepositoryPort>,
        session_repo: Arc<dyn SessionRepositoryPort>,
    ) -> Self {
        Self {
            song_repo,
            session_repo,
        }
    }

    pub async fn handle(
        &self,
        cmd: ReorderQueue,
    ) -> Result<ReorderQueueResponse, ApplicationError> {
        let session_id = parse_session_id(&cmd.session_id)?;
        let session = self
            .session_repo
            .find_by_id(&session_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Session", &cmd.session_id))?;
        if session.status.is_terminal() {
            return Err(ApplicationError::SessionClosed(session.id.to_string()));
        }

        let updates = cmd
            .positions
            .iter()
            .map(|entry| {
                SongId::parse(&entry.song_id)
                    .map(|song_id| PositionUpdate {
                        song_id,
                        position: entry.position,
                    })
                    .ok_or_else(|| {
                        ApplicationError::validation(format!("Invalid song id: {}", entry.song_id))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // 先在副本上校验，任何一项不合法都不写入
        let mut songs = self.song_repo.find_by_session(&session_id).await?;
        apply_reorder(&mut songs, &updates)?;

        self.song_repo
            .persist_reorder(&session_id, &updates)
            .await
            .map_err(|e| ApplicationError::PersistenceError(e.to_string()))?;

        tracing::info!(
            session_id = %session_id,
            updated = updates.len(),
            "Queue reordered"
        );

        Ok(ReorderQueueResponse {
            session_id: session_id.to_string(),
            updated: updates.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::queue::next_playable;
    use crate::domain::session::{SessionId, SessionStatus};
    use crate::domain::song::SongStatus;
    use crate::infrastructure::memory::test_support::MemoryStore;
    use crate::infrastructure::memory::{ActorRegistry, RegistrySettings};

    fn registry(store: &Arc<MemoryStore>) -> Arc<dyn MachineRegistryPort> {
        Arc::new(ActorRegistry::new(
            RegistrySettings::default(),
            store.clone(),
            store.clone(),
        ))
    }

    fn submit(session_id: &SessionId, singer: &str) -> SubmitSongRequest {
        SubmitSongRequest {
            session_id: session_id.to_string(),
            singer_name: singer.into(),
            artist: "ABBA".into(),
            title: "Waterloo".into(),
        }
    }

    #[tokio::test]
    async fn test_submit_appends_to_queue() {
        let store = Arc::new(MemoryStore::default());
        let session = store.insert_session();
        let handler = SubmitSongRequestHandler::new(store.clone(), store.clone());

        let first = handler.handle(submit(&session.id, "Ana")).await.unwrap();
        let second = handler.handle(submit(&session.id, "Ben")).await.unwrap();
        assert_eq!(first.position, 1);
        assert_eq!(second.position, 2);
        assert_eq!(second.status, "waiting");

        // 场次码大小写不敏感
        let lower = SubmitSongRequest {
            session_id: session.id.as_str().to_lowercase(),
            ..submit(&session.id, "Cy")
        };
        assert_eq!(handler.handle(lower).await.unwrap().position, 3);
    }

    #[tokio::test]
    async fn test_submit_requires_active_session_and_valid_details() {
        let store = Arc::new(MemoryStore::default());
        let session = store.insert_session();
        let handler = SubmitSongRequestHandler::new(store.clone(), store.clone());

        let blank = SubmitSongRequest {
            singer_name: "   ".into(),
            ..submit(&session.id, "Ana")
        };
        let err = handler.handle(blank).await.unwrap_err();
        assert!(matches!(err, ApplicationError::ValidationError(_)));

        store.set_session_status(&session.id, SessionStatus::Paused);
        let err = handler.handle(submit(&session.id, "Ana")).await.unwrap_err();
        assert!(matches!(err, ApplicationError::SessionClosed(_)));

        let err = handler.handle(submit(&SessionId::parse("QQQQQQ").unwrap(), "Ana")).await.unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_edit_and_delay_go_through_machine() {
        let store = Arc::new(MemoryStore::default());
        let session = store.insert_session();
        let song = store.insert_song(&session.id, "Ana");
        let registry = registry(&store);

        let edit = EditSongDetailsHandler::new(registry.clone(), store.clone(), store.clone());
        let delay = DelaySongHandler::new(
            registry.clone(),
            store.clone(),
            store.clone(),
            DelayPolicy::default(),
        );

        let response = edit
            .handle(EditSongDetails {
                song_id: song.id.to_string(),
                artist: Some("Queen".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(response.status, "waiting");
        assert_eq!(store.song(&song.id).unwrap().details.artist(), "Queen");

        let response = delay
            .handle(DelaySong {
                song_id: song.id.to_string(),
                minutes: None,
            })
            .await
            .unwrap();
        assert_eq!(response.status, "delayed");
        assert_eq!(store.song(&song.id).unwrap().delay.unwrap().minutes.minutes(), 5);

        // delayed 状态下不可再编辑
        let err = edit
            .handle(EditSongDetails {
                song_id: song.id.to_string(),
                title: Some("Other".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::InvalidTransition { state: "delayed", event: "EDIT" }
        ));

        // 状态机的拒绝优先于分钟数校验
        let err = delay
            .handle(DelaySong {
                song_id: song.id.to_string(),
                minutes: Some(45),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::GuardRejected { guard: "canBeDelayed", event: "DELAY" }
        ));
    }

    #[tokio::test]
    async fn test_out_of_range_delay_reports_machine_rejection_first() {
        let store = Arc::new(MemoryStore::default());
        let session = store.insert_session();
        let a = store.insert_song(&session.id, "Ana");
        let b = store.insert_song(&session.id, "Ben");
        let registry = registry(&store);
        let delay = DelaySongHandler::new(
            registry.clone(),
            store.clone(),
            store.clone(),
            DelayPolicy::default(),
        );
        let too_long = |id: &SongId| DelaySong {
            song_id: id.to_string(),
            minutes: Some(31),
        };

        let err = delay.handle(too_long(&b.id)).await.unwrap_err();
        assert!(matches!(err, ApplicationError::ValidationError(_)));

        registry.send_song(&a.id, SongEvent::Play).await.unwrap();
        let err = delay.handle(too_long(&a.id)).await.unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::InvalidTransition { state: "playing", event: "DELAY" }
        ));

        registry
            .send_song(&b.id, SongEvent::Delay(Default::default()))
            .await
            .unwrap();
        let err = delay.handle(too_long(&b.id)).await.unwrap_err();
        assert!(matches!(err, ApplicationError::GuardRejected { guard: "canBeDelayed", .. }));
        assert_eq!(store.song(&b.id).unwrap().delay.unwrap().minutes.minutes(), 5);
    }

    #[tokio::test]
    async fn test_cancel_only_while_waiting_but_dj_can_delete() {
        let store = Arc::new(MemoryStore::default());
        let session = store.insert_session();
        let a = store.insert_song(&session.id, "Ana");
        let b = store.insert_song(&session.id, "Ben");
        let registry = registry(&store);

        let cancel = CancelSongRequestHandler::new(registry.clone(), store.clone(), store.clone());
        let delete = DeleteSongHandler::new(registry.clone());

        registry.send_song(&a.id, SongEvent::Play).await.unwrap();
        let err = cancel
            .handle(CancelSongRequest {
                song_id: a.id.to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidTransition { state: "playing", .. }));

        delete
            .handle(DeleteSong {
                song_id: a.id.to_string(),
            })
            .await
            .unwrap();
        cancel
            .handle(CancelSongRequest {
                song_id: b.id.to_string(),
            })
            .await
            .unwrap();
        assert!(store.song(&a.id).is_none());
        assert!(store.song(&b.id).is_none());
    }

    #[tokio::test]
    async fn test_reorder_swaps_next_playable() {
        let store = Arc::new(MemoryStore::default());
        let session = store.insert_session();
        let a = store.insert_song(&session.id, "Ana");
        let b = store.insert_song(&session.id, "Ben");
        let c = store.insert_song(&session.id, "Cy");
        let handler = ReorderQueueHandler::new(store.clone(), store.clone());

        handler
            .handle(ReorderQueue {
                session_id: session.id.to_string(),
                positions: vec![
                    ReorderEntry { song_id: c.id.to_string(), position: 1 },
                    ReorderEntry { song_id: b.id.to_string(), position: 2 },
                    ReorderEntry { song_id: a.id.to_string(), position: 3 },
                ],
            })
            .await
            .unwrap();

        let songs = store.find_by_session(&session.id).await.unwrap();
        assert_eq!(next_playable(&songs).unwrap().id, c.id);

        let registry = registry(&store);
        let err = registry.send_song(&a.id, SongEvent::Play).await.unwrap_err();
        assert!(matches!(
            ApplicationError::from(err),
            ApplicationError::GuardRejected { guard: "isNextInQueue", .. }
        ));
        assert_eq!(
            registry.send_song(&c.id, SongEvent::Play).await.unwrap(),
            SongStatus::Playing
        );
    }

    #[tokio::test]
    async fn test_reorder_with_foreign_song_writes_nothing() {
        let store = Arc::new(MemoryStore::default());
        let session = store.insert_session();
        let other = store.insert_session();
        let a = store.insert_song(&session.id, "Ana");
        let foreign = store.insert_song(&other.id, "Zed");
        let handler = ReorderQueueHandler::new(store.clone(), store.clone());
        let writes = store.writes();

        let err = handler
            .handle(ReorderQueue {
                session_id: session.id.to_string(),
                positions: vec![
                    ReorderEntry { song_id: a.id.to_string(), position: 2 },
                    ReorderEntry { song_id: foreign.id.to_string(), position: 1 },
                ],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::ValidationError(_)));
        assert_eq!(store.writes(), writes);
        assert_eq!(store.song(&a.id).unwrap().position, 1);
    }
}
