//! Transition Gateway - 按 (实体类型, ID, 事件名) 分发状态迁移
//!
//! 将外部传入的事件名解析为类型化事件，交给注册表执行，
//! 并把注册表错误统一为 ApplicationError

use serde::Serialize;
use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{
    MachineRegistryPort, MachineSnapshot, SessionRepositoryPort, SongRepositoryPort,
};
use crate::domain::machine::EntityKind;
use crate::domain::session::{
    SessionEvent, SessionEventKind, SessionId, SessionStatus, SongDuration, TipHandles,
};
use crate::domain::song::{DelayMinutes, Song, SongDetails, SongEvent, SongEventKind, SongId};

/// 事件附带的参数
#[derive(Debug, Clone, Default)]
pub struct EventPayload {
    /// DELAY: 延后分钟数，缺省使用配置值
    pub minutes: Option<u32>,
    /// UPDATE_DURATION
    pub song_duration_seconds: Option<u32>,
    /// UPDATE_TIPS
    pub tip_handles: Option<TipHandles>,
    /// EDIT: 未提供的字段保持原值
    pub singer_name: Option<String>,
    pub artist: Option<String>,
    pub title: Option<String>,
}

/// 延后分钟数策略：缺省值与上限来自配置
#[derive(Debug, Clone, Copy)]
pub struct DelayPolicy {
    pub default_minutes: DelayMinutes,
    pub max_minutes: u32,
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self {
            default_minutes: DelayMinutes::default(),
            max_minutes: DelayMinutes::MAX,
        }
    }
}

impl DelayPolicy {
    pub fn new(default_minutes: u32, max_minutes: u32) -> Result<Self, ApplicationError> {
        let max_minutes = max_minutes.min(DelayMinutes::MAX);
        if default_minutes > max_minutes {
            return Err(ApplicationError::validation(format!(
                "Default delay {} exceeds max {}",
                default_minutes, max_minutes
            )));
        }
        Ok(Self {
            default_minutes: DelayMinutes::new(default_minutes)
                .map_err(ApplicationError::validation)?,
            max_minutes,
        })
    }

    /// 解析请求中的延后分钟数
    pub fn resolve(&self, minutes: Option<u32>) -> Result<DelayMinutes, ApplicationError> {
        match minutes {
            None => Ok(self.default_minutes),
            Some(m) if m > self.max_minutes => Err(ApplicationError::validation(format!(
                "Delay cannot exceed {} minutes",
                self.max_minutes
            ))),
            Some(m) => DelayMinutes::new(m).map_err(ApplicationError::validation),
        }
    }
}

/// 迁移成功的结果
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub success: bool,
    pub state: String,
}

pub(crate) fn parse_song_id(id: &str) -> Result<SongId, ApplicationError> {
    SongId::parse(id).ok_or_else(|| ApplicationError::not_found("Song", id))
}

pub(crate) fn parse_session_id(id: &str) -> Result<SessionId, ApplicationError> {
    SessionId::parse(id).map_err(|_| ApplicationError::not_found("Session", id))
}

/// 加载点歌并确认所属场次未结束
///
/// 状态机不会级联场次结束，这里在应用层拒绝
pub(crate) async fn load_song_in_open_session(
    song_repo: &dyn SongRepositoryPort,
    session_repo: &dyn SessionRepositoryPort,
    song_id: &SongId,
) -> Result<Song, ApplicationError> {
    let song = song_repo
        .find_by_id(song_id)
        .await?
        .ok_or_else(|| ApplicationError::not_found("Song", song_id))?;

    let session = session_repo
        .find_by_id(&song.session_id)
        .await?
        .ok_or_else(|| ApplicationError::not_found("Session", &song.session_id))?;

    if session.status == SessionStatus::Ended {
        return Err(ApplicationError::SessionClosed(session.id.to_string()));
    }
    Ok(song)
}

/// 解析 DELAY 的分钟数
///
/// 分钟数非法且事件在当前状态下本就不可发送时，报告状态机的拒绝原因
pub(crate) async fn resolve_delay(
    registry: &dyn MachineRegistryPort,
    policy: &DelayPolicy,
    song_id: &SongId,
    minutes: Option<u32>,
) -> Result<DelayMinutes, ApplicationError> {
    match policy.resolve(minutes) {
        Ok(minutes) => Ok(minutes),
        Err(invalid) => {
            registry.check_song(song_id, SongEventKind::Delay).await?;
            Err(invalid)
        }
    }
}

/// 合并 EDIT 的部分字段
pub(crate) fn merge_details(
    current: &SongDetails,
    singer_name: Option<String>,
    artist: Option<String>,
    title: Option<String>,
) -> Result<SongDetails, ApplicationError> {
    SongDetails::new(
        singer_name.unwrap_or_else(|| current.singer_name().to_string()),
        artist.unwrap_or_else(|| current.artist().to_string()),
        title.unwrap_or_else(|| current.title().to_string()),
    )
    .map_err(ApplicationError::validation)
}

/// Transition Gateway
pub struct TransitionGateway {
    registry: Arc<dyn MachineRegistryPort>,
    song_repo: Arc<dyn SongRepositoryPort>,
    session_repo: Arc<dyn SessionRepositoryPort>,
    delay_policy: DelayPolicy,
}

impl TransitionGateway {
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

    /// 当前状态、上下文及各外部事件是否可用
    pub async fn get_state(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<MachineSnapshot, ApplicationError> {
        let snapshot = match kind {
            EntityKind::Song => self.registry.song_state(&parse_song_id(id)?).await?,
            EntityKind::Session => self.registry.session_state(&parse_session_id(id)?).await?,
        };
        Ok(snapshot)
    }

    /// 发送事件并返回新状态
    pub async fn transition(
        &self,
        kind: EntityKind,
        id: &str,
        event: &str,
        payload: EventPayload,
    ) -> Result<TransitionOutcome, ApplicationError> {
        let state = match kind {
            EntityKind::Song => {
                let song_id = parse_song_id(id)?;
                let event_kind = parse_song_event(event)?;
                let song = load_song_in_open_session(
                    self.song_repo.as_ref(),
                    self.session_repo.as_ref(),
                    &song_id,
                )
                .await?;
                let event = self.build_song_event(event_kind, &song, payload).await?;
                self.registry.send_song(&song_id, event).await?.to_string()
            }
            EntityKind::Session => {
                let session_id = parse_session_id(id)?;
                let event = build_session_event(parse_session_event(event)?, payload)?;
                self.registry
                    .send_session(&session_id, event)
                    .await?
                    .to_string()
            }
        };

        Ok(TransitionOutcome {
            success: true,
            state,
        })
    }

    /// 纯查询，不产生副作用
    pub async fn can_transition(
        &self,
        kind: EntityKind,
        id: &str,
        event: &str,
    ) -> Result<bool, ApplicationError> {
        match kind {
            EntityKind::Song => {
                let song_id = parse_song_id(id)?;
                let event_kind = parse_song_event(event)?;
                match load_song_in_open_session(
                    self.song_repo.as_ref(),
                    self.session_repo.as_ref(),
                    &song_id,
                )
                .await
                {
                    Ok(_) => Ok(self.registry.can_song(&song_id, event_kind).await?),
                    Err(ApplicationError::SessionClosed(_)) => Ok(false),
                    Err(e) => Err(e),
                }
            }
            EntityKind::Session => {
                let session_id = parse_session_id(id)?;
                let event_kind = parse_session_event(event)?;
                Ok(self.registry.can_session(&session_id, event_kind).await?)
            }
        }
    }

    async fn build_song_event(
        &self,
        kind: SongEventKind,
        song: &Song,
        payload: EventPayload,
    ) -> Result<SongEvent, ApplicationError> {
        let event = match kind {
            SongEventKind::Play => SongEvent::Play,
            SongEventKind::Skip => SongEvent::Skip,
            SongEventKind::Complete => SongEvent::Complete,
            SongEventKind::Delay => SongEvent::Delay(
                resolve_delay(
                    self.registry.as_ref(),
                    &self.delay_policy,
                    &song.id,
                    payload.minutes,
                )
                .await?,
            ),
            SongEventKind::Edit => SongEvent::Edit(merge_details(
                &song.details,
                payload.singer_name,
                payload.artist,
                payload.title,
            )?),
            SongEventKind::DelayExpired => {
                return Err(ApplicationError::validation(format!(
                    "Event {} is automatic and cannot be sent",
                    kind.as_str()
                )))
            }
        };
        Ok(event)
    }
}

fn parse_song_event(name: &str) -> Result<SongEventKind, ApplicationError> {
    let kind = name
        .parse::<SongEventKind>()
        .map_err(|e| ApplicationError::validation(e.to_string()))?;
    if kind.is_automatic() {
        return Err(ApplicationError::validation(format!(
            "Event {} is automatic and cannot be sent",
            kind.as_str()
        )));
    }
    Ok(kind)
}

fn parse_session_event(name: &str) -> Result<SessionEventKind, ApplicationError> {
    let kind = name
        .parse::<SessionEventKind>()
        .map_err(|e| ApplicationError::validation(e.to_string()))?;
    if kind.is_automatic() {
        return Err(ApplicationError::validation(format!(
            "Event {} is automatic and cannot be sent",
            kind.as_str()
        )));
    }
    Ok(kind)
}

fn build_session_event(
    kind: SessionEventKind,
    payload: EventPayload,
) -> Result<SessionEvent, ApplicationError> {
    let event = match kind {
        SessionEventKind::Pause => SessionEvent::Pause,
        SessionEventKind::Resume => SessionEvent::Resume,
        SessionEventKind::End => SessionEvent::End,
        SessionEventKind::CancelEnd => SessionEvent::CancelEnd,
        SessionEventKind::UpdateDuration => {
            let seconds = payload.song_duration_seconds.ok_or_else(|| {
                ApplicationError::validation("song_duration_seconds is required")
            })?;
            SessionEvent::UpdateDuration(
                SongDuration::new(seconds).map_err(ApplicationError::validation)?,
            )
        }
        SessionEventKind::UpdateTips => {
            let tips = payload
                .tip_handles
                .ok_or_else(|| ApplicationError::validation("tip_handles is required"))?;
            SessionEvent::UpdateTips(
                TipHandles::new(tips.venmo, tips.cashapp, tips.paypal)
                    .map_err(ApplicationError::validation)?,
            )
        }
        SessionEventKind::GraceExpired => {
            return Err(ApplicationError::validation(format!(
                "Event {} is automatic and cannot be sent",
                kind.as_str()
            )))
        }
    };
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::Session;
    use crate::infrastructure::memory::test_support::MemoryStore;
    use crate::infrastructure::memory::{ActorRegistry, RegistrySettings};

    async fn setup() -> (Arc<MemoryStore>, TransitionGateway, Session) {
        let store = Arc::new(MemoryStore::default());
        let registry = ActorRegistry::new(RegistrySettings::default(), store.clone(), store.clone());
        let gateway = TransitionGateway::new(
            Arc::new(registry),
            store.clone(),
            store.clone(),
            DelayPolicy::default(),
        );
        let session = store.insert_session();
        (store, gateway, session)
    }

    #[tokio::test]
    async fn test_example_queue_scenario() {
        let (store, gateway, session) = setup().await;
        let a = store.insert_song(&session.id, "A");
        let b = store.insert_song(&session.id, "B");
        store.insert_song(&session.id, "C");

        let err = gateway
            .transition(EntityKind::Song, &b.id.to_string(), "PLAY", EventPayload::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::GuardRejected { guard: "isNextInQueue", .. }
        ));

        let outcome = gateway
            .transition(EntityKind::Song, &a.id.to_string(), "PLAY", EventPayload::default())
            .await
            .unwrap();
        assert_eq!(outcome.state, "playing");

        gateway
            .transition(EntityKind::Song, &a.id.to_string(), "COMPLETE", EventPayload::default())
            .await
            .unwrap();

        let outcome = gateway
            .transition(EntityKind::Song, &b.id.to_string(), "play", EventPayload::default())
            .await
            .unwrap();
        assert_eq!(outcome.state, "playing");
    }

    #[tokio::test]
    async fn test_terminal_song_reports_no_available_events() {
        let (store, gateway, session) = setup().await;
        let a = store.insert_song(&session.id, "A");
        let id = a.id.to_string();

        for event in ["PLAY", "COMPLETE"] {
            gateway
                .transition(EntityKind::Song, &id, event, EventPayload::default())
                .await
                .unwrap();
        }

        let snapshot = gateway.get_state(EntityKind::Song, &id).await.unwrap();
        assert_eq!(snapshot.value, "done");
        assert_eq!(snapshot.can.get("play"), Some(&false));
        assert_eq!(snapshot.can.get("skip"), Some(&false));
        assert!(!gateway.can_transition(EntityKind::Song, &id, "SKIP").await.unwrap());
    }

    #[tokio::test]
    async fn test_song_transitions_rejected_after_session_ended() {
        let (store, gateway, session) = setup().await;
        let a = store.insert_song(&session.id, "A");
        store.set_session_status(&session.id, SessionStatus::Ended);

        let err = gateway
            .transition(EntityKind::Song, &a.id.to_string(), "PLAY", EventPayload::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::SessionClosed(_)));
        assert!(!gateway
            .can_transition(EntityKind::Song, &a.id.to_string(), "PLAY")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_unknown_and_automatic_events_are_rejected() {
        let (_store, gateway, session) = setup().await;
        let id = session.id.to_string();

        let err = gateway
            .transition(EntityKind::Session, &id, "DANCE", EventPayload::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::ValidationError(_)));

        let err = gateway
            .transition(EntityKind::Session, &id, "GRACE_EXPIRED", EventPayload::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let (_store, gateway, _session) = setup().await;

        let err = gateway
            .get_state(EntityKind::Song, "not-a-uuid")
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound { resource_type: "Song", .. }));

        let err = gateway
            .get_state(EntityKind::Session, "ZZZZZZ")
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound { resource_type: "Session", .. }));
    }

    #[tokio::test]
    async fn test_session_events_with_payload() {
        let (_store, gateway, session) = setup().await;
        let id = session.id.to_string();

        let payload = EventPayload {
            song_duration_seconds: Some(180),
            ..Default::default()
        };
        let outcome = gateway
            .transition(EntityKind::Session, &id, "UPDATE_DURATION", payload)
            .await
            .unwrap();
        assert_eq!(outcome.state, "active");

        let snapshot = gateway.get_state(EntityKind::Session, &id).await.unwrap();
        assert_eq!(snapshot.context["song_duration_seconds"], 180);

        let err = gateway
            .transition(EntityKind::Session, &id, "UPDATE_DURATION", EventPayload::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::ValidationError(_)));
    }

    #[test]
    fn test_delay_policy_bounds() {
        let policy = DelayPolicy::new(3, 10).unwrap();
        assert_eq!(policy.resolve(None).unwrap().minutes(), 3);
        assert_eq!(policy.resolve(Some(10)).unwrap().minutes(), 10);
        assert!(policy.resolve(Some(11)).is_err());
        assert!(policy.resolve(Some(0)).is_err());

        assert!(DelayPolicy::new(12, 10).is_err());
        assert_eq!(DelayPolicy::default().resolve(None).unwrap().minutes(), 5);
    }

    #[tokio::test]
    async fn test_edit_keeps_unspecified_fields() {
        let (store, gateway, session) = setup().await;
        let a = store.insert_song(&session.id, "A");

        let payload = EventPayload {
            title: Some("Dancing Queen".into()),
            ..Default::default()
        };
        gateway
            .transition(EntityKind::Song, &a.id.to_string(), "EDIT", payload)
            .await
            .unwrap();

        let stored = store.song(&a.id).unwrap();
        assert_eq!(stored.details.title(), "Dancing Queen");
        assert_eq!(stored.details.singer_name(), "A");
    }

    #[tokio::test]
    async fn test_delay_minutes_checked_after_state() {
        let (store, gateway, session) = setup().await;
        let a = store.insert_song(&session.id, "A");
        let too_long = || EventPayload {
            minutes: Some(31),
            ..Default::default()
        };
        let id = a.id.to_string();

        let err = gateway
            .transition(EntityKind::Song, &id, "DELAY", too_long())
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::ValidationError(_)));

        gateway
            .transition(EntityKind::Song, &id, "DELAY", EventPayload::default())
            .await
            .unwrap();
        let err = gateway
            .transition(EntityKind::Song, &id, "DELAY", too_long())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::GuardRejected { guard: "canBeDelayed", event: "DELAY" }
        ));

        gateway
            .transition(EntityKind::Song, &id, "SKIP", EventPayload::default())
            .await
            .unwrap();
        let err = gateway
            .transition(EntityKind::Song, &id, "DELAY", too_long())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::InvalidTransition { state: "skipped", event: "DELAY" }
        ));
    }
}
