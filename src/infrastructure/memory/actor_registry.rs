//! In-Memory Actor Registry Implementation
//!
//! 每个实体 ID 一个槽位（tokio Mutex，FIFO），同一实体的
//! "求值守卫 -> 迁移 -> 持久化" 在锁内完成，不会交错
//!
//! 槽位状态:
//! - Vacant: 刚创建，持锁者正在加载
//! - Live: 缓存的状态机实例
//! - Evicted: 已移出注册表，等待者需重新获取槽位

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::json;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    MachineRegistryPort, MachineSnapshot, RegistryError, SessionRepositoryPort,
    SongRepositoryPort,
};
use crate::domain::machine::{EntityKind, MachineError, TimerEffect};
use crate::domain::queue::{QueueSnapshot, QueueView};
use crate::domain::session::{
    SessionChanges, SessionEvent, SessionEventKind, SessionId, SessionMachine, SessionStatus,
    SessionTransition, DEFAULT_GRACE_PERIOD,
};
use crate::domain::song::{
    SongChanges, SongEvent, SongEventKind, SongGuards, SongId, SongMachine, SongStatus,
    SongTransition,
};

/// 注册表配置
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    /// 场次结束宽限期
    pub grace_period: Duration,
    /// 同一场次是否只允许一首 playing
    pub enforce_single_playing: bool,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            enforce_single_playing: false,
        }
    }
}

/// 已调度的定时器，drop 时取消
struct ScheduledTimer {
    generation: u64,
    cancel: CancellationToken,
}

impl Drop for ScheduledTimer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct SongActor {
    machine: SongMachine,
    session_id: SessionId,
    timer: Option<ScheduledTimer>,
    /// 定时迁移已生效但尚未写入存储
    unpersisted: bool,
}

struct SessionActor {
    machine: SessionMachine,
    timer: Option<ScheduledTimer>,
    unpersisted: bool,
}

enum Slot<A> {
    Vacant,
    Live(A),
    Evicted,
}

type SlotMap<K, A> = DashMap<K, Arc<Mutex<Slot<A>>>>;
type SlotGuard<A> = OwnedMutexGuard<Slot<A>>;

/// 获取实体槽位的锁，槽位已被移除时重试
async fn lock_slot<K, A>(map: &SlotMap<K, A>, key: &K) -> SlotGuard<A>
where
    K: Eq + Hash + Clone,
{
    loop {
        let slot = map
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Slot::Vacant)))
            .value()
            .clone();
        let guard = slot.lock_owned().await;
        if !matches!(*guard, Slot::Evicted) {
            return guard;
        }
    }
}

fn take<A>(guard: &mut SlotGuard<A>) -> Option<A> {
    match std::mem::replace(&mut **guard, Slot::Vacant) {
        Slot::Live(actor) => Some(actor),
        _ => None,
    }
}

/// 放回实例；`None` 表示销毁并从注册表移除
fn release<K, A>(map: &SlotMap<K, A>, key: &K, mut guard: SlotGuard<A>, actor: Option<A>)
where
    K: Eq + Hash,
{
    match actor {
        Some(actor) => *guard = Slot::Live(actor),
        None => {
            *guard = Slot::Evicted;
            let slot = OwnedMutexGuard::mutex(&guard).clone();
            map.remove_if(key, |_, v| Arc::ptr_eq(v, &slot));
        }
    }
}

struct RegistryInner {
    settings: RegistrySettings,
    song_repo: Arc<dyn SongRepositoryPort>,
    session_repo: Arc<dyn SessionRepositoryPort>,
    songs: SlotMap<SongId, SongActor>,
    sessions: SlotMap<SessionId, SessionActor>,
    generation: AtomicU64,
}

/// 内存状态机注册表
///
/// 克隆代价很低，定时器任务持有一份克隆用于回调
#[derive(Clone)]
pub struct ActorRegistry {
    inner: Arc<RegistryInner>,
}

impl ActorRegistry {
    pub fn new(
        settings: RegistrySettings,
        song_repo: Arc<dyn SongRepositoryPort>,
        session_repo: Arc<dyn SessionRepositoryPort>,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                settings,
                song_repo,
                session_repo,
                songs: DashMap::new(),
                sessions: DashMap::new(),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 当前缓存的实例数
    pub fn cached_count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Song => self.inner.songs.len(),
            EntityKind::Session => self.inner.sessions.len(),
        }
    }

    /// 启动恢复：为存储中 ending 的场次和 delayed 的点歌重新挂上定时器
    ///
    /// 返回 (场次数, 点歌数)；已结束场次内的 delayed 点歌保持原样
    pub async fn recover(&self) -> Result<(usize, usize), RegistryError> {
        let sessions = self
            .inner
            .session_repo
            .find_by_status(SessionStatus::Ending)
            .await
            .map_err(RegistryError::Storage)?;
        let mut recovered_sessions = 0;
        for session in &sessions {
            match self.checkout_session(&session.id).await {
                Ok((guard, actor)) => {
                    self.checkin_session(&session.id, guard, actor);
                    recovered_sessions += 1;
                }
                Err(e) => {
                    tracing::warn!(session_id = %session.id, error = %e, "Failed to recover session timer");
                }
            }
        }

        let songs = self
            .inner
            .song_repo
            .find_by_status(SongStatus::Delayed)
            .await
            .map_err(RegistryError::Storage)?;
        let mut closed: HashMap<SessionId, bool> = HashMap::new();
        let mut recovered_songs = 0;
        for song in &songs {
            let is_closed = match closed.get(&song.session_id) {
                Some(is_closed) => *is_closed,
                None => {
                    let is_closed = self
                        .inner
                        .session_repo
                        .find_by_id(&song.session_id)
                        .await
                        .map_err(RegistryError::Storage)?
                        .map_or(true, |s| s.status == SessionStatus::Ended);
                    closed.insert(song.session_id.clone(), is_closed);
                    is_closed
                }
            };
            if is_closed {
                continue;
            }

            match self.checkout_song(&song.id).await {
                Ok((guard, actor)) => {
                    self.checkin_song(&song.id, guard, actor);
                    recovered_songs += 1;
                }
                Err(e) => {
                    tracing::warn!(song_id = %song.id, error = %e, "Failed to recover delay timer");
                }
            }
        }

        tracing::info!(
            sessions = recovered_sessions,
            songs = recovered_songs,
            "Pending timers recovered"
        );
        Ok((recovered_sessions, recovered_songs))
    }

    fn next_generation(&self) -> u64 {
        self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    // ========================================================================
    // Song actors
    // ========================================================================

    async fn load_song_actor(&self, id: &SongId) -> Result<SongActor, RegistryError> {
        let song = self
            .inner
            .song_repo
            .find_by_id(id)
            .await
            .map_err(RegistryError::Storage)?
            .ok_or_else(|| RegistryError::not_found(EntityKind::Song, id))?;

        let machine = SongMachine::from_song(&song);
        let timer = if machine.state() == SongStatus::Delayed {
            let remaining = machine
                .delay()
                .map(|d| d.remaining(Utc::now()))
                .unwrap_or_default();
            Some(self.schedule_song_timer(id, remaining))
        } else {
            None
        };

        tracing::debug!(song_id = %id, state = %machine.state(), "Song actor created");
        Ok(SongActor {
            machine,
            session_id: song.session_id,
            timer,
            unpersisted: false,
        })
    }

    async fn checkout_song(
        &self,
        id: &SongId,
    ) -> Result<(SlotGuard<SongActor>, SongActor), RegistryError> {
        let mut guard = lock_slot(&self.inner.songs, id).await;
        let mut actor = match take(&mut guard) {
            Some(actor) => actor,
            None => match self.load_song_actor(id).await {
                Ok(actor) => actor,
                Err(e) => {
                    release(&self.inner.songs, id, guard, None);
                    return Err(e);
                }
            },
        };

        if actor.unpersisted {
            self.reconcile_song(id, &mut actor).await;
        }
        Ok((guard, actor))
    }

    fn checkin_song(&self, id: &SongId, guard: SlotGuard<SongActor>, actor: SongActor) {
        if actor.machine.state().is_terminal() && !actor.unpersisted {
            tracing::debug!(song_id = %id, "Song actor evicted");
            release(&self.inner.songs, id, guard, None);
        } else {
            release(&self.inner.songs, id, guard, Some(actor));
        }
    }

    /// 重新写入之前失败的定时迁移
    async fn reconcile_song(&self, id: &SongId, actor: &mut SongActor) {
        let changes = SongChanges::default().with_delay(actor.machine.delay());
        match self
            .inner
            .song_repo
            .persist_status(id, actor.machine.state(), &changes)
            .await
        {
            Ok(()) => {
                actor.unpersisted = false;
                tracing::info!(song_id = %id, state = %actor.machine.state(), "Song state reconciled");
            }
            Err(e) => {
                tracing::warn!(song_id = %id, error = %e, "Song state still unpersisted");
            }
        }
    }

    async fn load_queue(&self, session_id: &SessionId) -> Result<QueueSnapshot, RegistryError> {
        let songs = self
            .inner
            .song_repo
            .find_by_session(session_id)
            .await
            .map_err(RegistryError::Storage)?;
        Ok(QueueSnapshot::from_songs(&songs))
    }

    async fn apply_song_event(
        &self,
        id: &SongId,
        actor: &mut SongActor,
        event: SongEvent,
    ) -> Result<SongStatus, RegistryError> {
        let kind = event.kind();
        // 守卫所需的队列每次都重新加载
        let queue = if kind.needs_queue() {
            self.load_queue(&actor.session_id).await?
        } else {
            QueueSnapshot::default()
        };
        let guards = SongGuards::new(&queue, self.inner.settings.enforce_single_playing);

        let transition = actor
            .machine
            .send(event, Utc::now(), &guards)
            .map_err(|e| {
                tracing::info!(song_id = %id, event = kind.as_str(), error = %e, "Song event rejected");
                e
            })?;

        let mut changes = transition.changes.clone();
        if actor.unpersisted {
            changes = changes.with_delay(transition.machine.delay());
        }
        self.inner
            .song_repo
            .persist_status(id, transition.machine.state(), &changes)
            .await
            .map_err(|e| {
                tracing::error!(song_id = %id, event = kind.as_str(), error = %e, "Failed to persist song transition");
                RegistryError::Persistence(e)
            })?;

        self.commit_song(id, actor, transition);
        Ok(actor.machine.state())
    }

    fn commit_song(&self, id: &SongId, actor: &mut SongActor, transition: SongTransition) {
        match transition.timer {
            TimerEffect::Schedule(delay) => {
                actor.timer = Some(self.schedule_song_timer(id, delay));
            }
            TimerEffect::Cancel => actor.timer = None,
            TimerEffect::None => {}
        }

        tracing::info!(
            song_id = %id,
            from = %transition.from,
            to = %transition.machine.state(),
            "Song transitioned"
        );
        actor.machine = transition.machine;
        actor.unpersisted = false;
    }

    fn schedule_song_timer(&self, id: &SongId, delay: Duration) -> ScheduledTimer {
        let generation = self.next_generation();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let registry = self.clone();
        let id = id.clone();

        tracing::debug!(song_id = %id, delay_secs = delay.as_secs(), "Delay timer scheduled");
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => registry.fire_song_timer(&id, generation).await,
            }
        });

        ScheduledTimer { generation, cancel }
    }

    async fn fire_song_timer(&self, id: &SongId, generation: u64) {
        let mut guard = lock_slot(&self.inner.songs, id).await;
        let Some(mut actor) = take(&mut guard) else {
            release(&self.inner.songs, id, guard, None);
            return;
        };

        // 定时器已被替换或取消（例如 SKIP 先拿到了锁）
        if actor.timer.as_ref().map(|t| t.generation) != Some(generation) {
            self.checkin_song(id, guard, actor);
            return;
        }
        actor.timer = None;

        let queue = QueueSnapshot::default();
        let guards = SongGuards::new(&queue, false);
        match actor.machine.send(SongEvent::DelayExpired, Utc::now(), &guards) {
            Ok(transition) => {
                let persisted = self
                    .inner
                    .song_repo
                    .persist_status(id, transition.machine.state(), &transition.changes)
                    .await;
                tracing::info!(song_id = %id, "Song delay expired");
                actor.machine = transition.machine;
                actor.unpersisted = match persisted {
                    Ok(()) => false,
                    Err(e) => {
                        tracing::error!(song_id = %id, error = %e, "Failed to persist delay expiry, keeping in-memory state");
                        true
                    }
                };
            }
            Err(e) => {
                tracing::warn!(song_id = %id, error = %e, "Delay timer fired in unexpected state");
            }
        }

        self.checkin_song(id, guard, actor);
    }

    fn song_snapshot(&self, id: &SongId, actor: &SongActor, queue: &QueueSnapshot) -> MachineSnapshot {
        let guards = SongGuards::new(queue, self.inner.settings.enforce_single_playing);
        let can = SongEventKind::EXTERNAL
            .iter()
            .map(|kind| {
                (
                    kind.as_str().to_ascii_lowercase(),
                    actor.machine.can(*kind, &guards),
                )
            })
            .collect();
        let delay = actor.machine.delay();

        MachineSnapshot {
            value: actor.machine.state().as_str().to_string(),
            context: json!({
                "song_id": id.to_string(),
                "session_id": actor.session_id.as_str(),
                "position": queue.position_of(id),
                "delayed_until": delay.map(|d| d.until.to_rfc3339()),
                "delay_minutes": delay.map(|d| d.minutes.minutes()),
                "is_next_in_queue": queue.next_playable() == Some(id),
            }),
            can,
        }
    }

    /// 场次结束后移除其名下缓存的点歌实例（同时取消延后定时器）
    ///
    /// 调用方不得持有任何槽位锁
    async fn evict_session_songs(&self, session_id: &SessionId) {
        let slots: Vec<(SongId, Arc<Mutex<Slot<SongActor>>>)> = self
            .inner
            .songs
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        let mut evicted = 0;
        for (id, slot) in slots {
            let mut guard = slot.lock_owned().await;
            let owned = matches!(
                &*guard,
                Slot::Live(actor) if &actor.session_id == session_id && !actor.unpersisted
            );
            if !owned {
                continue;
            }
            let _ = take(&mut guard);
            release(&self.inner.songs, &id, guard, None);
            evicted += 1;
        }

        if evicted > 0 {
            tracing::debug!(session_id = %session_id, songs = evicted, "Song actors of ended session evicted");
        }
    }

    // ========================================================================
    // Session actors
    // ========================================================================

    async fn load_session_actor(&self, id: &SessionId) -> Result<SessionActor, RegistryError> {
        let session = self
            .inner
            .session_repo
            .find_by_id(id)
            .await
            .map_err(RegistryError::Storage)?
            .ok_or_else(|| RegistryError::not_found(EntityKind::Session, id))?;

        let machine = SessionMachine::new(&session, self.inner.settings.grace_period);
        // 进程重启后宽限期重新计时
        let timer = if machine.state() == SessionStatus::Ending {
            Some(self.schedule_session_timer(id, machine.grace_period()))
        } else {
            None
        };

        tracing::debug!(session_id = %id, state = %machine.state(), "Session actor created");
        Ok(SessionActor {
            machine,
            timer,
            unpersisted: false,
        })
    }

    async fn checkout_session(
        &self,
        id: &SessionId,
    ) -> Result<(SlotGuard<SessionActor>, SessionActor), RegistryError> {
        let mut guard = lock_slot(&self.inner.sessions, id).await;
        let mut actor = match take(&mut guard) {
            Some(actor) => actor,
            None => match self.load_session_actor(id).await {
                Ok(actor) => actor,
                Err(e) => {
                    release(&self.inner.sessions, id, guard, None);
                    return Err(e);
                }
            },
        };

        if actor.unpersisted {
            self.reconcile_session(id, &mut actor).await;
        }
        Ok((guard, actor))
    }

    fn checkin_session(&self, id: &SessionId, guard: SlotGuard<SessionActor>, actor: SessionActor) {
        if actor.machine.state().is_terminal() && !actor.unpersisted {
            tracing::debug!(session_id = %id, "Session actor evicted");
            release(&self.inner.sessions, id, guard, None);
        } else {
            release(&self.inner.sessions, id, guard, Some(actor));
        }
    }

    async fn reconcile_session(&self, id: &SessionId, actor: &mut SessionActor) {
        let changes = SessionChanges {
            song_duration: Some(actor.machine.song_duration()),
            tips: Some(actor.machine.tips().clone()),
        };
        match self
            .inner
            .session_repo
            .persist_status(id, actor.machine.state(), &changes)
            .await
        {
            Ok(()) => {
                actor.unpersisted = false;
                tracing::info!(session_id = %id, state = %actor.machine.state(), "Session state reconciled");
            }
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Session state still unpersisted");
            }
        }
    }

    async fn apply_session_event(
        &self,
        id: &SessionId,
        actor: &mut SessionActor,
        event: SessionEvent,
    ) -> Result<SessionStatus, RegistryError> {
        let kind = event.kind();
        let transition = actor.machine.send(event).map_err(|e| {
            tracing::info!(session_id = %id, event = kind.as_str(), error = %e, "Session event rejected");
            e
        })?;

        self.inner
            .session_repo
            .persist_status(id, transition.machine.state(), &transition.changes)
            .await
            .map_err(|e| {
                tracing::error!(session_id = %id, event = kind.as_str(), error = %e, "Failed to persist session transition");
                RegistryError::Persistence(e)
            })?;

        self.commit_session(id, actor, transition);
        Ok(actor.machine.state())
    }

    fn commit_session(&self, id: &SessionId, actor: &mut SessionActor, transition: SessionTransition) {
        match transition.timer {
            TimerEffect::Schedule(delay) => {
                actor.timer = Some(self.schedule_session_timer(id, delay));
            }
            TimerEffect::Cancel => actor.timer = None,
            TimerEffect::None => {}
        }

        tracing::info!(
            session_id = %id,
            from = %transition.from,
            to = %transition.machine.state(),
            "Session transitioned"
        );
        actor.machine = transition.machine;
        actor.unpersisted = false;
    }

    fn schedule_session_timer(&self, id: &SessionId, delay: Duration) -> ScheduledTimer {
        let generation = self.next_generation();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let registry = self.clone();
        let id = id.clone();

        tracing::debug!(session_id = %id, delay_ms = delay.as_millis() as u64, "Grace timer scheduled");
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => registry.fire_session_timer(&id, generation).await,
            }
        });

        ScheduledTimer { generation, cancel }
    }

    async fn fire_session_timer(&self, id: &SessionId, generation: u64) {
        let mut guard = lock_slot(&self.inner.sessions, id).await;
        let Some(mut actor) = take(&mut guard) else {
            release(&self.inner.sessions, id, guard, None);
            return;
        };

        // CANCEL_END 先拿到锁时定时器已失效
        if actor.timer.as_ref().map(|t| t.generation) != Some(generation) {
            self.checkin_session(id, guard, actor);
            return;
        }
        actor.timer = None;

        match actor.machine.send(SessionEvent::GraceExpired) {
            Ok(transition) => {
                let persisted = self
                    .inner
                    .session_repo
                    .persist_status(id, transition.machine.state(), &transition.changes)
                    .await;
                tracing::info!(session_id = %id, "Session grace period expired");
                actor.machine = transition.machine;
                actor.unpersisted = match persisted {
                    Ok(()) => false,
                    Err(e) => {
                        tracing::error!(session_id = %id, error = %e, "Failed to persist session end, keeping in-memory state");
                        true
                    }
                };
            }
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Grace timer fired in unexpected state");
            }
        }

        let ended = actor.machine.state() == SessionStatus::Ended;
        self.checkin_session(id, guard, actor);
        if ended {
            self.evict_session_songs(id).await;
        }
    }

    fn session_snapshot(&self, id: &SessionId, actor: &SessionActor) -> MachineSnapshot {
        let can = SessionEventKind::EXTERNAL
            .iter()
            .map(|kind| (kind.as_str().to_ascii_lowercase(), actor.machine.can(*kind)))
            .collect();
        let tips = actor.machine.tips();

        MachineSnapshot {
            value: actor.machine.state().as_str().to_string(),
            context: json!({
                "session_id": id.as_str(),
                "song_duration_seconds": actor.machine.song_duration().seconds(),
                "tip_handles": {
                    "venmo": tips.venmo,
                    "cashapp": tips.cashapp,
                    "paypal": tips.paypal,
                },
                "grace_period_secs": actor.machine.grace_period().as_secs_f64(),
            }),
            can,
        }
    }
}

#[async_trait]
impl MachineRegistryPort for ActorRegistry {
    async fn song_state(&self, id: &SongId) -> Result<MachineSnapshot, RegistryError> {
        let (guard, actor) = self.checkout_song(id).await?;
        let result = self
            .load_queue(&actor.session_id)
            .await
            .map(|queue| self.song_snapshot(id, &actor, &queue));
        self.checkin_song(id, guard, actor);
        result
    }

    async fn session_state(&self, id: &SessionId) -> Result<MachineSnapshot, RegistryError> {
        let (guard, actor) = self.checkout_session(id).await?;
        let snapshot = self.session_snapshot(id, &actor);
        self.checkin_session(id, guard, actor);
        Ok(snapshot)
    }

    async fn send_song(&self, id: &SongId, event: SongEvent) -> Result<SongStatus, RegistryError> {
        let (guard, mut actor) = self.checkout_song(id).await?;
        let result = self.apply_song_event(id, &mut actor, event).await;
        self.checkin_song(id, guard, actor);
        result
    }

    async fn send_session(
        &self,
        id: &SessionId,
        event: SessionEvent,
    ) -> Result<SessionStatus, RegistryError> {
        let (guard, mut actor) = self.checkout_session(id).await?;
        let result = self.apply_session_event(id, &mut actor, event).await;
        self.checkin_session(id, guard, actor);
        if matches!(result, Ok(SessionStatus::Ended)) {
            self.evict_session_songs(id).await;
        }
        result
    }

    async fn can_song(&self, id: &SongId, kind: SongEventKind) -> Result<bool, RegistryError> {
        match self.check_song(id, kind).await {
            Ok(()) => Ok(true),
            Err(RegistryError::Rejected(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn check_song(&self, id: &SongId, kind: SongEventKind) -> Result<(), RegistryError> {
        let (guard, actor) = self.checkout_song(id).await?;
        let result = if kind.needs_queue() {
            self.load_queue(&actor.session_id).await
        } else {
            Ok(QueueSnapshot::default())
        }
        .and_then(|queue| {
            let guards = SongGuards::new(&queue, self.inner.settings.enforce_single_playing);
            actor.machine.check(kind, &guards).map_err(RegistryError::from)
        });
        self.checkin_song(id, guard, actor);
        result
    }

    async fn can_session(
        &self,
        id: &SessionId,
        kind: SessionEventKind,
    ) -> Result<bool, RegistryError> {
        let (guard, actor) = self.checkout_session(id).await?;
        let can = actor.machine.can(kind);
        self.checkin_session(id, guard, actor);
        Ok(can)
    }

    async fn delete_song(&self, id: &SongId, only_if_waiting: bool) -> Result<(), RegistryError> {
        let (guard, actor) = self.checkout_song(id).await?;

        let state = actor.machine.state();
        if only_if_waiting && state != SongStatus::Waiting {
            self.checkin_song(id, guard, actor);
            return Err(MachineError::invalid(state.as_str(), "CANCEL").into());
        }

        match self.inner.song_repo.delete(id).await {
            Ok(_) => {
                // actor 随之销毁，定时器同时取消
                drop(actor);
                release(&self.inner.songs, id, guard, None);
                tracing::info!(song_id = %id, state = %state, "Song deleted");
                Ok(())
            }
            Err(e) => {
                tracing::error!(song_id = %id, error = %e, "Failed to delete song");
                self.checkin_song(id, guard, actor);
                Err(RegistryError::Persistence(e))
            }
        }
    }

    async fn evict(&self, kind: EntityKind, id: &str) {
        match kind {
            EntityKind::Song => {
                let Some(id) = SongId::parse(id) else {
                    return;
                };
                if !self.inner.songs.contains_key(&id) {
                    return;
                }
                let mut guard = lock_slot(&self.inner.songs, &id).await;
                let _ = take(&mut guard);
                release(&self.inner.songs, &id, guard, None);
                tracing::debug!(song_id = %id, "Song actor evicted manually");
            }
            EntityKind::Session => {
                let Ok(id) = SessionId::parse(id) else {
                    return;
                };
                if !self.inner.sessions.contains_key(&id) {
                    return;
                }
                let mut guard = lock_slot(&self.inner.sessions, &id).await;
                let _ = take(&mut guard);
                release(&self.inner.sessions, &id, guard, None);
                tracing::debug!(session_id = %id, "Session actor evicted manually");
            }
        }
    }

    async fn shutdown(&self) {
        let song_ids: Vec<SongId> = self.inner.songs.iter().map(|e| e.key().clone()).collect();
        for id in &song_ids {
            let mut guard = lock_slot(&self.inner.songs, id).await;
            if let Some(actor) = take(&mut guard) {
                if actor.unpersisted {
                    tracing::warn!(song_id = %id, state = %actor.machine.state(), "Dropping unpersisted song state");
                }
            }
            release(&self.inner.songs, id, guard, None);
        }

        let session_ids: Vec<SessionId> =
            self.inner.sessions.iter().map(|e| e.key().clone()).collect();
        for id in &session_ids {
            let mut guard = lock_slot(&self.inner.sessions, id).await;
            if let Some(actor) = take(&mut guard) {
                if actor.unpersisted {
                    tracing::warn!(session_id = %id, state = %actor.machine.state(), "Dropping unpersisted session state");
                }
            }
            release(&self.inner.sessions, id, guard, None);
        }

        tracing::info!(
            songs = song_ids.len(),
            sessions = session_ids.len(),
            "Actor registry shut down"
        );
    }
}
