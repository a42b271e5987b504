//! Song Context - 点歌生命周期状态机
//!
//! | From    | Event         | Guard          | To      |
//! |---------|---------------|----------------|---------|
//! | waiting | PLAY          | isNextInQueue  | playing |
//! | waiting | SKIP          |                | skipped |
//! | waiting | DELAY         | canBeDelayed   | delayed |
//! | waiting | EDIT          | canBeEdited    | waiting |
//! | delayed | DELAY_EXPIRED | (定时器)       | waiting |
//! | delayed | SKIP          |                | skipped |
//! | playing | COMPLETE      |                | done    |
//! | playing | SKIP          |                | skipped |

use chrono::{DateTime, Utc};

use super::{DelayMinutes, DelayWindow, Song, SongDetails, SongId, SongStatus};
use crate::domain::machine::{MachineError, TimerEffect, UnknownName};
use crate::domain::queue::QueueView;

pub const GUARD_IS_NEXT_IN_QUEUE: &str = "isNextInQueue";
pub const GUARD_CAN_BE_DELAYED: &str = "canBeDelayed";
pub const GUARD_SINGLE_PLAYING_SONG: &str = "singlePlayingSong";

/// 点歌事件名（不带负载）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SongEventKind {
    Play,
    Skip,
    Delay,
    Edit,
    /// 延后定时器触发，仅内部使用
    DelayExpired,
    Complete,
}

impl SongEventKind {
    /// 外部可发送的事件
    pub const EXTERNAL: [SongEventKind; 5] = [
        SongEventKind::Play,
        SongEventKind::Skip,
        SongEventKind::Delay,
        SongEventKind::Edit,
        SongEventKind::Complete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SongEventKind::Play => "PLAY",
            SongEventKind::Skip => "SKIP",
            SongEventKind::Delay => "DELAY",
            SongEventKind::Edit => "EDIT",
            SongEventKind::DelayExpired => "DELAY_EXPIRED",
            SongEventKind::Complete => "COMPLETE",
        }
    }

    /// 由定时器触发的事件
    pub fn is_automatic(&self) -> bool {
        matches!(self, SongEventKind::DelayExpired)
    }

    /// 守卫是否依赖当前队列
    pub fn needs_queue(&self) -> bool {
        matches!(self, SongEventKind::Play)
    }
}

impl std::str::FromStr for SongEventKind {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PLAY" => Ok(SongEventKind::Play),
            "SKIP" => Ok(SongEventKind::Skip),
            "DELAY" => Ok(SongEventKind::Delay),
            "EDIT" => Ok(SongEventKind::Edit),
            "DELAY_EXPIRED" => Ok(SongEventKind::DelayExpired),
            "COMPLETE" => Ok(SongEventKind::Complete),
            _ => Err(UnknownName::new("song event", s)),
        }
    }
}

/// 点歌事件
#[derive(Debug, Clone, PartialEq)]
pub enum SongEvent {
    Play,
    Skip,
    Delay(DelayMinutes),
    Edit(SongDetails),
    DelayExpired,
    Complete,
}

impl SongEvent {
    pub fn kind(&self) -> SongEventKind {
        match self {
            SongEvent::Play => SongEventKind::Play,
            SongEvent::Skip => SongEventKind::Skip,
            SongEvent::Delay(_) => SongEventKind::Delay,
            SongEvent::Edit(_) => SongEventKind::Edit,
            SongEvent::DelayExpired => SongEventKind::DelayExpired,
            SongEvent::Complete => SongEventKind::Complete,
        }
    }
}

/// 守卫求值时注入的只读查询能力
///
/// 队列视图必须在发送事件前刚刚从存储加载，不可缓存
pub struct SongGuards<'a> {
    queue: &'a (dyn QueueView + Sync),
    enforce_single_playing: bool,
}

impl<'a> SongGuards<'a> {
    pub fn new(queue: &'a (dyn QueueView + Sync), enforce_single_playing: bool) -> Self {
        Self {
            queue,
            enforce_single_playing,
        }
    }
}

/// 需要随状态一起持久化的上下文变化
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SongChanges {
    /// `Some(Some(_))` 写入延后字段，`Some(None)` 清空，`None` 不变
    pub delay: Option<Option<DelayWindow>>,
    pub details: Option<SongDetails>,
}

impl SongChanges {
    /// 强制写入完整的延后字段
    pub fn with_delay(mut self, delay: Option<DelayWindow>) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// 一次已通过守卫、尚未提交的迁移
#[derive(Debug, Clone, PartialEq)]
pub struct SongTransition {
    pub from: SongStatus,
    pub machine: SongMachine,
    pub changes: SongChanges,
    pub timer: TimerEffect,
}

/// 点歌状态机快照
///
/// `send` 不修改自身，成功时返回下一个快照，由调用方在持久化成功后替换
#[derive(Debug, Clone, PartialEq)]
pub struct SongMachine {
    song_id: SongId,
    state: SongStatus,
    delay: Option<DelayWindow>,
}

impl SongMachine {
    /// 从持久化的点歌恢复状态机
    pub fn from_song(song: &Song) -> Self {
        Self {
            song_id: song.id.clone(),
            state: song.status,
            delay: song.delay,
        }
    }

    pub fn song_id(&self) -> &SongId {
        &self.song_id
    }

    pub fn state(&self) -> SongStatus {
        self.state
    }

    pub fn delay(&self) -> Option<DelayWindow> {
        self.delay
    }

    fn target(&self, kind: SongEventKind, guards: &SongGuards<'_>) -> Result<SongStatus, MachineError> {
        use SongEventKind as E;
        use SongStatus as S;

        let event = kind.as_str();
        match (self.state, kind) {
            (S::Waiting, E::Play) => {
                if guards.queue.next_playable() != Some(&self.song_id) {
                    return Err(MachineError::guard(GUARD_IS_NEXT_IN_QUEUE, event));
                }
                if guards.enforce_single_playing && guards.queue.has_playing_except(&self.song_id) {
                    return Err(MachineError::guard(GUARD_SINGLE_PLAYING_SONG, event));
                }
                Ok(S::Playing)
            }
            (S::Waiting, E::Skip) | (S::Delayed, E::Skip) | (S::Playing, E::Skip) => Ok(S::Skipped),
            (S::Waiting, E::Delay) if self.delay.is_none() => Ok(S::Delayed),
            (S::Waiting, E::Delay) | (S::Delayed, E::Delay) => {
                Err(MachineError::guard(GUARD_CAN_BE_DELAYED, event))
            }
            (S::Waiting, E::Edit) => Ok(S::Waiting),
            (S::Delayed, E::DelayExpired) => Ok(S::Waiting),
            (S::Playing, E::Complete) => Ok(S::Done),
            (state, _) => Err(MachineError::invalid(state.as_str(), event)),
        }
    }

    /// 纯查询，不产生副作用
    pub fn can(&self, kind: SongEventKind, guards: &SongGuards<'_>) -> bool {
        self.check(kind, guards).is_ok()
    }

    /// 与 `can` 相同，但保留拒绝原因
    pub fn check(&self, kind: SongEventKind, guards: &SongGuards<'_>) -> Result<(), MachineError> {
        self.target(kind, guards).map(|_| ())
    }

    pub fn send(
        &self,
        event: SongEvent,
        now: DateTime<Utc>,
        guards: &SongGuards<'_>,
    ) -> Result<SongTransition, MachineError> {
        let to = self.target(event.kind(), guards)?;

        let mut next = self.clone();
        next.state = to;
        let mut changes = SongChanges::default();
        let mut timer = TimerEffect::None;

        match event {
            SongEvent::Delay(minutes) => {
                let window = DelayWindow::starting_at(now, minutes);
                next.delay = Some(window);
                changes.delay = Some(Some(window));
                timer = TimerEffect::Schedule(window.remaining(now));
            }
            SongEvent::Edit(details) => {
                changes.details = Some(details);
            }
            _ => {}
        }

        // 任何离开 delayed 的路径都清空延后字段并取消定时器
        if self.state == SongStatus::Delayed && to != SongStatus::Delayed {
            next.delay = None;
            changes.delay = Some(None);
            timer = TimerEffect::Cancel;
        }

        Ok(SongTransition {
            from: self.state,
            machine: next,
            changes,
            timer,
        })
    }
}
