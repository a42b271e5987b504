//! Session Context - 场次生命周期状态机
//!
//! ```text
//! active --PAUSE--> paused --RESUME--> active
//! active|paused --END--> ending --CANCEL_END--> active
//! ending --(宽限期到期)--> ended
//! active --UPDATE_DURATION|UPDATE_TIPS--> active
//! ```

use std::time::Duration;

use super::{Session, SessionStatus, SongDuration, TipHandles};
use crate::domain::machine::{MachineError, TimerEffect, UnknownName};

/// 结束宽限期默认值
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// 场次事件名（不带负载）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEventKind {
    Pause,
    Resume,
    End,
    CancelEnd,
    /// 宽限期定时器触发，仅内部使用
    GraceExpired,
    UpdateDuration,
    UpdateTips,
}

impl SessionEventKind {
    /// 外部可发送的事件
    pub const EXTERNAL: [SessionEventKind; 6] = [
        SessionEventKind::Pause,
        SessionEventKind::Resume,
        SessionEventKind::End,
        SessionEventKind::CancelEnd,
        SessionEventKind::UpdateDuration,
        SessionEventKind::UpdateTips,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionEventKind::Pause => "PAUSE",
            SessionEventKind::Resume => "RESUME",
            SessionEventKind::End => "END",
            SessionEventKind::CancelEnd => "CANCEL_END",
            SessionEventKind::GraceExpired => "GRACE_EXPIRED",
            SessionEventKind::UpdateDuration => "UPDATE_DURATION",
            SessionEventKind::UpdateTips => "UPDATE_TIPS",
        }
    }

    /// 由定时器触发的事件
    pub fn is_automatic(&self) -> bool {
        matches!(self, SessionEventKind::GraceExpired)
    }
}

impl std::str::FromStr for SessionEventKind {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PAUSE" => Ok(SessionEventKind::Pause),
            "RESUME" => Ok(SessionEventKind::Resume),
            "END" => Ok(SessionEventKind::End),
            "CANCEL_END" => Ok(SessionEventKind::CancelEnd),
            "GRACE_EXPIRED" => Ok(SessionEventKind::GraceExpired),
            "UPDATE_DURATION" => Ok(SessionEventKind::UpdateDuration),
            "UPDATE_TIPS" => Ok(SessionEventKind::UpdateTips),
            _ => Err(UnknownName::new("session event", s)),
        }
    }
}

/// 场次事件
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Pause,
    Resume,
    End,
    CancelEnd,
    GraceExpired,
    UpdateDuration(SongDuration),
    UpdateTips(TipHandles),
}

impl SessionEvent {
    pub fn kind(&self) -> SessionEventKind {
        match self {
            SessionEvent::Pause => SessionEventKind::Pause,
            SessionEvent::Resume => SessionEventKind::Resume,
            SessionEvent::End => SessionEventKind::End,
            SessionEvent::CancelEnd => SessionEventKind::CancelEnd,
            SessionEvent::GraceExpired => SessionEventKind::GraceExpired,
            SessionEvent::UpdateDuration(_) => SessionEventKind::UpdateDuration,
            SessionEvent::UpdateTips(_) => SessionEventKind::UpdateTips,
        }
    }
}

/// 需要随状态一起持久化的上下文变化
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionChanges {
    pub song_duration: Option<SongDuration>,
    pub tips: Option<TipHandles>,
}

/// 一次已通过校验、尚未提交的迁移
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTransition {
    pub from: SessionStatus,
    pub machine: SessionMachine,
    pub changes: SessionChanges,
    pub timer: TimerEffect,
}

/// 场次状态机快照
///
/// `send` 不修改自身，成功时返回下一个快照，由调用方在持久化成功后替换
#[derive(Debug, Clone, PartialEq)]
pub struct SessionMachine {
    state: SessionStatus,
    song_duration: SongDuration,
    tips: TipHandles,
    grace_period: Duration,
}

impl SessionMachine {
    /// 从持久化的场次恢复状态机
    pub fn new(session: &Session, grace_period: Duration) -> Self {
        Self {
            state: session.status,
            song_duration: session.song_duration,
            tips: session.tips.clone(),
            grace_period,
        }
    }

    pub fn state(&self) -> SessionStatus {
        self.state
    }

    pub fn song_duration(&self) -> SongDuration {
        self.song_duration
    }

    pub fn tips(&self) -> &TipHandles {
        &self.tips
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// 事件在当前状态下的目标状态
    fn target(&self, kind: SessionEventKind) -> Result<SessionStatus, MachineError> {
        use SessionEventKind as E;
        use SessionStatus as S;

        match (self.state, kind) {
            (S::Active, E::Pause) => Ok(S::Paused),
            (S::Active, E::End) => Ok(S::Ending),
            (S::Active, E::UpdateDuration) | (S::Active, E::UpdateTips) => Ok(S::Active),
            (S::Paused, E::Resume) => Ok(S::Active),
            (S::Paused, E::End) => Ok(S::Ending),
            (S::Ending, E::CancelEnd) => Ok(S::Active),
            (S::Ending, E::GraceExpired) => Ok(S::Ended),
            (state, kind) => Err(MachineError::invalid(state.as_str(), kind.as_str())),
        }
    }

    /// 纯查询，不产生副作用
    pub fn can(&self, kind: SessionEventKind) -> bool {
        self.target(kind).is_ok()
    }

    pub fn send(&self, event: SessionEvent) -> Result<SessionTransition, MachineError> {
        let to = self.target(event.kind())?;

        let mut next = self.clone();
        next.state = to;
        let mut changes = SessionChanges::default();
        match event {
            SessionEvent::UpdateDuration(duration) => {
                next.song_duration = duration;
                changes.song_duration = Some(duration);
            }
            SessionEvent::UpdateTips(tips) => {
                next.tips = tips.clone();
                changes.tips = Some(tips);
            }
            _ => {}
        }

        let timer = match (self.state, to) {
            (from, SessionStatus::Ending) if from != SessionStatus::Ending => {
                TimerEffect::Schedule(self.grace_period)
            }
            (SessionStatus::Ending, to) if to != SessionStatus::Ending => TimerEffect::Cancel,
            _ => TimerEffect::None,
        };

        Ok(SessionTransition {
            from: self.state,
            machine: next,
            changes,
            timer,
        })
    }
}
