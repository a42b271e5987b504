//! 状态机共享定义
//!
//! Song 与 Session 两个生命周期状态机共用的错误类型、实体种类和定时器效果

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// 状态机所属实体种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Song,
    Session,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Song => "song",
            EntityKind::Session => "session",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "song" => Ok(EntityKind::Song),
            "session" => Ok(EntityKind::Session),
            _ => Err(UnknownName::new("entity kind", s)),
        }
    }
}

/// 状态名、事件名或实体种类无法识别
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind}: {value}")]
pub struct UnknownName {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownName {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// 状态机拒绝事件的原因
///
/// 两种情况都不会修改状态，也不会触发持久化
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    /// 当前状态没有定义该事件
    #[error("状态 {state} 不接受事件 {event}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },

    /// 事件已定义，但守卫条件不成立
    #[error("守卫 {guard} 拒绝了事件 {event}")]
    GuardRejected {
        guard: &'static str,
        event: &'static str,
    },
}

impl MachineError {
    pub fn invalid(state: &'static str, event: &'static str) -> Self {
        Self::InvalidTransition { state, event }
    }

    pub fn guard(guard: &'static str, event: &'static str) -> Self {
        Self::GuardRejected { guard, event }
    }
}

/// 一次迁移对定时器的影响
///
/// 进入计时状态时 `Schedule`，离开计时状态时 `Cancel`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEffect {
    None,
    Schedule(Duration),
    Cancel,
}
