//! Domain Layer - 领域层
//!
//! 包含两个限界上下文和一个共享的队列模型:
//! - Song Context: 点歌请求及其生命周期状态机
//! - Session Context: DJ 场次及其生命周期状态机
//! - Queue: 队列顺序与"下一首可播放"规则

pub mod machine;
pub mod queue;
pub mod session;
pub mod song;

pub use machine::{EntityKind, MachineError, TimerEffect, UnknownName};
pub use queue::{
    apply_reorder, estimate_waits, next_playable, PositionUpdate, QueueError, QueueSnapshot,
    QueueView, WaitEstimate,
};
