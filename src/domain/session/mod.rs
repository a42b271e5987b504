//! Session Context - 场次限界上下文
//!
//! 职责:
//! - 场次聚合
//! - 场次生命周期状态机（暂停/恢复、带宽限期的结束）

mod aggregate;
mod errors;
mod machine;
mod value_objects;

pub use aggregate::Session;
pub use errors::SessionError;
pub use machine::{
    SessionChanges, SessionEvent, SessionEventKind, SessionMachine, SessionTransition,
    DEFAULT_GRACE_PERIOD,
};
pub use value_objects::{SessionId, SessionStatus, SongDuration, TipHandles};
