//! Song Context - 点歌限界上下文
//!
//! 职责:
//! - 点歌聚合与值对象
//! - 点歌生命周期状态机（守卫、延后自动到期）

mod aggregate;
mod errors;
mod machine;
mod value_objects;

pub use aggregate::Song;
pub use errors::SongError;
pub use machine::{
    SongChanges, SongEvent, SongEventKind, SongGuards, SongMachine, SongTransition,
    GUARD_CAN_BE_DELAYED, GUARD_IS_NEXT_IN_QUEUE, GUARD_SINGLE_PLAYING_SONG,
};
pub use value_objects::{DelayMinutes, DelayWindow, SongDetails, SongId, SongStatus};
