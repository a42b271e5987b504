//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（Repository、MachineRegistry）
//! - gateway: 按事件名分发状态迁移
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod gateway;
pub mod ports;
pub mod queries;

// Re-exports
pub use commands::{
    // Session commands
    CreateSession,
    CreateSessionResponse,
    // Song commands
    CancelSongRequest,
    DelaySong,
    DeleteSong,
    DeleteSongResponse,
    EditSongDetails,
    ReorderEntry,
    ReorderQueue,
    ReorderQueueResponse,
    SongStateResponse,
    SubmitSongRequest,
    SubmitSongResponse,
    // Handlers
    handlers::{
        CancelSongRequestHandler, CreateSessionHandler, DelaySongHandler, DeleteSongHandler,
        EditSongDetailsHandler, ReorderQueueHandler, SubmitSongRequestHandler,
    },
};

pub use error::ApplicationError;

pub use gateway::{DelayPolicy, EventPayload, TransitionGateway, TransitionOutcome};

pub use ports::{
    MachineRegistryPort, MachineSnapshot, RegistryError, RepositoryError, SessionRepositoryPort,
    SongRepositoryPort,
};

pub use queries::{
    GetQueue,
    GetSession,
    // Handlers
    handlers::{GetQueueHandler, GetSessionHandler, QueueResponse, QueueSongResponse, SessionResponse},
};
