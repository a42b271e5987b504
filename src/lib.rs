//! Karaq - 卡拉 OK 现场点歌队列
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Song: 点歌生命周期状态机（waiting / delayed / playing / completed / skipped）
//! - Session: 场次生命周期状态机（active / paused / ending / ended）
//! - Queue: 队列位置模型（下一首可播放、原子重排）
//!
//! 应用层 (application/):
//! - Ports: 端口定义（Repositories, MachineRegistry）
//! - Gateway: 按事件名分发状态迁移
//! - Commands / Queries: CQRS 处理器
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: JSON API
//! - Memory: 状态机实例注册表与定时器
//! - Persistence: SQLite 存储

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
