//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod machine_registry;
mod repositories;

pub use machine_registry::{MachineRegistryPort, MachineSnapshot, RegistryError};
pub use repositories::{RepositoryError, SessionRepositoryPort, SongRepositoryPort};
