//! Memory Layer - In-Memory State Management
//!
//! 实现 MachineRegistry，管理点歌和场次状态机实例及其定时器

mod actor_registry;

#[cfg(test)]
pub(crate) mod test_support;

pub use actor_registry::{ActorRegistry, RegistrySettings};
