//! Query Handlers 实现
//!
//! 所有 QueryHandler 的具体实现

mod queue_handlers;
mod session_handlers;

pub use queue_handlers::*;
pub use session_handlers::*;
