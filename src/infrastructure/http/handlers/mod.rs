//! HTTP Handlers

mod machine;
mod ping;
mod queue;
mod session;
mod song;

pub use machine::*;
pub use ping::*;
pub use queue::*;
pub use session::*;
pub use song::*;
