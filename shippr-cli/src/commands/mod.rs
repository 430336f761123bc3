//! CLI command implementations

pub mod create;
mod monitor;
mod prompt;
pub mod watch;

pub use create::CreateArgs;
pub use watch::WatchArgs;
