//! Git operations for shippr
//!
//! Repository inspection goes through libgit2; pushing, fetching and branch
//! cleanup shell out to the git executable.

mod cli;
mod repo;

pub use cli::GitCli;
pub use repo::{GitRepo, RemoteInfo};
