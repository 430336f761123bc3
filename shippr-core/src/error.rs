//! Error types for shippr

use thiserror::Error;

/// Result type alias for shippr operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for shippr operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error reported by libgit2
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// An external command exited unsuccessfully
    #[error("Command failed: {program} {}: {stderr}", args.join(" "))]
    Command {
        /// Program that was run
        program: String,
        /// Arguments passed to it
        args: Vec<String>,
        /// Trimmed standard error output
        stderr: String,
    },

    /// A required external tool is not installed
    #[error("'{0}' not found. Make sure git and gh are installed and on PATH")]
    ToolNotFound(String),

    /// The branch has no commits that are not already on the base branch
    #[error("No new commits on '{branch}' compared to '{base}'")]
    NoCommits {
        /// Feature branch
        branch: String,
        /// Base branch
        base: String,
    },

    /// Attempted to open a request from the base branch itself
    #[error("Currently on base branch '{0}'. Switch to a feature branch first")]
    OnBaseBranch(String),

    /// HEAD does not point at a branch
    #[error("HEAD is detached or unborn; check out a branch first")]
    DetachedHead,

    /// Fetching the request snapshot failed; terminates monitoring
    #[error("Failed to fetch review request state: {0}")]
    Fetch(String),

    /// Cleanup after a merge failed
    #[error("Cleanup of branch '{branch}' failed: {reason}")]
    Cleanup {
        /// Branch being cleaned up
        branch: String,
        /// Underlying failure
        reason: String,
    },

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
