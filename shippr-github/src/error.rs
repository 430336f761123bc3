//! Error types for GitHub CLI operations

use thiserror::Error;

/// Result type for GitHub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to GitHub through `gh`
#[derive(Error, Debug)]
pub enum Error {
    /// IO error while spawning gh
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// gh printed something that is not the JSON we asked for
    #[error("Invalid JSON from gh: {0}")]
    Json(#[from] serde_json::Error),

    /// gh exited unsuccessfully
    #[error("gh {} failed: {stderr}", args.join(" "))]
    Command {
        /// Arguments passed to gh
        args: Vec<String>,
        /// Trimmed standard error output
        stderr: String,
    },

    /// gh is not installed
    #[error("GitHub CLI not found at '{0}'. Install it from https://cli.github.com")]
    NotInstalled(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),
}
