//! shippr core - Open a review request and clean up after it merges
//!
//! This crate holds everything that does not depend on the hosting CLI:
//! configuration, git access, request content generation and the request
//! monitor state machine.

pub mod config;
pub mod content;
pub mod error;
pub mod git;
pub mod monitor;
pub mod request;

pub use config::{Config, ConfigOverrides, MonitorSettings, RepoConfig, ToolsConfig};
pub use content::RequestContent;
pub use error::{Error, Result};
pub use git::{GitCli, GitRepo, RemoteInfo};
pub use monitor::{
    evaluate, BranchCleanup, MonitorConfig, MonitorEvent, MonitorListener, MonitorOutcome,
    MonitorPhase, RequestMonitor, RequestSource, Verdict,
};
pub use request::{CheckStatus, RequestId, RequestSnapshot, RequestState};
