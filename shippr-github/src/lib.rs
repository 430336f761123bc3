//! shippr GitHub - GitHub integration for shippr
//!
//! All GitHub access goes through the `gh` CLI so that the user's existing
//! authentication is reused. This crate opens pull requests and reads their
//! state for the request monitor.

mod client;
mod error;
mod pr;

pub use client::GhClient;
pub use error::{Error, Result};
pub use pr::{CreatedPullRequest, NewPullRequest};
