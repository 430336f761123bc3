//! Title and body generation for new review requests

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const BODY_HEADING: &str = "### Changes in this request:";
const BODY_FOOTER: &str = "*Request created and filled in automatically.*";

/// Generated title and body for a review request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContent {
    pub title: String,
    pub body: String,
}

impl RequestContent {
    /// Build content from commit subjects, oldest first
    ///
    /// The oldest commit becomes the title; the body lists every commit
    /// newest first, the order `git log` shows them in.
    pub fn from_commits(branch: &str, base: &str, subjects: &[String]) -> Result<Self> {
        let title = subjects
            .first()
            .cloned()
            .ok_or_else(|| Error::NoCommits {
                branch: branch.to_string(),
                base: base.to_string(),
            })?;

        let changes: Vec<String> = subjects
            .iter()
            .rev()
            .map(|subject| format!("- {}", subject))
            .collect();

        let body = format!(
            "{}\n\n{}\n---\n{}",
            BODY_HEADING,
            changes.join("\n"),
            BODY_FOOTER
        );

        Ok(Self { title, body })
    }
}
