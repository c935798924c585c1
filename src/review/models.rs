use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::errors::ReviewError;

/// Rendering mode for an artifact.
///
/// Parsing never fails: an unrecognized kind becomes `PlainText`, while the
/// caller's original string is kept on the request and reported back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentKind {
    #[default]
    PlainText,
    Markdown,
    Html,
    Json,
    ComponentSource,
}

impl ContentKind {
    pub fn parse(kind: &str) -> Self {
        match kind.trim().to_ascii_lowercase().as_str() {
            "markdown" => ContentKind::Markdown,
            "html" => ContentKind::Html,
            "json" => ContentKind::Json,
            "component-source" => ContentKind::ComponentSource,
            _ => ContentKind::PlainText,
        }
    }

    /// Guess a kind from a file extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "md" | "markdown" => ContentKind::Markdown,
            "html" | "htm" => ContentKind::Html,
            "json" => ContentKind::Json,
            "jsx" | "tsx" => ContentKind::ComponentSource,
            _ => ContentKind::PlainText,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::PlainText => "plain-text",
            ContentKind::Markdown => "markdown",
            ContentKind::Html => "html",
            ContentKind::Json => "json",
            ContentKind::ComponentSource => "component-source",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to a review session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    /// Text payload under review
    pub artifact: String,
    /// Destination in the content store if accepted
    pub target_path: String,
    /// Rendering hint as supplied by the caller
    #[serde(default = "default_content_kind")]
    pub content_kind: String,
}

fn default_content_kind() -> String {
    ContentKind::PlainText.as_str().to_string()
}

impl ReviewRequest {
    pub fn new(
        artifact: impl Into<String>,
        target_path: impl Into<String>,
        content_kind: impl Into<String>,
    ) -> Self {
        Self {
            artifact: artifact.into(),
            target_path: target_path.into(),
            content_kind: content_kind.into(),
        }
    }

    /// A component review: the artifact is component source to be bundled.
    pub fn component(source: impl Into<String>, target_path: impl Into<String>) -> Self {
        Self::new(source, target_path, ContentKind::ComponentSource.as_str())
    }

    /// Effective kind used for rendering.
    pub fn kind(&self) -> ContentKind {
        ContentKind::parse(&self.content_kind)
    }

    /// Reject requests that are missing required fields.
    pub fn validate(&self) -> Result<(), ReviewError> {
        if self.artifact.is_empty() {
            return Err(ReviewError::InvalidRequest(
                "artifact must not be empty".to_string(),
            ));
        }
        if self.target_path.trim().is_empty() {
            return Err(ReviewError::InvalidRequest(
                "targetPath must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// The human's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accepted,
    Rejected,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Accepted => write!(f, "accepted"),
            Decision::Rejected => write!(f, "rejected"),
        }
    }
}

/// Body accepted by `POST /result`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionSubmission {
    pub accepted: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

/// What the decision latch resolves with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl From<DecisionSubmission> for Outcome {
    fn from(submission: DecisionSubmission) -> Self {
        let decision = if submission.accepted {
            Decision::Accepted
        } else {
            Decision::Rejected
        };
        // An empty comment box means no comment.
        let comment = submission.comment.filter(|c| !c.trim().is_empty());
        Self { decision, comment }
    }
}

/// Final status reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Accepted,
    Rejected,
    /// Cancelled or timed out before a decision; nothing was persisted.
    Aborted,
}

impl From<Decision> for ReviewStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Accepted => ReviewStatus::Accepted,
            Decision::Rejected => ReviewStatus::Rejected,
        }
    }
}

/// Result of one review session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResult {
    pub status: ReviewStatus,
    /// Where the artifact was persisted; `None` when aborted
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// The content kind as the caller supplied it
    pub content_kind: String,
}
