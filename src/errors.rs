//! Typed error hierarchy for hitl.
//!
//! Three top-level enums cover the three subsystems:
//! - `ReviewError` — review session failures, from validation to persistence
//! - `BuildError` — component bundler failures
//! - `QuestionError` — question-asking failures in the chat variant

use thiserror::Error;

use crate::review::models::Decision;

/// Errors from a review session.
///
/// Cleanup failures never appear here: they are logged and dropped so they
/// cannot mask the primary result of a session.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Invalid review request: {0}")]
    InvalidRequest(String),

    #[error("Failed to create review workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("Failed to stage preview asset at {path}: {source}")]
    Stage {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to bind review server: {0}")]
    Bind(#[source] std::io::Error),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("Decision '{decision}' received but not saved to {path}: {source}")]
    Persist {
        decision: Decision,
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Review server stopped before a decision was submitted")]
    DecisionChannelClosed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from the component bundler.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to spawn bundler '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Bundler exited with code {exit_code}: {stderr}")]
    NonZeroExit { exit_code: i32, stderr: String },

    #[error("Bundler produced no output")]
    EmptyOutput,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from the question-asking collaborator.
#[derive(Debug, Error)]
pub enum QuestionError {
    #[error("No questions to ask")]
    Empty,

    #[error("Question '{id}' has no options")]
    NoOptions { id: String },

    #[error("Duplicate question id '{0}'")]
    DuplicateId(String),

    #[error("Prompt failed: {0}")]
    Prompt(#[source] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_error_workspace_is_matchable() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no tmp");
        let err = ReviewError::Workspace(io_err);
        match &err {
            ReviewError::Workspace(e) => {
                assert_eq!(e.kind(), std::io::ErrorKind::PermissionDenied);
            }
            _ => panic!("Expected Workspace variant"),
        }
    }

    #[test]
    fn persist_error_names_decision_and_path() {
        let err = ReviewError::Persist {
            decision: Decision::Rejected,
            path: "docs/x.rejected20260101-000000.md".to_string(),
            source: anyhow::anyhow!("disk full"),
        };
        let msg = err.to_string();
        assert!(msg.contains("rejected"));
        assert!(msg.contains("docs/x.rejected20260101-000000.md"));
        assert!(msg.contains("not saved"));
    }

    #[test]
    fn review_error_converts_from_build_error() {
        let inner = BuildError::NonZeroExit {
            exit_code: 1,
            stderr: "unexpected token".to_string(),
        };
        let err: ReviewError = inner.into();
        match &err {
            ReviewError::Build(BuildError::NonZeroExit { exit_code, stderr }) => {
                assert_eq!(*exit_code, 1);
                assert_eq!(stderr, "unexpected token");
            }
            _ => panic!("Expected ReviewError::Build(NonZeroExit)"),
        }
        assert!(err.to_string().contains("unexpected token"));
    }

    #[test]
    fn question_error_no_options_carries_id() {
        let err = QuestionError::NoOptions {
            id: "color".to_string(),
        };
        assert!(err.to_string().contains("color"));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&ReviewError::DecisionChannelClosed);
        assert_std_error(&BuildError::EmptyOutput);
        assert_std_error(&QuestionError::Empty);
    }
}
