//! Configuration for review sessions.
//!
//! Every tunable is a field on [`ReviewConfig`]; nothing is read from the
//! environment. The CLI can load a TOML file with `--config`:
//!
//! ```toml
//! host = "127.0.0.1"
//! open_browser = true
//! decision_timeout_secs = 600
//!
//! [bundler]
//! command = "esbuild"
//! args = ["--minify"]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tool name for the chat question flow.
pub const TOOL_ASK_QUESTION: &str = "ask_question";
/// Tool name for the file review flow.
pub const TOOL_REVIEW_FILE: &str = "review_file";
/// Tool name for the component review flow.
pub const TOOL_REVIEW_COMPONENT: &str = "review_component";

/// Workspace prefix for file reviews.
pub const FILE_REVIEW_PREFIX: &str = "hitl-file-review-";
/// Workspace prefix for component reviews.
pub const COMPONENT_REVIEW_PREFIX: &str = "hitl-component-review-";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_REJECTION_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// External bundler invocation used by `CommandBundler`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundlerConfig {
    /// Executable, resolved through PATH (default: "esbuild")
    #[serde(default = "default_bundler_command")]
    pub command: String,
    /// Extra arguments appended after the built-in flags
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_bundler_command() -> String {
    "esbuild".to_string()
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            command: default_bundler_command(),
            args: Vec::new(),
        }
    }
}

/// Settings for the review orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Loopback interface the review server binds to; other addresses are
    /// refused at startup. The port is always OS-assigned.
    pub host: String,
    /// Temp directory prefix for file reviews
    pub file_prefix: String,
    /// Temp directory prefix for component reviews
    pub component_prefix: String,
    /// Parent directory for workspaces (default: platform temp dir)
    pub temp_root: Option<PathBuf>,
    /// Try to open the preview in the default browser
    pub open_browser: bool,
    /// chrono format string for the `.rejected<timestamp>` token
    pub rejection_timestamp_format: String,
    /// Give up waiting for a decision after this many seconds (unset: wait forever)
    pub decision_timeout_secs: Option<u64>,
    pub bundler: BundlerConfig,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            file_prefix: FILE_REVIEW_PREFIX.to_string(),
            component_prefix: COMPONENT_REVIEW_PREFIX.to_string(),
            temp_root: None,
            open_browser: true,
            rejection_timestamp_format: DEFAULT_REJECTION_TIMESTAMP_FORMAT.to_string(),
            decision_timeout_secs: None,
            bundler: BundlerConfig::default(),
        }
    }
}

impl ReviewConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse review config")
    }

    /// Load from `path` if given, otherwise return defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize review config")
    }

    pub fn decision_timeout(&self) -> Option<Duration> {
        self.decision_timeout_secs.map(Duration::from_secs)
    }

    /// Directory under which workspaces are created.
    pub fn temp_root(&self) -> PathBuf {
        self.temp_root.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ReviewConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.file_prefix, FILE_REVIEW_PREFIX);
        assert_eq!(config.component_prefix, COMPONENT_REVIEW_PREFIX);
        assert!(config.open_browser);
        assert!(config.decision_timeout().is_none());
        assert_eq!(config.bundler.command, "esbuild");
        assert_eq!(config.temp_root(), std::env::temp_dir());
    }

    #[test]
    fn test_parse_partial_config_keeps_defaults() {
        let config = ReviewConfig::parse(
            r#"
open_browser = false
decision_timeout_secs = 30

[bundler]
args = ["--minify"]
"#,
        )
        .unwrap();

        assert!(!config.open_browser);
        assert_eq!(config.decision_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.bundler.command, "esbuild");
        assert_eq!(config.bundler.args, vec!["--minify".to_string()]);
        assert_eq!(config.host, DEFAULT_HOST);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = ReviewConfig::parse("open_browser = \"maybe\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default() {
        let config = ReviewConfig::load_or_default(None).unwrap();
        assert_eq!(config, ReviewConfig::default());

        let dir = tempdir().unwrap();
        let path = dir.path().join("hitl.toml");
        std::fs::write(&path, "host = \"localhost\"\n").unwrap();
        let config = ReviewConfig::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.host, "localhost");
    }

    #[test]
    fn test_load_missing_file_errors() {
        let dir = tempdir().unwrap();
        let result = ReviewConfig::load(&dir.path().join("missing.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_toml_round_trip_is_stable() {
        let config = ReviewConfig {
            temp_root: Some(PathBuf::from("/var/tmp")),
            decision_timeout_secs: Some(5),
            ..Default::default()
        };
        let text = config.to_toml().unwrap();
        assert_eq!(ReviewConfig::parse(&text).unwrap(), config);
    }
}
