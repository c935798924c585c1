//! Turning component source into a browser-loadable module.
//!
//! The preview page supplies React from a CDN through an import map, so the
//! bundle must leave `react`, `react-dom` and the JSX runtime as bare imports.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

use crate::config::BundlerConfig;
use crate::errors::BuildError;

/// Imports resolved by the preview page rather than bundled.
pub const EXTERNAL_MODULES: &[&str] = &[
    "react",
    "react/jsx-runtime",
    "react-dom",
    "react-dom/client",
];

#[async_trait]
pub trait Bundler: Send + Sync {
    /// Bundle `entry_source` into an ES module whose default export is the component.
    async fn build(&self, entry_source: &str) -> Result<String, BuildError>;
}

/// Runs an esbuild-compatible executable.
///
/// The command line is `<command> <args...> <entry.tsx> --bundle --format=esm
/// --jsx=automatic --external:<module>...`; the bundle is read from stdout.
#[derive(Debug, Clone, Default)]
pub struct CommandBundler {
    config: BundlerConfig,
}

impl CommandBundler {
    pub fn new(config: BundlerConfig) -> Self {
        Self { config }
    }

    fn flags() -> Vec<String> {
        let mut flags = vec![
            "--bundle".to_string(),
            "--format=esm".to_string(),
            "--jsx=automatic".to_string(),
        ];
        flags.extend(EXTERNAL_MODULES.iter().map(|m| format!("--external:{}", m)));
        flags
    }
}

#[async_trait]
impl Bundler for CommandBundler {
    async fn build(&self, entry_source: &str) -> Result<String, BuildError> {
        let dir = tempfile::Builder::new()
            .prefix("hitl-bundle-")
            .tempdir()
            .map_err(|e| {
                BuildError::Other(
                    anyhow::Error::new(e).context("Failed to create bundle directory"),
                )
            })?;
        let entry = dir.path().join("entry.tsx");
        tokio::fs::write(&entry, entry_source)
            .await
            .map_err(|e| {
                BuildError::Other(anyhow::Error::new(e).context("Failed to write bundle entry"))
            })?;

        tracing::debug!(
            command = %self.config.command,
            entry = %entry.display(),
            "Bundling component"
        );

        let output = Command::new(&self.config.command)
            .args(&self.config.args)
            .arg(&entry)
            .args(Self::flags())
            .current_dir(dir.path())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| BuildError::SpawnFailed {
                command: self.config.command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(BuildError::NonZeroExit {
                exit_code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let bundle = String::from_utf8_lossy(&output.stdout).to_string();
        if bundle.trim().is_empty() {
            return Err(BuildError::EmptyOutput);
        }
        Ok(bundle)
    }
}
