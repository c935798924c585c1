//! Opening the preview in the operator's browser.
//!
//! Launching is best-effort: the orchestrator logs the URL when it fails.

use anyhow::{Context, Result};

pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

/// Opens URLs with the platform's default handler via the `open` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        open::that_detached(url).with_context(|| format!("Failed to open browser for {}", url))
    }
}
