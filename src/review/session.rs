//! Review session orchestration.
//!
//! One call to [`ReviewOrchestrator::execute`] runs one session through
//!
//! ```text
//! Init → WorkspaceReady → ServerListening → AwaitingDecision → Resolving → Done
//!   └──────────────┴───────────────┴───────────────┴──────────────┴──→ Failed
//!                                                  └──→ Aborted (cancel / timeout)
//! ```
//!
//! The only suspension point is waiting for the human. Whatever happens, the
//! server is stopped and the workspace removed before the caller sees the
//! result, and persistence always happens before that cleanup.

use chrono::{Local, NaiveDateTime};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::browser::{BrowserLauncher, SystemBrowser};
use super::bundler::{Bundler, CommandBundler};
use super::models::{ContentKind, Decision, Outcome, ReviewRequest, ReviewResult, ReviewStatus};
use super::render::{INDEX_FILE, render_with_title};
use super::server::ReviewServer;
use super::store::ContentStore;
use super::workspace::Workspace;
use crate::config::ReviewConfig;
use crate::errors::ReviewError;

/// Lifecycle of one review session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    WorkspaceReady,
    ServerListening,
    AwaitingDecision,
    Resolving,
    Done,
    Aborted,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Done | SessionState::Aborted | SessionState::Failed
        )
    }

    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Init, WorkspaceReady)
            | (WorkspaceReady, ServerListening)
            | (ServerListening, AwaitingDecision)
            | (AwaitingDecision, Resolving)
            | (AwaitingDecision, Aborted)
            | (Resolving, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Init => "init",
            SessionState::WorkspaceReady => "workspace-ready",
            SessionState::ServerListening => "server-listening",
            SessionState::AwaitingDecision => "awaiting-decision",
            SessionState::Resolving => "resolving",
            SessionState::Done => "done",
            SessionState::Aborted => "aborted",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

struct Session {
    state: SessionState,
}

impl Session {
    fn new() -> Self {
        Self {
            state: SessionState::Init,
        }
    }

    fn advance(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid session transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(from = %self.state, to = %next, "Session transition");
        self.state = next;
    }
}

/// Source of the rejection timestamp.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Format `at` with a chrono format string, rejecting invalid specifiers
/// instead of panicking.
pub fn format_timestamp(at: &NaiveDateTime, format: &str) -> Result<String, ReviewError> {
    use std::fmt::Write;

    let mut out = String::new();
    write!(out, "{}", at.format(format)).map_err(|_| {
        ReviewError::Other(anyhow::anyhow!(
            "Invalid rejection timestamp format '{}'",
            format
        ))
    })?;
    Ok(out)
}

/// Insert `.rejected<stamp>` before the final extension of `target`.
///
/// `docs/x.md` becomes `docs/x.rejected<stamp>.md`; a name without an
/// extension (or a dotfile) gets the token appended.
pub fn rejected_path(target: &str, stamp: &str) -> String {
    let split = target.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0);
    let (dir, name) = target.split_at(split);
    match name.rfind('.') {
        Some(dot) if dot > 0 => {
            let (stem, ext) = name.split_at(dot);
            format!("{}{}.rejected{}{}", dir, stem, stamp, ext)
        }
        _ => format!("{}{}.rejected{}", dir, name, stamp),
    }
}

enum Wait {
    Decided(Outcome),
    Cancelled,
    TimedOut,
}

/// Runs review sessions. Sessions share nothing mutable, so one orchestrator
/// can drive any number of them concurrently.
pub struct ReviewOrchestrator {
    config: ReviewConfig,
    store: Arc<dyn ContentStore>,
    bundler: Arc<dyn Bundler>,
    browser: Option<Arc<dyn BrowserLauncher>>,
    clock: Arc<dyn Clock>,
    url_sink: Option<mpsc::UnboundedSender<String>>,
}

impl ReviewOrchestrator {
    pub fn new(config: ReviewConfig, store: Arc<dyn ContentStore>) -> Self {
        let bundler: Arc<dyn Bundler> = Arc::new(CommandBundler::new(config.bundler.clone()));
        let browser: Option<Arc<dyn BrowserLauncher>> = if config.open_browser {
            Some(Arc::new(SystemBrowser))
        } else {
            None
        };
        Self {
            config,
            store,
            bundler,
            browser,
            clock: Arc::new(SystemClock),
            url_sink: None,
        }
    }

    pub fn with_bundler(mut self, bundler: Arc<dyn Bundler>) -> Self {
        self.bundler = bundler;
        self
    }

    /// Replace the browser launcher; `None` only logs the preview URL.
    pub fn with_browser(mut self, browser: Option<Arc<dyn BrowserLauncher>>) -> Self {
        self.browser = browser;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Receive every preview URL as soon as its server is listening.
    pub fn with_url_sink(mut self, sink: mpsc::UnboundedSender<String>) -> Self {
        self.url_sink = Some(sink);
        self
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    /// Review a file's content; `content_kind` may be any string.
    pub async fn review_file(
        &self,
        artifact: impl Into<String>,
        target_path: impl Into<String>,
        content_kind: impl Into<String>,
    ) -> Result<ReviewResult, ReviewError> {
        self.execute(ReviewRequest::new(artifact, target_path, content_kind))
            .await
    }

    /// Review component source, bundled and mounted in the preview page.
    pub async fn review_component(
        &self,
        source: impl Into<String>,
        target_path: impl Into<String>,
    ) -> Result<ReviewResult, ReviewError> {
        self.execute(ReviewRequest::component(source, target_path))
            .await
    }

    /// Run one session to completion. Waits for the human without limit
    /// unless `decision_timeout_secs` is configured.
    pub async fn execute(&self, request: ReviewRequest) -> Result<ReviewResult, ReviewError> {
        self.execute_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Like [`execute`](Self::execute), but firing `cancel` while waiting for
    /// the human ends the session as `Aborted` without persisting anything.
    pub async fn execute_with_cancel(
        &self,
        request: ReviewRequest,
        cancel: CancellationToken,
    ) -> Result<ReviewResult, ReviewError> {
        request.validate()?;

        let id = Uuid::new_v4();
        let span = tracing::info_span!("review", session = %id, target = %request.target_path);
        self.run_session(request, cancel).instrument(span).await
    }

    async fn run_session(
        &self,
        request: ReviewRequest,
        cancel: CancellationToken,
    ) -> Result<ReviewResult, ReviewError> {
        let mut session = Session::new();
        let kind = request.kind();
        let prefix = match kind {
            ContentKind::ComponentSource => &self.config.component_prefix,
            _ => &self.config.file_prefix,
        };

        let workspace = match Workspace::acquire(&self.config.temp_root(), prefix) {
            Ok(workspace) => workspace,
            Err(e) => {
                session.advance(SessionState::Failed);
                tracing::error!(error = %e, "Review failed");
                return Err(e);
            }
        };

        let result = self
            .run_in_workspace(&mut session, &request, kind, &workspace, &cancel)
            .await;
        workspace.release();

        match &result {
            Ok(review) => {
                let terminal = if review.status == ReviewStatus::Aborted {
                    SessionState::Aborted
                } else {
                    SessionState::Done
                };
                session.advance(terminal);
                tracing::info!(
                    status = ?review.status,
                    file = review.file_path.as_deref().unwrap_or("-"),
                    "Review finished"
                );
            }
            Err(e) => {
                session.advance(SessionState::Failed);
                tracing::error!(error = %e, "Review failed");
            }
        }
        result
    }

    async fn run_in_workspace(
        &self,
        session: &mut Session,
        request: &ReviewRequest,
        kind: ContentKind,
        workspace: &Workspace,
        cancel: &CancellationToken,
    ) -> Result<ReviewResult, ReviewError> {
        let payload = match kind {
            ContentKind::ComponentSource => self.bundler.build(&request.artifact).await?,
            _ => request.artifact.clone(),
        };

        let document = render_with_title(&payload, kind, &request.target_path);
        for asset in &document.assets {
            workspace.stage(asset.name, &asset.contents)?;
        }
        workspace.stage(INDEX_FILE, &document.markup)?;
        session.advance(SessionState::WorkspaceReady);

        let mut server = ReviewServer::start(workspace.path(), &self.config.host).await?;
        session.advance(SessionState::ServerListening);

        let result = self.serve(session, request, &mut server, cancel).await;
        server.stop().await;
        result
    }

    async fn serve(
        &self,
        session: &mut Session,
        request: &ReviewRequest,
        server: &mut ReviewServer,
        cancel: &CancellationToken,
    ) -> Result<ReviewResult, ReviewError> {
        let url = server.preview_url();
        if let Some(sink) = &self.url_sink {
            let _ = sink.send(url.clone());
        }
        self.launch_browser(&url);
        session.advance(SessionState::AwaitingDecision);

        let outcome = match self.wait_for_decision(server, cancel).await? {
            Wait::Decided(outcome) => outcome,
            Wait::Cancelled => {
                tracing::info!("Review cancelled before a decision");
                return Ok(self.aborted(request));
            }
            Wait::TimedOut => {
                tracing::warn!("Timed out waiting for a decision");
                return Ok(self.aborted(request));
            }
        };
        session.advance(SessionState::Resolving);

        if let Some(comment) = &outcome.comment {
            tracing::info!(decision = %outcome.decision, %comment, "Reviewer comment");
        }

        let path = match outcome.decision {
            Decision::Accepted => request.target_path.clone(),
            Decision::Rejected => {
                let stamp = format_timestamp(
                    &self.clock.now(),
                    &self.config.rejection_timestamp_format,
                )?;
                self.unused_rejected_path(&request.target_path, &stamp).await?
            }
        };

        self.store
            .write(&path, &request.artifact)
            .await
            .map_err(|source| ReviewError::Persist {
                decision: outcome.decision,
                path: path.clone(),
                source,
            })?;

        Ok(ReviewResult {
            status: outcome.decision.into(),
            file_path: Some(path),
            comment: outcome.comment,
            content_kind: request.content_kind.clone(),
        })
    }

    /// First rejection name for `target` not already in the store. A clash
    /// (two rejections within one timestamp tick) gets a `-2`, `-3`, ... suffix.
    async fn unused_rejected_path(
        &self,
        target: &str,
        stamp: &str,
    ) -> Result<String, ReviewError> {
        let mut path = rejected_path(target, stamp);
        let mut attempt = 2;
        loop {
            let taken = self
                .store
                .exists(&path)
                .await
                .map_err(|source| ReviewError::Persist {
                    decision: Decision::Rejected,
                    path: path.clone(),
                    source,
                })?;
            if !taken {
                return Ok(path);
            }
            tracing::warn!(%path, "Rejected file already exists, choosing another name");
            path = rejected_path(target, &format!("{}-{}", stamp, attempt));
            attempt += 1;
        }
    }

    fn launch_browser(&self, url: &str) {
        match &self.browser {
            Some(browser) => {
                if let Err(e) = browser.open(url) {
                    tracing::warn!(
                        %url,
                        error = %e,
                        "Could not open browser, open the preview manually"
                    );
                }
            }
            None => tracing::info!(%url, "Preview ready"),
        }
    }

    async fn wait_for_decision(
        &self,
        server: &mut ReviewServer,
        cancel: &CancellationToken,
    ) -> Result<Wait, ReviewError> {
        let timeout = self.config.decision_timeout();
        tokio::select! {
            outcome = server.await_decision() => outcome.map(Wait::Decided),
            _ = cancel.cancelled() => Ok(Wait::Cancelled),
            _ = sleep_or_forever(timeout) => Ok(Wait::TimedOut),
        }
    }

    fn aborted(&self, request: &ReviewRequest) -> ReviewResult {
        ReviewResult {
            status: ReviewStatus::Aborted,
            file_path: None,
            comment: None,
            content_kind: request.content_kind.clone(),
        }
    }
}

async fn sleep_or_forever(timeout: Option<Duration>) {
    match timeout {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending::<()>().await,
    }
}
