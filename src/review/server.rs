//! Short-lived HTTP server for one review.
//!
//! The review server serves the session's workspace as static files and
//! accepts exactly one decision on `POST /result`. It is the only place the
//! human's answer enters the process.
//!
//! ## Features
//!
//! - Binds to localhost on an OS-assigned port, so concurrent sessions never collide
//! - Static files rooted at `/`; unknown paths get a 404 from the file service
//! - One-shot decision latch: the first valid submission settles it, later
//!   submissions still get `200 OK` but change nothing
//! - Idempotent graceful shutdown
//!
//! ## Usage
//!
//! ```no_run
//! use hitl::review::server::ReviewServer;
//!
//! # async fn example(workspace: &std::path::Path) -> Result<(), hitl::errors::ReviewError> {
//! let mut server = ReviewServer::start(workspace, "127.0.0.1").await?;
//! println!("Open {}", server.preview_url());
//!
//! let outcome = server.await_decision().await?;
//! println!("Human said {}", outcome.decision);
//!
//! server.stop().await;
//! # Ok(())
//! # }
//! ```

use axum::{Json, Router, extract::State, routing::post};
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;

use super::models::{DecisionSubmission, Outcome};
use super::render::{INDEX_FILE, RESULT_ROUTE};
use crate::errors::ReviewError;

/// How long `stop` waits for open connections before aborting the server task.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Single-assignment slot for the human's decision.
///
/// Wraps the sending half of a oneshot channel; the first `settle` takes it,
/// so the receiver can only ever observe one outcome.
#[derive(Debug)]
pub(crate) struct DecisionLatch {
    tx: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl DecisionLatch {
    pub(crate) fn new() -> (Arc<Self>, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        (
            Arc::new(Self {
                tx: Mutex::new(Some(tx)),
            }),
            rx,
        )
    }

    /// Settle the latch. Returns `true` only for the call that delivered the outcome.
    pub(crate) fn settle(&self, outcome: Outcome) -> bool {
        let tx = self
            .tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match tx {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }
}

/// A running review server.
pub struct ReviewServer {
    addr: SocketAddr,
    decision_rx: Option<oneshot::Receiver<Outcome>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ReviewServer {
    /// Bind `host:0` and start serving `workspace`.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Bind`] if `host` does not resolve to loopback
    /// addresses only, or if no socket could be bound.
    pub async fn start(workspace: &Path, host: &str) -> Result<Self, ReviewError> {
        let addrs = loopback_addrs(host).await?;
        let listener = TcpListener::bind(addrs.as_slice())
            .await
            .map_err(ReviewError::Bind)?;
        let addr = listener.local_addr().map_err(ReviewError::Bind)?;

        let (latch, decision_rx) = DecisionLatch::new();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = build_router(workspace, latch);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                tracing::error!(error = %e, "Review server error");
            }
        });

        tracing::debug!(%addr, workspace = %workspace.display(), "Review server listening");

        Ok(Self {
            addr,
            decision_rx: Some(decision_rx),
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL, e.g. `http://127.0.0.1:54321`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// URL of the preview page.
    pub fn preview_url(&self) -> String {
        format!("{}/{}", self.url(), INDEX_FILE)
    }

    /// Whether `stop` has not been called yet.
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some()
    }

    /// Wait for the first decision. There is no timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::DecisionChannelClosed`] if the server went away
    /// without a decision, or if the decision was already taken.
    pub async fn await_decision(&mut self) -> Result<Outcome, ReviewError> {
        let rx = self
            .decision_rx
            .take()
            .ok_or(ReviewError::DecisionChannelClosed)?;
        rx.await.map_err(|_| ReviewError::DecisionChannelClosed)
    }

    /// Stop accepting connections and wait for the server task to finish.
    /// Safe to call more than once.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut handle) = self.handle.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
                tracing::warn!(addr = %self.addr, "Review server did not drain in time, aborting");
                handle.abort();
                let _ = handle.await;
            }
            tracing::debug!(addr = %self.addr, "Review server stopped");
        }
    }
}

impl Drop for ReviewServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Resolve `host` and refuse anything reachable from another machine.
/// `POST /result` has no authentication.
async fn loopback_addrs(host: &str) -> Result<Vec<SocketAddr>, ReviewError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, 0))
        .await
        .map_err(ReviewError::Bind)?
        .collect();
    if addrs.is_empty() || addrs.iter().any(|addr| !addr.ip().is_loopback()) {
        return Err(ReviewError::Bind(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("review server must bind to a loopback address, got '{}'", host),
        )));
    }
    Ok(addrs)
}

/// Build the axum router: one decision route, everything else from the workspace.
pub(crate) fn build_router(workspace: &Path, latch: Arc<DecisionLatch>) -> Router {
    Router::new()
        .route(RESULT_ROUTE, post(result_handler))
        .fallback_service(ServeDir::new(workspace))
        .with_state(latch)
}

/// Handle a decision submission.
async fn result_handler(
    State(latch): State<Arc<DecisionLatch>>,
    Json(submission): Json<DecisionSubmission>,
) -> Json<serde_json::Value> {
    let outcome = Outcome::from(submission);
    let decision = outcome.decision;
    let recorded = latch.settle(outcome);
    if recorded {
        tracing::info!(%decision, "Decision received");
    } else {
        tracing::debug!(%decision, "Ignoring decision, session already resolved");
    }
    Json(serde_json::json!({ "ok": true, "recorded": recorded }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::models::Decision;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tempfile::tempdir;
    use tower::ServiceExt;

    fn post_result(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/result")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_latch_settles_once() {
        let (latch, mut rx) = DecisionLatch::new();
        let first = Outcome {
            decision: Decision::Accepted,
            comment: None,
        };
        let second = Outcome {
            decision: Decision::Rejected,
            comment: Some("too late".to_string()),
        };

        assert!(latch.settle(first.clone()));
        assert!(!latch.settle(second));
        assert_eq!(rx.try_recv().unwrap(), first);
    }

    #[test]
    fn test_latch_with_dropped_receiver_reports_not_recorded() {
        let (latch, rx) = DecisionLatch::new();
        drop(rx);
        assert!(!latch.settle(Outcome {
            decision: Decision::Accepted,
            comment: None,
        }));
    }

    #[tokio::test]
    async fn test_result_endpoint_settles_latch() {
        let dir = tempdir().unwrap();
        let (latch, rx) = DecisionLatch::new();
        let app = build_router(dir.path(), latch);

        let response = app
            .oneshot(post_result(r#"{"accepted":false,"comment":"wrong tone"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["recorded"], true);

        let outcome = rx.await.unwrap();
        assert_eq!(outcome.decision, Decision::Rejected);
        assert_eq!(outcome.comment.as_deref(), Some("wrong tone"));
    }

    #[tokio::test]
    async fn test_second_submission_is_acknowledged_but_ignored() {
        let dir = tempdir().unwrap();
        let (latch, rx) = DecisionLatch::new();
        let app = build_router(dir.path(), latch);

        let first = app
            .clone()
            .oneshot(post_result(r#"{"accepted":true}"#))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(post_result(r#"{"accepted":false,"comment":"changed my mind"}"#))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(body_json(second).await["recorded"], false);

        let outcome = rx.await.unwrap();
        assert_eq!(outcome.decision, Decision::Accepted);
        assert!(outcome.comment.is_none());
    }

    #[tokio::test]
    async fn test_invalid_body_is_rejected() {
        let dir = tempdir().unwrap();
        let (latch, mut rx) = DecisionLatch::new();
        let app = build_router(dir.path(), latch);

        let response = app
            .oneshot(post_result(r#"{"accepted":"yes"}"#))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_serves_workspace_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<p>preview</p>").unwrap();
        let (latch, _rx) = DecisionLatch::new();
        let app = build_router(dir.path(), latch);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/index.html")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"<p>preview</p>");
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let dir = tempdir().unwrap();
        let (latch, _rx) = DecisionLatch::new();
        let app = build_router(dir.path(), latch);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/nope.js")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_start_decide_stop() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "ok").unwrap();
        let mut server = ReviewServer::start(dir.path(), "127.0.0.1").await.unwrap();

        assert!(server.is_running());
        assert!(server.url().starts_with("http://127.0.0.1:"));
        assert!(server.preview_url().ends_with("/index.html"));
        assert_ne!(server.addr().port(), 0);

        let client = reqwest::Client::new();
        let page = client.get(server.preview_url()).send().await.unwrap();
        assert_eq!(page.status(), reqwest::StatusCode::OK);

        let response = client
            .post(format!("{}/result", server.url()))
            .json(&serde_json::json!({"accepted": true, "comment": "lgtm"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let outcome = server.await_decision().await.unwrap();
        assert_eq!(outcome.decision, Decision::Accepted);
        assert_eq!(outcome.comment.as_deref(), Some("lgtm"));

        let addr = server.addr();
        server.stop().await;
        assert!(!server.is_running());
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());

        // Second stop is a no-op.
        server.stop().await;
    }

    #[tokio::test]
    async fn test_non_loopback_host_is_refused() {
        let dir = tempdir().unwrap();
        for host in ["0.0.0.0", "::", "203.0.113.7"] {
            match ReviewServer::start(dir.path(), host).await {
                Err(ReviewError::Bind(e)) => {
                    assert_eq!(e.kind(), io::ErrorKind::InvalidInput, "{}", host);
                }
                Err(other) => panic!("Expected Bind for {}, got {:?}", host, other),
                Ok(server) => panic!("{} was bound at {}", host, server.addr()),
            }
        }
    }

    #[tokio::test]
    async fn test_localhost_name_is_accepted() {
        let dir = tempdir().unwrap();
        let mut server = ReviewServer::start(dir.path(), "localhost").await.unwrap();
        assert!(server.addr().ip().is_loopback());
        server.stop().await;
    }

    #[tokio::test]
    async fn test_await_after_stop_reports_closed_channel() {
        let dir = tempdir().unwrap();
        let mut server = ReviewServer::start(dir.path(), "127.0.0.1").await.unwrap();
        server.stop().await;

        let err = server.await_decision().await.unwrap_err();
        assert!(matches!(err, ReviewError::DecisionChannelClosed));
    }

    #[tokio::test]
    async fn test_two_servers_get_different_ports() {
        let dir = tempdir().unwrap();
        let mut a = ReviewServer::start(dir.path(), "127.0.0.1").await.unwrap();
        let mut b = ReviewServer::start(dir.path(), "127.0.0.1").await.unwrap();
        assert_ne!(a.addr().port(), b.addr().port());
        a.stop().await;
        b.stop().await;
    }
}
