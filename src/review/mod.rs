//! Preview-and-approval workflow.
//!
//! ## Module Map
//!
//! ```text
//! ┌────────────┐  execute()  ┌───────────────────────────────────────────────┐
//! │   Caller   │ ──────────> │ session.rs  (ReviewOrchestrator, state machine)│
//! │  (agent)   │ <────────── │    │                                          │
//! └────────────┘ ReviewResult│    ├─ bundler.rs   Bundler::build (components) │
//!                            │    ├─ render.rs    render_with_title()         │
//!                            │    ├─ workspace.rs Workspace::acquire/stage    │
//!                            │    ├─ server.rs    ReviewServer (POST /result) │
//!                            │    ├─ browser.rs   BrowserLauncher::open       │
//!                            │    └─ store.rs     ContentStore::write         │
//!                            └───────────────────────────────────────────────┘
//!                                         ▲
//!                                         │ HTTP on 127.0.0.1:<ephemeral>
//!                                    ┌─────────┐
//!                                    │  Human  │
//!                                    └─────────┘
//! ```
//!
//! ## Typical Flow
//!
//! 1. `ReviewRequest::validate()` fails fast on an empty artifact or target.
//! 2. A workspace is created under the temp root and `index.html` (plus any
//!    `content.html` / `bundle.js`) is staged into it.
//! 3. `ReviewServer` binds an ephemeral port and serves the workspace.
//! 4. The browser is asked to open `http://<addr>/index.html`; failure only logs.
//! 5. The first `POST /result` settles the decision latch.
//! 6. Accepted artifacts go to `targetPath`; rejected ones to
//!    `<stem>.rejected<yyyyMMdd-HHmmss>.<ext>`.
//! 7. The server stops and the workspace is removed, then the result returns.

pub mod browser;
pub mod bundler;
pub mod models;
pub mod render;
pub mod server;
pub mod session;
pub mod store;
pub mod workspace;

pub use browser::{BrowserLauncher, SystemBrowser};
pub use bundler::{Bundler, CommandBundler};
pub use models::{
    ContentKind, Decision, DecisionSubmission, Outcome, ReviewRequest, ReviewResult, ReviewStatus,
};
pub use render::{RenderedDocument, render, render_with_title};
pub use server::ReviewServer;
pub use session::{Clock, ReviewOrchestrator, SessionState, SystemClock, rejected_path};
pub use store::{ContentStore, FsContentStore};
pub use workspace::Workspace;
