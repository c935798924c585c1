//! Review commands — `hitl review` and `hitl component`.

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use hitl::config::ReviewConfig;
use hitl::review::{ContentKind, FsContentStore, ReviewOrchestrator, ReviewRequest};

pub async fn cmd_review(
    project_dir: &Path,
    config: ReviewConfig,
    file: &Path,
    target: Option<String>,
    kind: Option<String>,
) -> Result<()> {
    let artifact = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let kind = kind.unwrap_or_else(|| ContentKind::from_path(file).as_str().to_string());
    let target = target.unwrap_or_else(|| file.to_string_lossy().to_string());

    run_review(project_dir, config, ReviewRequest::new(artifact, target, kind)).await
}

pub async fn cmd_component(
    project_dir: &Path,
    config: ReviewConfig,
    file: &Path,
    target: &str,
) -> Result<()> {
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    run_review(project_dir, config, ReviewRequest::component(source, target)).await
}

async fn run_review(
    project_dir: &Path,
    config: ReviewConfig,
    request: ReviewRequest,
) -> Result<()> {
    let store = Arc::new(FsContentStore::new(project_dir));
    let (url_tx, mut url_rx) = mpsc::unbounded_channel::<String>();
    let orchestrator = ReviewOrchestrator::new(config, store).with_url_sink(url_tx);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .expect("progress bar template is a valid static string"),
    );
    spinner.set_message("Preparing preview...");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let ui = spinner.clone();
    let url_task = tokio::spawn(async move {
        while let Some(url) = url_rx.recv().await {
            ui.set_message(format!(
                "Waiting for a decision at {} (Ctrl+C to abort)",
                style(url).cyan()
            ));
        }
    });

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let result = orchestrator.execute_with_cancel(request, cancel).await;
    spinner.finish_and_clear();
    url_task.abort();

    let result = result?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
