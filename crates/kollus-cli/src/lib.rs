use anyhow::Context;
use kollus_api_client::{MonitorOptions, ProgressMonitor};
use kollus_core::{UploadError, UploadFile};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;

/// Content type for a path, guessed from its extension. Unknown extensions
/// give `None` and the server decides.
pub fn guess_content_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    let mime = match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mpeg" | "mpg" => "video/mpeg",
        "3gp" => "video/3gpp",
        "ts" => "video/mp2t",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "aac" => "audio/aac",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        "opus" => "audio/opus",
        _ => return None,
    };
    Some(mime)
}

/// Read a file from disk into an [`UploadFile`].
pub async fn read_upload_file(path: &Path) -> anyhow::Result<UploadFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Invalid file name: {}", path.display()))?
        .to_string();

    let file = UploadFile::new(file_name, bytes);
    Ok(match guess_content_type(path) {
        Some(content_type) => file.with_content_type(content_type),
        None => file,
    })
}

#[derive(Debug)]
pub enum WatchEvent {
    Progress(f64),
    Complete,
    Failed(UploadError),
}

/// Run the monitor and return once the session ends. Each progress value
/// is logged; a fetch failure is returned as an error.
pub async fn watch_progress(monitor: &ProgressMonitor, interval: Duration) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (progress_tx, complete_tx, error_tx) = (tx.clone(), tx.clone(), tx);

    monitor.start(
        MonitorOptions::new()
            .interval(interval)
            .on_progress(move |value| {
                let _ = progress_tx.send(WatchEvent::Progress(value));
            })
            .on_complete(move || {
                let _ = complete_tx.send(WatchEvent::Complete);
            })
            .on_error(move |err| {
                let _ = error_tx.send(WatchEvent::Failed(err));
            }),
    );

    while let Some(event) = rx.recv().await {
        match event {
            WatchEvent::Progress(value) => {
                tracing::info!(progress = value, "Processing progress");
            }
            WatchEvent::Complete => {
                tracing::info!(progress_url = %monitor.progress_url(), "Processing complete");
                return Ok(());
            }
            WatchEvent::Failed(err) => {
                return Err(err).context("Progress monitoring failed");
            }
        }
    }

    anyhow::bail!("Progress monitoring ended without completing")
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
