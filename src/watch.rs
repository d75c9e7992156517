use anyhow::{Context, Result};
use notify::RecursiveMode;
use notify_debouncer_full::{DebounceEventResult, DebouncedEvent, new_debouncer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::sync::SyncService;

pub async fn run(service: Arc<SyncService>, layout: PathBuf, debounce: Duration) -> Result<()> {
    let dir = layout
        .parent()
        .map(Path::to_path_buf)
        .context("layout path has no parent directory")?;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut debouncer = new_debouncer(debounce, None, move |result: DebounceEventResult| {
        if tx.send(result).is_err() {
            debug!("watch loop gone, dropping event");
        }
    })?;

    debouncer
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {}", dir.display()))?;

    info!(path = %layout.display(), "watching for changes, press Ctrl+C to exit");

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(Ok(events)) => {
                    if !touches(&events, &layout) {
                        continue;
                    }
                    debug!("layout changed");
                    let service = Arc::clone(&service);
                    tokio::spawn(async move {
                        service.notify_change().await;
                    });
                }
                Some(Err(errors)) => {
                    for error in errors {
                        warn!("watch error: {error}");
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("stopping watcher");
                break;
            }
        }
    }

    Ok(())
}

fn touches(events: &[DebouncedEvent], layout: &Path) -> bool {
    events.iter().any(|event| {
        !event.kind.is_access()
            && event
                .paths
                .iter()
                .any(|path| path == layout || path.file_name() == layout.file_name())
    })
}
