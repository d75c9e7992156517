use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::config::{CONFIG_FILE, DEFAULT_LAYOUT};

pub async fn find_project_root(path: Option<PathBuf>) -> Result<PathBuf> {
    let start = match path {
        Some(p) => {
            if p.is_absolute() {
                p
            } else {
                std::env::current_dir()?.join(p)
            }
        }
        None => std::env::current_dir()?,
    };

    let start = fs::canonicalize(&start)
        .await
        .with_context(|| format!("Failed to canonicalize path: {}", start.display()))?;

    if let Some(marked) = find_marked_root(&start).await {
        return Ok(marked);
    }

    if let Some(git_root) = find_git_root(&start).await {
        return Ok(git_root);
    }

    Ok(start)
}

async fn find_marked_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if exists(&current.join(CONFIG_FILE)).await || exists(&current.join(DEFAULT_LAYOUT)).await
        {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

async fn find_git_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if exists(&current.join(".git")).await {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

async fn exists(path: &Path) -> bool {
    fs::metadata(path).await.is_ok()
}
