use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

#[async_trait]
pub trait VersionControl: Send + Sync {
    async fn commit(&self, files: &[PathBuf], message: &str) -> Result<()>;
}

pub struct Git {
    root: PathBuf,
}

impl Git {
    pub async fn detect(root: &Path) -> Option<Self> {
        let output = Command::new("git")
            .args(["rev-parse", "--is-inside-work-tree"])
            .current_dir(root)
            .output()
            .await
            .ok()?;

        let inside = output.status.success()
            && String::from_utf8_lossy(&output.stdout).trim() == "true";
        inside.then(|| Self {
            root: root.to_path_buf(),
        })
    }

    pub async fn head_short(&self) -> Result<String> {
        let output = Command::new("git")
            .args(["rev-parse", "--short", "HEAD"])
            .current_dir(&self.root)
            .output()
            .await?;

        if !output.status.success() {
            return Err(anyhow!("git rev-parse failed"));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn run(&self, args: &[&str], paths: &[String]) -> Result<()> {
        let output = Command::new("git")
            .args(args)
            .arg("--")
            .args(paths)
            .current_dir(&self.root)
            .output()
            .await?;

        if !output.status.success() {
            return Err(anyhow!(
                "git {} failed: {}",
                args.first().copied().unwrap_or_default(),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(())
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }
}

#[async_trait]
impl VersionControl for Git {
    async fn commit(&self, files: &[PathBuf], message: &str) -> Result<()> {
        let mut present = Vec::new();
        let mut gone = Vec::new();
        for file in files {
            if tokio::fs::try_exists(file).await.unwrap_or(false) {
                present.push(self.relative(file));
            } else {
                gone.push(self.relative(file));
            }
        }

        if !present.is_empty() {
            self.run(&["add", "-A"], &present).await?;
        }
        if !gone.is_empty() {
            self.run(&["rm", "-r", "--cached", "--ignore-unmatch", "--quiet"], &gone)
                .await?;
        }

        let output = Command::new("git")
            .args(["commit", "-m", message])
            .current_dir(&self.root)
            .output()
            .await?;

        if !output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            if stdout.contains("nothing to commit") {
                debug!("nothing to commit");
                return Ok(());
            }
            return Err(anyhow!(
                "git commit failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        match self.head_short().await {
            Ok(hash) => info!(commit = %hash, files = files.len(), "committed"),
            Err(_) => info!(files = files.len(), "committed"),
        }
        Ok(())
    }
}

pub struct NoVcs;

#[async_trait]
impl VersionControl for NoVcs {
    async fn commit(&self, files: &[PathBuf], _message: &str) -> Result<()> {
        debug!(files = files.len(), "version control disabled, skipping commit");
        Ok(())
    }
}
