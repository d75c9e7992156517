use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

pub const JOURNAL_FILE: &str = "journal.jsonl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Add,
    Delete,
    Rename,
    Update,
    Rewrite,
    AuditFix,
    Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Started,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalRecord {
    pub id: String,
    pub at: DateTime<Utc>,
    pub status: UnitStatus,
    pub kind: UnitKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Unit {
    pub id: String,
    pub kind: UnitKind,
    subject: Option<String>,
}

pub struct Journal {
    dir: PathBuf,
}

static UNIT_SEQ: AtomicU64 = AtomicU64::new(0);

fn unit_id() -> String {
    format!(
        "{}-{}-{:04}",
        Utc::now().format("%Y%m%d-%H%M%S%.3f"),
        std::process::id(),
        UNIT_SEQ.fetch_add(1, Ordering::Relaxed) + 1
    )
}

impl Journal {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: state_dir.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(JOURNAL_FILE)
    }

    pub async fn begin(&self, kind: UnitKind, subject: Option<&str>, hash: Option<String>) -> Unit {
        let unit = Unit {
            id: unit_id(),
            kind,
            subject: subject.map(str::to_string),
        };
        self.record(&unit, UnitStatus::Started, Vec::new(), hash, None)
            .await;
        unit
    }

    pub async fn complete(&self, unit: &Unit, paths: &[PathBuf], hash: Option<String>) {
        let paths = paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        self.record(unit, UnitStatus::Completed, paths, hash, None)
            .await;
    }

    pub async fn fail(&self, unit: &Unit, error: &str) {
        self.record(unit, UnitStatus::Failed, Vec::new(), None, Some(error.to_string()))
            .await;
    }

    async fn record(
        &self,
        unit: &Unit,
        status: UnitStatus,
        paths: Vec<String>,
        hash: Option<String>,
        error: Option<String>,
    ) {
        let record = JournalRecord {
            id: unit.id.clone(),
            at: Utc::now(),
            status,
            kind: unit.kind,
            subject: unit.subject.clone(),
            paths,
            hash,
            error,
        };
        if let Err(e) = self.append(&record).await {
            warn!(path = %self.path().display(), "journal write failed: {e:#}");
        }
    }

    async fn append(&self, record: &JournalRecord) -> Result<()> {
        if !fs::try_exists(&self.dir).await.unwrap_or(false) {
            fs::create_dir_all(&self.dir).await?;
            fs::write(self.dir.join(".gitignore"), "*\n").await?;
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path())
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

pub fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

#[derive(Debug, Clone)]
pub struct UnitSummary {
    pub id: String,
    pub kind: UnitKind,
    pub subject: Option<String>,
    pub started_at: DateTime<Utc>,
    pub status: UnitStatus,
    pub paths: Vec<String>,
    pub error: Option<String>,
}

impl UnitSummary {
    pub fn is_interrupted(&self) -> bool {
        self.status == UnitStatus::Started
    }
}

pub async fn read_units(state_dir: &Path) -> Result<Vec<UnitSummary>> {
    let path = state_dir.join(JOURNAL_FILE);
    if !fs::try_exists(&path).await.unwrap_or(false) {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&path).await?;
    let mut units: Vec<UnitSummary> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        let Ok(record) = serde_json::from_str::<JournalRecord>(line) else {
            continue;
        };
        match index.get(&record.id) {
            Some(&i) => {
                let unit = &mut units[i];
                unit.status = record.status;
                if !record.paths.is_empty() {
                    unit.paths = record.paths;
                }
                if record.error.is_some() {
                    unit.error = record.error;
                }
            }
            None => {
                index.insert(record.id.clone(), units.len());
                units.push(UnitSummary {
                    id: record.id,
                    kind: record.kind,
                    subject: record.subject,
                    started_at: record.at,
                    status: record.status,
                    paths: record.paths,
                    error: record.error,
                });
            }
        }
    }

    Ok(units)
}

pub async fn print_recent(state_dir: &Path, limit: usize) -> Result<()> {
    let units = read_units(state_dir).await?;

    if units.is_empty() {
        println!("Journal is empty.");
        return Ok(());
    }

    let interrupted = units.iter().filter(|u| u.is_interrupted()).count();
    let skip = units.len().saturating_sub(limit);

    println!("Recent units ({} of {}):", units.len() - skip, units.len());
    for unit in &units[skip..] {
        let status = match unit.status {
            UnitStatus::Started => "INTERRUPTED",
            UnitStatus::Completed => "ok",
            UnitStatus::Failed => "failed",
        };
        let kind = serde_json::to_value(unit.kind)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        println!(
            "  {} {:<10} {:<24} {}",
            unit.started_at.format("%Y-%m-%d %H:%M:%S"),
            kind,
            unit.subject.as_deref().unwrap_or("-"),
            status
        );
        for path in unit.paths.iter().take(5) {
            println!("      {}", path);
        }
        if unit.paths.len() > 5 {
            println!("      ... and {} more", unit.paths.len() - 5);
        }
        if let Some(ref error) = unit.error {
            println!("      error: {}", error);
        }
    }

    if interrupted > 0 {
        println!();
        println!(
            "{} unit(s) never finished. Run 'navsync audit' to check the project.",
            interrupted
        );
    }

    Ok(())
}
