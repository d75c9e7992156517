pub mod templates;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::config::Config;
use crate::decide::Decider;
use crate::model::{DeclaredScreen, ParentRef};
use crate::naming::{clean_feature_name, route_segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Feature,
    Native,
    Web,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Feature,
        ArtifactKind::Native,
        ArtifactKind::Web,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ArtifactKind::Feature => "feature",
            ArtifactKind::Native => "native",
            ArtifactKind::Web => "web",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub features: PathBuf,
    pub native: PathBuf,
    pub web: PathBuf,
    pub import_prefix: String,
    pub root_navigator: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenPaths {
    pub feature_dir: PathBuf,
    pub native_dir: PathBuf,
    pub web_dir: PathBuf,
}

impl ScreenPaths {
    pub fn dir(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::Feature => &self.feature_dir,
            ArtifactKind::Native => &self.native_dir,
            ArtifactKind::Web => &self.web_dir,
        }
    }

    pub fn file(&self, kind: ArtifactKind) -> PathBuf {
        self.dir(kind).join(entry_file(kind))
    }
}

pub fn entry_file(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Feature => "screen.tsx",
        ArtifactKind::Native => "index.tsx",
        ArtifactKind::Web => "page.tsx",
    }
}

impl ProjectLayout {
    pub fn from_config(config: &Config) -> Self {
        Self {
            root: config.root.clone(),
            features: config.features_dir(),
            native: config.native_dir(),
            web: config.web_dir(),
            import_prefix: config.import_prefix.clone(),
            root_navigator: config.root_navigator.clone(),
        }
    }

    pub fn screen_paths(&self, name: &str, parent: &ParentRef) -> ScreenPaths {
        let segment = route_segment(name);
        let nest = |base: &Path| -> PathBuf {
            let mut dir = base.to_path_buf();
            dir.extend(parent.route_path.iter());
            dir.join(segment)
        };

        ScreenPaths {
            feature_dir: self.feature_dir(clean_feature_name(name)),
            native_dir: nest(&self.native),
            web_dir: nest(&self.web),
        }
    }

    pub fn feature_dir(&self, clean: &str) -> PathBuf {
        self.features.join(clean)
    }

    pub fn app_root(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::Feature => &self.features,
            ArtifactKind::Native => &self.native,
            ArtifactKind::Web => &self.web,
        }
    }

    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

pub struct Projector<'a> {
    layout: &'a ProjectLayout,
    decider: &'a dyn Decider,
}

impl<'a> Projector<'a> {
    pub fn new(layout: &'a ProjectLayout, decider: &'a dyn Decider) -> Self {
        Self { layout, decider }
    }

    pub async fn generate(
        &self,
        screen: &DeclaredScreen,
        kind: ArtifactKind,
        is_update: bool,
        auto_confirm: bool,
    ) -> Result<Option<PathBuf>> {
        let paths = self.layout.screen_paths(&screen.entry.name, &screen.parent);
        let dir = paths.dir(kind);
        let file = paths.file(kind);

        if !auto_confirm && fs::try_exists(&file).await.unwrap_or(false) {
            let action = if is_update { "Update/overwrite" } else { "Overwrite" };
            let question = format!(
                "{} file {} exists. {action}?",
                kind.label(),
                self.layout.relative(&file).display()
            );
            if !self.decider.confirm(&question, is_update) {
                info!(path = %file.display(), "kept existing file");
                return Ok(None);
            }
        }

        let prefix = &self.layout.import_prefix;
        let content = match kind {
            ArtifactKind::Feature => templates::feature_screen(&screen.entry, prefix, is_update),
            ArtifactKind::Native => templates::native_route(&screen.entry, prefix),
            ArtifactKind::Web => templates::web_page(&screen.entry, prefix),
        };

        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        fs::write(&file, content)
            .await
            .with_context(|| format!("Failed to write {}", file.display()))?;

        info!(
            path = %self.layout.relative(&file).display(),
            "{}",
            if is_update { "regenerated" } else { "generated" }
        );
        Ok(Some(file))
    }

    pub async fn generate_all(
        &self,
        screen: &DeclaredScreen,
        is_update: bool,
        auto_confirm: bool,
    ) -> Vec<PathBuf> {
        let mut written = Vec::new();
        for kind in ArtifactKind::ALL {
            match self.generate(screen, kind, is_update, auto_confirm).await {
                Ok(Some(path)) => written.push(path),
                Ok(None) => {}
                Err(e) => warn!(screen = %screen.entry.name, kind = kind.label(), "{e:#}"),
            }
        }
        written
    }

    pub async fn delete(&self, screen: &DeclaredScreen) -> Result<Vec<PathBuf>> {
        let paths = self.layout.screen_paths(&screen.entry.name, &screen.parent);
        let mut removed = Vec::new();
        for kind in ArtifactKind::ALL {
            if self.remove_dir(paths.dir(kind)).await? {
                removed.push(paths.dir(kind).to_path_buf());
            }
        }
        Ok(removed)
    }

    pub async fn remove_dir(&self, dir: &Path) -> Result<bool> {
        if !fs::try_exists(dir).await.unwrap_or(false) {
            return Ok(false);
        }
        fs::remove_dir_all(dir)
            .await
            .with_context(|| format!("Failed to remove {}", dir.display()))?;
        info!(path = %self.layout.relative(dir).display(), "deleted");
        Ok(true)
    }

    pub async fn rename(&self, old: &DeclaredScreen, new: &DeclaredScreen) -> Result<Vec<PathBuf>> {
        let from = self.layout.screen_paths(&old.entry.name, &old.parent);
        let to = self.layout.screen_paths(&new.entry.name, &new.parent);
        let mut moved = Vec::new();

        for kind in ArtifactKind::ALL {
            let (source, target) = (from.dir(kind), to.dir(kind));
            if !fs::try_exists(source).await.unwrap_or(false) {
                continue;
            }
            if source != target {
                if fs::try_exists(target).await.unwrap_or(false) {
                    warn!(
                        from = %self.layout.relative(source).display(),
                        to = %self.layout.relative(target).display(),
                        "rename target already exists, leaving both in place"
                    );
                    continue;
                }
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).await?;
                }
                fs::rename(source, target).await.with_context(|| {
                    format!("Failed to move {} to {}", source.display(), target.display())
                })?;
                info!(
                    from = %self.layout.relative(source).display(),
                    to = %self.layout.relative(target).display(),
                    "moved"
                );
            }
            moved.push(target.to_path_buf());
        }

        Ok(moved)
    }
}
