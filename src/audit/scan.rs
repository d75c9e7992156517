use anyhow::Result;
use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::project::{ArtifactKind, ProjectLayout, entry_file};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactInventory {
    pub features: BTreeMap<String, PathBuf>,
    pub native: Vec<RouteArtifact>,
    pub web: Vec<RouteArtifact>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteArtifact {
    pub route_path: Vec<String>,
    pub segment: String,
    pub dir: PathBuf,
}

impl ArtifactInventory {
    pub fn routes(&self, kind: ArtifactKind) -> &[RouteArtifact] {
        match kind {
            ArtifactKind::Native => &self.native,
            ArtifactKind::Web => &self.web,
            ArtifactKind::Feature => &[],
        }
    }

    pub fn has_route(&self, kind: ArtifactKind, route_path: &[String], segment: &str) -> bool {
        self.routes(kind)
            .iter()
            .any(|r| r.route_path == route_path && r.segment == segment)
    }
}

pub async fn scan(layout: &ProjectLayout, navigator_paths: &[Vec<String>]) -> Result<ArtifactInventory> {
    let layout = layout.clone();
    let navigator_paths = navigator_paths.to_vec();

    tokio::task::spawn_blocking(move || scan_sync(&layout, &navigator_paths)).await?
}

fn scan_sync(layout: &ProjectLayout, navigator_paths: &[Vec<String>]) -> Result<ArtifactInventory> {
    let mut inventory = ArtifactInventory::default();

    for dir in entries(&layout.features, 1, entry_file(ArtifactKind::Feature)) {
        if let Some(name) = dir.file_name().and_then(|n| n.to_str()) {
            inventory.features.insert(name.to_string(), dir.clone());
        }
    }

    for kind in [ArtifactKind::Native, ArtifactKind::Web] {
        let root = layout.app_root(kind);
        let mut routes = Vec::new();
        for dir in entries(root, usize::MAX, entry_file(kind)) {
            let Ok(relative) = dir.strip_prefix(root) else {
                continue;
            };
            let mut parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            let Some(segment) = parts.pop() else {
                continue;
            };

            let mut full = parts.clone();
            full.push(segment.clone());
            if navigator_paths.contains(&full) {
                continue;
            }

            let nested_in_navigator = navigator_paths.contains(&parts);
            let nested_in_groups = parts.iter().all(|p| is_group(p));
            if !nested_in_navigator && !nested_in_groups {
                continue;
            }

            routes.push(RouteArtifact {
                route_path: parts,
                segment,
                dir,
            });
        }
        match kind {
            ArtifactKind::Native => inventory.native = routes,
            _ => inventory.web = routes,
        }
    }

    Ok(inventory)
}

pub fn is_group(name: &str) -> bool {
    name.len() > 2 && name.starts_with('(') && name.ends_with(')')
}

fn entries(root: &Path, depth: usize, marker: &str) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }

    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .parents(false)
        .max_depth(Some(depth.saturating_add(1)))
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry
                    .file_name()
                    .to_str()
                    .is_some_and(|n| n.starts_with('_') || n.starts_with('.'))
        })
        .build();

    let mut dirs = Vec::new();
    for entry in walker.flatten() {
        let path = entry.path();
        let is_marker = entry.file_type().is_some_and(|t| t.is_file())
            && path.file_name().and_then(|n| n.to_str()) == Some(marker);
        if !is_marker {
            continue;
        }
        if let Some(dir) = path.parent() {
            if dir != root {
                dirs.push(dir.to_path_buf());
            }
        }
    }
    dirs
}
