pub mod scan;

use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::warn;

pub use scan::{ArtifactInventory, RouteArtifact, scan};

use crate::decide::Decider;
use crate::layout::LayoutDocument;
use crate::model::{DeclaredScreen, Snapshot};
use crate::naming::{clean_feature_name, feature_from_import, feature_import_path, route_segment};
use crate::project::{ArtifactKind, ProjectLayout, Projector};
use crate::rewrite::EditBatch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fix {
    Generate {
        artifact: ArtifactKind,
        screen: DeclaredScreen,
        path: PathBuf,
    },
    AddImport {
        component: String,
        feature: String,
    },
    Delete {
        artifact: ArtifactKind,
        path: PathBuf,
    },
    RemoveImport {
        component: String,
        feature: String,
    },
}

impl Fix {
    pub fn label(&self) -> &'static str {
        match self {
            Fix::Generate { artifact, .. } => match artifact {
                ArtifactKind::Feature => "generate_feature",
                ArtifactKind::Native => "generate_native",
                ArtifactKind::Web => "generate_web",
            },
            Fix::Delete { artifact, .. } => match artifact {
                ArtifactKind::Feature => "delete_feature",
                ArtifactKind::Native => "delete_native",
                ArtifactKind::Web => "delete_web",
            },
            Fix::AddImport { .. } => "add_import",
            Fix::RemoveImport { .. } => "remove_import",
        }
    }

    pub fn is_import(&self) -> bool {
        matches!(self, Fix::AddImport { .. } | Fix::RemoveImport { .. })
    }

    pub fn describe(&self, layout: &ProjectLayout) -> String {
        match self {
            Fix::Generate { screen, path, .. } => format!(
                "{}: {} for {} in {}",
                self.label(),
                layout.relative(path).display(),
                screen.entry.name,
                screen.parent.name
            ),
            Fix::Delete { path, .. } => {
                format!("{}: {}", self.label(), layout.relative(path).display())
            }
            Fix::AddImport { component, feature } | Fix::RemoveImport { component, feature } => {
                format!(
                    "{}: {component} from {}",
                    self.label(),
                    feature_import_path(&layout.import_prefix, feature)
                )
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditMode {
    Report,
    Interactive,
    ApplyAll,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    pub fixes: Vec<Fix>,
    pub fixes_applied: usize,
    pub ast_modified: bool,
    pub touched: Vec<PathBuf>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.fixes.is_empty()
    }
}

pub fn propose(
    snapshot: &Snapshot,
    document: &LayoutDocument,
    inventory: &ArtifactInventory,
    layout: &ProjectLayout,
) -> Vec<Fix> {
    let mut fixes: Vec<Fix> = Vec::new();
    let mut push = |fix: Fix| {
        if !fixes.contains(&fix) {
            fixes.push(fix);
        }
    };

    let mut seen = HashSet::new();
    let declared: Vec<&DeclaredScreen> = snapshot
        .screens
        .iter()
        .filter(|s| seen.insert(s.key()))
        .collect();

    for screen in &declared {
        let clean = clean_feature_name(&screen.entry.name);
        let segment = route_segment(&screen.entry.name);
        let paths = layout.screen_paths(&screen.entry.name, &screen.parent);

        for artifact in ArtifactKind::ALL {
            let present = match artifact {
                ArtifactKind::Feature => inventory.features.contains_key(clean),
                kind => inventory.has_route(kind, &screen.parent.route_path, segment),
            };
            if !present {
                push(Fix::Generate {
                    artifact,
                    screen: (*screen).clone(),
                    path: paths.file(artifact),
                });
            }
        }

        let module = feature_import_path(&layout.import_prefix, clean);
        let imported = document
            .imports
            .iter()
            .any(|i| {
                !i.type_only
                    && i.module == module
                    && i.names.iter().any(|n| n.local == screen.entry.component)
            });
        if !imported {
            push(Fix::AddImport {
                component: screen.entry.component.clone(),
                feature: clean.to_string(),
            });
        }
    }

    for (feature, dir) in &inventory.features {
        let claimed = declared
            .iter()
            .any(|s| clean_feature_name(&s.entry.name) == feature);
        if !claimed {
            push(Fix::Delete {
                artifact: ArtifactKind::Feature,
                path: dir.clone(),
            });
        }
    }

    for artifact in [ArtifactKind::Native, ArtifactKind::Web] {
        for route in inventory.routes(artifact) {
            let claimed = declared.iter().any(|s| {
                s.parent.route_path == route.route_path
                    && route_segment(&s.entry.name) == route.segment
            });
            if !claimed {
                push(Fix::Delete {
                    artifact,
                    path: route.dir.clone(),
                });
            }
        }
    }

    for import in document.imports.iter().filter(|i| !i.type_only) {
        let Some(feature) = feature_from_import(&layout.import_prefix, &import.module) else {
            continue;
        };
        for name in &import.names {
            let claimed = declared.iter().any(|s| {
                s.entry.component == name.local && clean_feature_name(&s.entry.name) == feature
            });
            if !claimed {
                push(Fix::RemoveImport {
                    component: name.local.clone(),
                    feature: feature.to_string(),
                });
            }
        }
    }

    fixes
}

pub fn select(fixes: &[Fix], mode: AuditMode, decider: &dyn Decider, layout: &ProjectLayout) -> Vec<Fix> {
    match mode {
        AuditMode::Report => Vec::new(),
        AuditMode::ApplyAll => fixes.to_vec(),
        AuditMode::Interactive => {
            if fixes.is_empty() {
                return Vec::new();
            }
            let items: Vec<String> = fixes.iter().map(|f| f.describe(layout)).collect();
            decider
                .select("Select fixes to apply", &items)
                .into_iter()
                .filter_map(|i| fixes.get(i).cloned())
                .collect()
        }
    }
}

pub async fn apply_files(selected: &[Fix], projector: &Projector<'_>) -> (usize, Vec<PathBuf>) {
    let mut applied = 0;
    let mut touched = Vec::new();

    for fix in selected {
        let outcome = match fix {
            Fix::Generate {
                artifact, screen, ..
            } => projector
                .generate(screen, *artifact, false, true)
                .await
                .map(|path| path.into_iter().collect::<Vec<_>>()),
            Fix::Delete { path, .. } => projector
                .remove_dir(path)
                .await
                .map(|removed| if removed { vec![path.clone()] } else { Vec::new() }),
            Fix::AddImport { .. } | Fix::RemoveImport { .. } => continue,
        };

        match outcome {
            Ok(paths) => {
                applied += 1;
                touched.extend(paths);
            }
            Err(e) => warn!(fix = fix.label(), "{e:#}"),
        }
    }

    (applied, touched)
}

pub fn import_batch(selected: &[Fix]) -> EditBatch {
    let mut batch = EditBatch::default();
    for fix in selected {
        match fix {
            Fix::AddImport { component, feature } => batch.add_import(component, feature),
            Fix::RemoveImport { component, feature } => {
                batch.remove_import(component, Some(feature.clone()))
            }
            _ => {}
        }
    }
    batch
}

pub fn print_report(report: &AuditReport, layout: &ProjectLayout) {
    if report.is_clean() {
        println!("Layout, files and imports are consistent.");
        return;
    }

    println!("Found {} discrepancies:", report.fixes.len());
    for fix in &report.fixes {
        println!("  {}", fix.describe(layout));
    }

    if report.fixes_applied > 0 {
        println!();
        println!("Applied {} fixes.", report.fixes_applied);
        if report.ast_modified {
            println!("Layout imports were rewritten.");
        }
    } else {
        println!();
        println!("Run 'navsync audit --fix' to apply them.");
    }
}
