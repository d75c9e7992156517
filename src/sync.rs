pub mod commands;
pub mod session;

use anyhow::{Context, Result};
use similar::TextDiff;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

pub use commands::{InitialRoute, NavigatorScreens, ScreenOp, ScreenSpec, ScreensRequest};
pub use session::{Phase, Session};

use crate::audit::{self, AuditMode, AuditReport};
use crate::config::{Config, Conventions};
use crate::decide::Decider;
use crate::diff::{ChangeSet, diff};
use crate::error::ParseFailure;
use crate::git::{Git, NoVcs, VersionControl};
use crate::journal::{Journal, UnitKind, content_hash};
use crate::layout::{self, LayoutDocument};
use crate::model::{DeclaredScreen, Snapshot};
use crate::naming::clean_feature_name;
use crate::project::{ProjectLayout, Projector};
use crate::rewrite::{self, EditBatch, SplicePrinter};

pub struct Engine {
    config: Config,
    conventions: Conventions,
    layout: ProjectLayout,
    decider: Arc<dyn Decider>,
    vcs: Arc<dyn VersionControl>,
    journal: Journal,
    session: Session,
    audit_mode: AuditMode,
}

impl Engine {
    pub fn new(config: Config, decider: Arc<dyn Decider>, vcs: Arc<dyn VersionControl>) -> Self {
        let audit_mode = if decider.is_interactive() {
            AuditMode::Interactive
        } else {
            AuditMode::Report
        };
        Self {
            conventions: config.conventions(),
            layout: ProjectLayout::from_config(&config),
            journal: Journal::new(config.state_dir()),
            session: Session::default(),
            config,
            decider,
            vcs,
            audit_mode,
        }
    }

    pub async fn open(config: Config, decider: Arc<dyn Decider>) -> Self {
        let vcs: Arc<dyn VersionControl> = if config.commit.enabled {
            match Git::detect(&config.root).await {
                Some(git) => Arc::new(git),
                None => {
                    debug!("not a git repository, commits disabled");
                    Arc::new(NoVcs)
                }
            }
        } else {
            Arc::new(NoVcs)
        };
        Self::new(config, decider, vcs)
    }

    pub fn with_audit_mode(mut self, mode: AuditMode) -> Self {
        self.audit_mode = mode;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn project(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn decider(&self) -> &dyn Decider {
        self.decider.as_ref()
    }

    pub async fn start(&mut self) -> Result<()> {
        let document = self.document().await?;
        let snapshot = document.snapshot();
        info!(
            layout = %self.layout.relative(&self.config.layout_path()).display(),
            screens = snapshot.len(),
            "layout loaded"
        );
        self.session.acknowledge(snapshot);
        if document.flags.autosave && document.flags.editing {
            self.session.set_phase(Phase::EditingMode);
        }
        Ok(())
    }

    pub async fn document(&self) -> Result<LayoutDocument> {
        let source = self.read_layout().await?;
        Ok(layout::parse(&source, &self.conventions)?)
    }

    async fn read_layout(&self) -> Result<String> {
        let path = self.config.layout_path();
        fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    pub async fn handle_change(&mut self) -> Result<()> {
        if self.session.take_suppression() {
            debug!("change caused by our own write");
            match self.document().await {
                Ok(document) => self.session.acknowledge(document.snapshot()),
                Err(e) => debug!("{e:#}"),
            }
            return Ok(());
        }

        let document = match self.document().await {
            Ok(document) => document,
            Err(e) => {
                report_parse_error(&e);
                return Ok(());
            }
        };

        let flags = document.flags;
        if flags.autosave && flags.editing && !document.has_pending_commands() {
            if self.session.phase() != Phase::EditingMode {
                info!("editing mode on, waiting for isEditing = false");
            }
            self.session.set_phase(Phase::EditingMode);
            return Ok(());
        }
        if self.session.phase() == Phase::EditingMode {
            info!("editing mode off, processing changes");
        }

        self.session.set_phase(Phase::ActionInProgress);
        let result = self.run_pass(document).await;
        self.session.set_phase(Phase::Idle);
        result
    }

    async fn run_pass(&mut self, document: LayoutDocument) -> Result<()> {
        let (document, touched) = if document.has_pending_commands() {
            self.execute_pending(document).await?
        } else {
            (document, Vec::new())
        };
        self.process_batch(document, touched).await
    }

    pub async fn process_batch(
        &mut self,
        document: LayoutDocument,
        carried: Vec<PathBuf>,
    ) -> Result<()> {
        let current = document.snapshot();
        let Some(previous) = self.session.acknowledged().cloned() else {
            info!(screens = current.len(), "first successful parse, acknowledging layout");
            self.session.acknowledge(current);
            return Ok(());
        };

        let changes = diff(&current, &previous);
        let mut touched = carried;

        if changes.is_empty() {
            debug!("no screen changes");
        } else {
            info!(changes = %changes.summary(), "layout changed");
            let question = format!(
                "{}\nDo you want to proceed with these changes now?",
                describe_changes(&changes)
            );
            if self.decider.confirm(&question, true) {
                let batch = self.project_changes(&changes, &current, &mut touched).await;
                if !batch.is_empty() {
                    let unit = self
                        .journal
                        .begin(UnitKind::Rewrite, Some("imports"), Some(content_hash(&document.source)))
                        .await;
                    match self.apply_edits(&document, &batch).await {
                        Ok(Some(after)) => {
                            touched.push(self.config.layout_path());
                            self.journal
                                .complete(&unit, &[self.config.layout_path()], Some(after))
                                .await;
                        }
                        Ok(None) => self.journal.complete(&unit, &[], None).await,
                        Err(e) => {
                            self.journal.fail(&unit, &format!("{e:#}")).await;
                            return Err(e);
                        }
                    }
                }
            } else {
                info!("changes left unsynchronized, run 'navsync audit' to reconcile later");
            }
        }

        self.offer_commit(&touched, changes.len()).await;

        let mode = self.audit_mode;
        if let Err(e) = self.audit(mode).await {
            warn!("post-change audit failed: {e:#}");
        }

        match self.document().await {
            Ok(document) => self.session.acknowledge(document.snapshot()),
            Err(e) => {
                report_parse_error(&e);
                self.session.acknowledge(current);
            }
        }
        Ok(())
    }

    async fn project_changes(
        &mut self,
        changes: &ChangeSet,
        current: &Snapshot,
        touched: &mut Vec<PathBuf>,
    ) -> EditBatch {
        let projector = Projector::new(&self.layout, self.decider.as_ref());
        let journal = &self.journal;
        let mut batch = EditBatch::default();

        for screen in &changes.removed {
            let unit = journal
                .begin(UnitKind::Delete, Some(&screen.entry.name), None)
                .await;
            match projector.delete(screen).await {
                Ok(paths) => {
                    journal.complete(&unit, &paths, None).await;
                    touched.extend(paths);
                }
                Err(e) => {
                    warn!(screen = %screen.entry.name, "{e:#}");
                    journal.fail(&unit, &format!("{e:#}")).await;
                }
            }
            drop_import_if_unused(&mut batch, screen, current);
        }

        for change in &changes.renamed {
            let (old, new) = (&change.old, &change.new);
            let subject = format!("{} -> {}", old.entry.name, new.entry.name);
            let unit = journal.begin(UnitKind::Rename, Some(&subject), None).await;
            match projector.rename(old, new).await {
                Ok(mut paths) => {
                    paths.extend(projector.generate_all(new, true, true).await);
                    journal.complete(&unit, &paths, None).await;
                    touched.extend(paths);
                }
                Err(e) => {
                    warn!(screen = %subject, "{e:#}");
                    journal.fail(&unit, &format!("{e:#}")).await;
                }
            }
            drop_import_if_unused(&mut batch, old, current);
            batch.add_import(&new.entry.component, clean_feature_name(&new.entry.name));
        }

        for change in &changes.updated {
            let (old, new) = (&change.old, &change.new);
            let unit = journal
                .begin(UnitKind::Update, Some(&new.entry.name), None)
                .await;
            let paths = projector.generate_all(new, true, false).await;
            journal.complete(&unit, &paths, None).await;
            touched.extend(paths);
            if old.entry.component != new.entry.component {
                drop_import_if_unused(&mut batch, old, current);
            }
            batch.add_import(&new.entry.component, clean_feature_name(&new.entry.name));
        }

        for screen in &changes.added {
            let unit = journal
                .begin(UnitKind::Add, Some(&screen.entry.name), None)
                .await;
            let paths = projector.generate_all(screen, false, false).await;
            journal.complete(&unit, &paths, None).await;
            touched.extend(paths);
            batch.add_import(&screen.entry.component, clean_feature_name(&screen.entry.name));
        }

        batch
    }

    pub(crate) async fn apply_edits(
        &mut self,
        document: &LayoutDocument,
        batch: &EditBatch,
    ) -> Result<Option<String>> {
        let text =
            rewrite::rewrite_document(document, batch, &self.conventions, &SplicePrinter)?;
        self.write_layout(&document.source, text).await
    }

    async fn write_layout(&mut self, before: &str, after: String) -> Result<Option<String>> {
        if before == after {
            debug!("rewrite produced identical text, not writing");
            return Ok(None);
        }
        let path = self.config.layout_path();
        fs::write(&path, &after)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        self.session.suppress_next_change();
        info!(path = %self.layout.relative(&path).display(), "layout rewritten");
        Ok(Some(content_hash(&after)))
    }

    pub fn preview(&self, document: &LayoutDocument, batch: &EditBatch) -> Result<String> {
        let text =
            rewrite::rewrite_document(document, batch, &self.conventions, &SplicePrinter)?;
        let name = self
            .layout
            .relative(&self.config.layout_path())
            .display()
            .to_string();
        Ok(TextDiff::from_lines(&document.source, &text)
            .unified_diff()
            .context_radius(3)
            .header(&name, &name)
            .to_string())
    }

    pub(crate) async fn offer_commit(&self, files: &[PathBuf], changes: usize) {
        if files.is_empty() || !self.config.commit.enabled {
            return;
        }
        let mut files = files.to_vec();
        files.sort();
        files.dedup();

        let count = changes.max(1);
        if !self
            .decider
            .confirm(&format!("Git Commit {count} changes?"), true)
        {
            info!("commit skipped");
            return;
        }
        if let Err(e) = self.vcs.commit(&files, &self.config.commit.message).await {
            warn!("commit failed: {e:#}");
        }
    }

    pub async fn audit(&mut self, mode: AuditMode) -> Result<AuditReport> {
        let document = self.document().await?;
        let snapshot = document.snapshot();
        let navigator_paths: Vec<Vec<String>> = document
            .navigators()
            .iter()
            .map(|n| n.route_path.clone())
            .collect();

        let inventory = audit::scan(&self.layout, &navigator_paths).await?;
        let fixes = audit::propose(&snapshot, &document, &inventory, &self.layout);
        let mut report = AuditReport {
            fixes,
            ..AuditReport::default()
        };

        if report.is_clean() {
            debug!("audit found nothing to fix");
            return Ok(report);
        }
        info!(fixes = report.fixes.len(), "audit found discrepancies");
        for fix in &report.fixes {
            debug!(fix = %fix.describe(&self.layout), "proposed");
        }

        let selected = audit::select(&report.fixes, mode, self.decider.as_ref(), &self.layout);
        if selected.is_empty() {
            return Ok(report);
        }

        let unit = self
            .journal
            .begin(UnitKind::AuditFix, None, Some(content_hash(&document.source)))
            .await;

        let (applied, mut touched) = {
            let projector = Projector::new(&self.layout, self.decider.as_ref());
            audit::apply_files(&selected, &projector).await
        };
        report.fixes_applied = applied;

        let imports = audit::import_batch(&selected);
        if !imports.is_empty() {
            match self.apply_edits(&document, &imports).await {
                Ok(Some(_)) => {
                    report.ast_modified = true;
                    report.fixes_applied += selected.iter().filter(|f| f.is_import()).count();
                    touched.push(self.config.layout_path());
                }
                Ok(None) => {}
                Err(e) => warn!("import fixes failed: {e:#}"),
            }
        }

        self.journal.complete(&unit, &touched, None).await;
        info!(applied = report.fixes_applied, "audit fixes applied");
        report.touched = touched;
        Ok(report)
    }
}

fn drop_import_if_unused(batch: &mut EditBatch, screen: &DeclaredScreen, current: &Snapshot) {
    let feature = clean_feature_name(&screen.entry.name);
    let still_used = current.screens.iter().any(|s| {
        s.entry.component == screen.entry.component && clean_feature_name(&s.entry.name) == feature
    });
    if !still_used {
        batch.remove_import(&screen.entry.component, Some(feature.to_string()));
    }
}

fn describe_changes(changes: &ChangeSet) -> String {
    let mut lines = Vec::new();
    let mut section = |title: &str, items: Vec<String>| {
        if !items.is_empty() {
            lines.push(format!("{title}:"));
            lines.extend(items.into_iter().map(|i| format!("  - {i}")));
        }
    };
    section(
        "DELETIONS",
        changes.removed.iter().map(|s| s.key().to_string()).collect(),
    );
    section(
        "RENAMES",
        changes
            .renamed
            .iter()
            .map(|c| format!("{} -> {}", c.old.key(), c.new.entry.name))
            .collect(),
    );
    section(
        "UPDATES",
        changes.updated.iter().map(|c| c.new.key().to_string()).collect(),
    );
    section(
        "ADDITIONS",
        changes.added.iter().map(|s| s.key().to_string()).collect(),
    );
    lines.join("\n")
}

fn report_parse_error(error: &anyhow::Error) {
    match error.downcast_ref::<ParseFailure>() {
        Some(failure) if failure.is_transient() => {
            warn!("layout not usable yet: {failure}");
        }
        _ => error!("{error:#}"),
    }
}

#[derive(Debug, Default)]
struct PassState {
    running: bool,
    pending: bool,
}

pub struct SyncService {
    engine: Mutex<Engine>,
    passes: std::sync::Mutex<PassState>,
}

impl SyncService {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Mutex::new(engine),
            passes: std::sync::Mutex::new(PassState::default()),
        }
    }

    fn passes(&self) -> std::sync::MutexGuard<'_, PassState> {
        self.passes.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub async fn notify_change(&self) {
        {
            let mut passes = self.passes();
            if passes.running {
                debug!("pass in progress, re-evaluation queued");
                passes.pending = true;
                return;
            }
            passes.running = true;
        }

        loop {
            {
                let mut engine = self.engine.lock().await;
                if let Err(e) = engine.handle_change().await {
                    error!("sync pass failed: {e:#}");
                }
            }
            let mut passes = self.passes();
            if passes.pending {
                passes.pending = false;
            } else {
                passes.running = false;
                break;
            }
        }
    }

    pub async fn engine(&self) -> MutexGuard<'_, Engine> {
        self.engine.lock().await
    }

    pub fn has_pending(&self) -> bool {
        self.passes().pending
    }
}
