use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

use super::{Engine, Phase};
use crate::journal::{UnitKind, content_hash};
use crate::layout::LayoutDocument;
use crate::model::{DeclaredScreen, NavigatorKind, ParentRef, PendingCommand, ScreenEntry};
use crate::naming::{
    clean_feature_name, component_for, default_href, display_title, is_identifier,
    sanitize_cli_name, screen_name_for,
};
use crate::rewrite::{EditBatch, OptionPatch, Scalar, ScreenInsert};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenOp {
    Add,
    Delete,
}

impl ScreenOp {
    fn verb(self) -> &'static str {
        match self {
            ScreenOp::Add => "added to",
            ScreenOp::Delete => "deleted from",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreensRequest {
    #[serde(default)]
    pub navigators: Vec<NavigatorScreens>,
    #[serde(default)]
    pub initial_route: Option<InitialRoute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigatorScreens {
    pub navigator: String,
    #[serde(default)]
    pub screens: Vec<ScreenSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenSpec {
    pub name: String,
    #[serde(default, alias = "componentName")]
    pub component: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub show_on: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialRoute {
    pub navigator: String,
    pub route: String,
}

impl Engine {
    pub async fn run_command(
        &mut self,
        op: ScreenOp,
        names: &[String],
        parent: Option<&str>,
        dry_run: bool,
    ) -> Result<()> {
        self.session.set_phase(Phase::ActionInProgress);
        let result = self.run_command_inner(op, names, parent, dry_run).await;
        self.session.set_phase(Phase::Idle);
        result
    }

    async fn run_command_inner(
        &mut self,
        op: ScreenOp,
        names: &[String],
        parent: Option<&str>,
        dry_run: bool,
    ) -> Result<()> {
        let document = self.document().await?;
        let parent = parent
            .map(|name| {
                document
                    .parent_ref(name)
                    .ok_or_else(|| anyhow!("navigator `{name}` not found in layout"))
            })
            .transpose()?;

        let mut batch = EditBatch::default();
        for raw in names {
            let clean = sanitize_cli_name(raw);
            if clean.is_empty() {
                warn!(name = %raw, "invalid screen name, skipping");
                continue;
            }
            match op {
                ScreenOp::Add => {
                    let target = match &parent {
                        Some(target) => target.clone(),
                        None => match self.choose_parent(&document, &clean, op) {
                            Some(target) => target,
                            None => {
                                info!(screen = %clean, "no navigator chosen, skipping");
                                continue;
                            }
                        },
                    };
                    let entry = self.describe_screen(&clean, &target);
                    queue_insert(&mut batch, &document, &target, entry);
                }
                ScreenOp::Delete => {
                    let Some(screen) = self.delete_target(&document, &clean, parent.as_ref()) else {
                        continue;
                    };
                    let question = format!(
                        "Confirm removal of screen '{}' from '{}' in the layout?",
                        screen.entry.name, screen.parent.name
                    );
                    if !self.decider.confirm(&question, true) {
                        info!(screen = %screen.entry.name, "removal skipped");
                        continue;
                    }
                    queue_delete(&mut batch, &document, &screen);
                }
            }
        }

        if dry_run {
            if batch.is_empty() {
                println!("No layout changes.");
            } else {
                print!("{}", self.preview(&document, &batch)?);
            }
            return Ok(());
        }

        let mut touched = Vec::new();
        if batch.is_empty() {
            info!("no layout changes");
        } else {
            let subject = match op {
                ScreenOp::Add => "add",
                ScreenOp::Delete => "delete",
            };
            if self.rewrite_journalled(&document, &batch, subject).await? {
                touched.push(self.config.layout_path());
            }
        }

        let document = self.document().await?;
        self.process_batch(document, touched).await
    }

    pub(crate) async fn execute_pending(
        &mut self,
        document: LayoutDocument,
    ) -> Result<(LayoutDocument, Vec<PathBuf>)> {
        info!(
            add = document.commands.add.len(),
            delete = document.commands.delete.len(),
            "applying commands from layout"
        );
        let mut batch = EditBatch {
            clear_commands: true,
            ..EditBatch::default()
        };

        for command in &document.commands.add {
            let clean = sanitize_cli_name(clean_feature_name(&command.name));
            if clean.is_empty() {
                warn!(name = %command.name, "invalid command screen name, skipping");
                continue;
            }
            let Some(target) = self.command_parent(&document, command, &clean, ScreenOp::Add)
            else {
                continue;
            };
            let entry = ScreenEntry {
                name: screen_name_for(&clean),
                component: command
                    .component
                    .clone()
                    .unwrap_or_else(|| component_for(&clean)),
                href: command.href.clone(),
                title: command.title.clone(),
                icon: command.icon.clone(),
                label: command.label.clone(),
                visibility: None,
            };
            queue_insert(&mut batch, &document, &target, entry);
        }

        for command in &document.commands.delete {
            let clean = sanitize_cli_name(clean_feature_name(&command.name));
            let parent = match command.parent.as_deref() {
                Some(name) => match document.parent_ref(name) {
                    Some(parent) => Some(parent),
                    None => {
                        warn!(navigator = name, "command names an unknown navigator, skipping");
                        continue;
                    }
                },
                None => None,
            };
            if let Some(screen) = self.delete_target(&document, &clean, parent.as_ref()) {
                queue_delete(&mut batch, &document, &screen);
            }
        }

        let mut touched = Vec::new();
        if self.rewrite_journalled(&document, &batch, "commands").await? {
            touched.push(self.config.layout_path());
        }
        let document = self.document().await?;
        Ok((document, touched))
    }

    pub async fn set_initial_route(
        &mut self,
        navigator: &str,
        route: &str,
        dry_run: bool,
    ) -> Result<()> {
        let document = self.document().await?;
        let batch = EditBatch {
            option_patches: vec![initial_route_patch(&document, navigator, route, &[])?],
            ..EditBatch::default()
        };

        if dry_run {
            print!("{}", self.preview(&document, &batch)?);
            return Ok(());
        }

        if self
            .rewrite_journalled(&document, &batch, "initial-route")
            .await?
        {
            let layout = self.config.layout_path();
            self.offer_commit(&[layout], 1).await;
        } else {
            info!(navigator, route, "initial route already set");
        }
        Ok(())
    }

    pub async fn apply_request(&mut self, request: &ScreensRequest) -> Result<Vec<String>> {
        self.session.set_phase(Phase::ActionInProgress);
        let result = self.apply_request_inner(request).await;
        self.session.set_phase(Phase::Idle);
        result
    }

    async fn apply_request_inner(&mut self, request: &ScreensRequest) -> Result<Vec<String>> {
        let document = self.document().await?;
        let mut output = Vec::new();
        let mut batch = EditBatch::default();

        for group in &request.navigators {
            let Some(target) = document.parent_ref(&group.navigator) else {
                bail!("navigator `{}` not found in layout", group.navigator);
            };
            for spec in &group.screens {
                let clean = sanitize_cli_name(clean_feature_name(&spec.name));
                if clean.is_empty() {
                    output.push(format!("Skipped invalid screen name '{}'", spec.name));
                    continue;
                }
                let component = spec
                    .component
                    .clone()
                    .filter(|c| is_identifier(c))
                    .unwrap_or_else(|| component_for(&clean));
                let entry = ScreenEntry {
                    name: screen_name_for(&clean),
                    component,
                    href: spec.href.clone(),
                    title: spec.title.clone(),
                    icon: spec.icon.clone(),
                    label: spec.label.clone(),
                    visibility: spec.show_on.clone(),
                };
                let name = entry.name.clone();
                let component = entry.component.clone();
                match queue_insert(&mut batch, &document, &target, entry) {
                    Queued::Added => output.push(format!("Adding {name} to {}", target.name)),
                    Queued::Exists => {
                        output.push(format!("{name} already exists in {}", target.name))
                    }
                    Queued::InvalidComponent => output.push(format!(
                        "Skipped '{}': {component} is not a valid component name",
                        spec.name
                    )),
                }
            }
        }

        if let Some(initial) = &request.initial_route {
            let patch = initial_route_patch(
                &document,
                &initial.navigator,
                &initial.route,
                &batch.screens_to_add,
            )?;
            batch.option_patches.push(patch);
            output.push(format!(
                "Setting initial route of {} to {}",
                initial.navigator, initial.route
            ));
        }

        if batch.is_empty() {
            output.push("Nothing to change".to_string());
            return Ok(output);
        }

        let mut touched = Vec::new();
        if self.rewrite_journalled(&document, &batch, "request").await? {
            touched.push(self.config.layout_path());
            output.push("Layout updated".to_string());
        }

        let document = self.document().await?;
        self.process_batch(document, touched).await?;
        output.push("Files and imports synchronized".to_string());
        Ok(output)
    }

    async fn rewrite_journalled(
        &mut self,
        document: &LayoutDocument,
        batch: &EditBatch,
        subject: &str,
    ) -> Result<bool> {
        let kind = if batch.clear_commands {
            UnitKind::Commands
        } else {
            UnitKind::Rewrite
        };
        let unit = self
            .journal
            .begin(kind, Some(subject), Some(content_hash(&document.source)))
            .await;
        match self.apply_edits(document, batch).await {
            Ok(Some(hash)) => {
                let layout = self.config.layout_path();
                self.journal.complete(&unit, &[layout], Some(hash)).await;
                Ok(true)
            }
            Ok(None) => {
                self.journal.complete(&unit, &[], None).await;
                Ok(false)
            }
            Err(e) => {
                self.journal.fail(&unit, &format!("{e:#}")).await;
                Err(e)
            }
        }
    }

    fn choose_parent(&self, document: &LayoutDocument, clean: &str, op: ScreenOp) -> Option<ParentRef> {
        let mut candidates: Vec<ParentRef> = document
            .navigators()
            .into_iter()
            .filter(|n| n.kind != NavigatorKind::Stack)
            .map(|n| n.parent_ref())
            .collect();
        if candidates.is_empty() {
            candidates.push(document.root.parent_ref());
        }

        let options: Vec<String> = candidates
            .iter()
            .map(|c| format!("{} ({})", c.name, c.kind))
            .collect();
        let question = format!(
            "For screen '{clean}', which navigator should it be {}?",
            op.verb()
        );
        let index = self.decider.choose(&question, &options)?;
        candidates.into_iter().nth(index)
    }

    fn command_parent(
        &self,
        document: &LayoutDocument,
        command: &PendingCommand,
        clean: &str,
        op: ScreenOp,
    ) -> Option<ParentRef> {
        match command.parent.as_deref() {
            Some(name) => {
                let parent = document.parent_ref(name);
                if parent.is_none() {
                    warn!(navigator = name, "command names an unknown navigator, skipping");
                }
                parent
            }
            None => self.choose_parent(document, clean, op),
        }
    }

    fn describe_screen(&self, clean: &str, target: &ParentRef) -> ScreenEntry {
        let mut entry = ScreenEntry::new(screen_name_for(clean), component_for(clean));
        let question = format!(
            "Use default config for '{clean}' in '{}'? (Comp: {}, Title: {})",
            target.name,
            entry.component,
            display_title(clean)
        );
        if is_identifier(&entry.component) {
            if self.decider.confirm(&question, true) {
                return entry;
            }
        } else {
            warn!(
                screen = clean,
                component = %entry.component,
                "default component name is not a valid identifier"
            );
        }

        let component = self
            .decider
            .input("ComponentName (PascalCaseScreen)", &entry.component);
        if is_identifier(&component) {
            entry.component = component;
        } else {
            warn!(component = %component, "not a valid identifier, keeping default");
        }
        entry.title = Some(self.decider.input("Screen title", &display_title(clean)));
        entry.href = Some(self.decider.input(
            "Screen href",
            &default_href(clean, target, &self.conventions.root_navigator),
        ));
        match target.kind {
            NavigatorKind::Tabs => {
                entry.icon = Some(self.decider.input("tabBarIconName", &clean.to_lowercase()));
            }
            NavigatorKind::Drawer => {
                entry.label = Some(self.decider.input("drawerLabel", &display_title(clean)));
            }
            NavigatorKind::Stack => {}
        }
        entry
    }

    fn delete_target(
        &self,
        document: &LayoutDocument,
        clean: &str,
        parent: Option<&ParentRef>,
    ) -> Option<DeclaredScreen> {
        let snapshot = document.snapshot();
        let candidates: Vec<DeclaredScreen> = snapshot
            .screens
            .into_iter()
            .filter(|s| clean_feature_name(&s.entry.name) == clean)
            .filter(|s| parent.is_none_or(|p| p.name == s.parent.name))
            .collect();

        match candidates.len() {
            0 => {
                warn!(screen = clean, "screen not found in layout, skipping");
                None
            }
            1 => candidates.into_iter().next(),
            _ => {
                let options: Vec<String> =
                    candidates.iter().map(|c| c.parent.name.clone()).collect();
                let question = format!(
                    "For screen '{clean}', which navigator should it be {}?",
                    ScreenOp::Delete.verb()
                );
                let index = self.decider.choose(&question, &options)?;
                candidates.into_iter().nth(index)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Queued {
    Added,
    Exists,
    InvalidComponent,
}

fn queue_insert(
    batch: &mut EditBatch,
    document: &LayoutDocument,
    target: &ParentRef,
    entry: ScreenEntry,
) -> Queued {
    if !is_identifier(&entry.component) {
        warn!(
            screen = %entry.name,
            component = %entry.component,
            "component is not a valid identifier, skipping"
        );
        return Queued::InvalidComponent;
    }

    let exists = document
        .find_navigator(&target.name)
        .is_some_and(|n| n.has_screen(&entry.name))
        || batch
            .screens_to_add
            .iter()
            .any(|i| i.parent == target.name && i.entry.name == entry.name);
    if exists {
        info!(screen = %entry.name, navigator = %target.name, "already declared, skipping");
        return Queued::Exists;
    }

    batch.add_import(&entry.component, clean_feature_name(&entry.name));
    batch.screens_to_add.push(ScreenInsert {
        parent: target.name.clone(),
        entry,
    });
    Queued::Added
}

fn queue_delete(batch: &mut EditBatch, document: &LayoutDocument, screen: &DeclaredScreen) {
    let key = screen.key();
    if batch.screens_to_delete.contains(&key) {
        return;
    }
    batch.screens_to_delete.push(key);

    let feature = clean_feature_name(&screen.entry.name);
    let shared = document.snapshot().screens.iter().any(|s| {
        s.entry.component == screen.entry.component
            && clean_feature_name(&s.entry.name) == feature
            && !batch.screens_to_delete.contains(&s.key())
    });
    if !shared {
        batch.remove_import(&screen.entry.component, Some(feature.to_string()));
    }
}

fn initial_route_patch(
    document: &LayoutDocument,
    navigator: &str,
    route: &str,
    queued: &[ScreenInsert],
) -> Result<OptionPatch> {
    let node = document
        .find_navigator(navigator)
        .ok_or_else(|| anyhow!("navigator `{navigator}` not found in layout"))?;

    let target = node
        .screens()
        .map(|s| s.entry.name.as_str())
        .chain(node.navigators().map(|n| n.name.as_str()))
        .chain(
            queued
                .iter()
                .filter(|i| i.parent == navigator)
                .map(|i| i.entry.name.as_str()),
        )
        .find(|name| *name == route || clean_feature_name(name) == route)
        .ok_or_else(|| anyhow!("`{navigator}` has no route named `{route}`"))?;

    Ok(OptionPatch {
        navigator: navigator.to_string(),
        path: vec![
            node.kind.options_key().to_string(),
            "initialRouteName".to_string(),
        ],
        value: Scalar::Str(target.to_string()),
    })
}
