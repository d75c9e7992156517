pub mod list;
pub mod print;
pub mod render;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, warn};

use crate::config::Conventions;
use crate::error::RewriteError;
use crate::layout::syntax::{line_start, ObjectLit, Value};
use crate::layout::{self, LayoutDocument, NavigatorNode};
use crate::model::{ScreenEntry, ScreenKey};
use crate::naming::{feature_from_import, feature_import_path};
use list::{ListPlan, starts_line};
pub use print::{Printer, Splice, SplicePrinter};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBatch {
    pub screens_to_add: Vec<ScreenInsert>,
    pub screens_to_delete: Vec<ScreenKey>,
    pub imports_to_add: Vec<ImportSpec>,
    pub imports_to_remove: Vec<ImportRemoval>,
    pub option_patches: Vec<OptionPatch>,
    pub clear_commands: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenInsert {
    pub parent: String,
    pub entry: ScreenEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportSpec {
    pub component: String,
    pub feature: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRemoval {
    pub component: String,
    pub feature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionPatch {
    pub navigator: String,
    pub path: Vec<String>,
    pub value: Scalar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl EditBatch {
    pub fn is_empty(&self) -> bool {
        self.screens_to_add.is_empty()
            && self.screens_to_delete.is_empty()
            && self.imports_to_add.is_empty()
            && self.imports_to_remove.is_empty()
            && self.option_patches.is_empty()
            && !self.clear_commands
    }

    pub fn add_import(&mut self, component: impl Into<String>, feature: impl Into<String>) {
        let spec = ImportSpec {
            component: component.into(),
            feature: feature.into(),
        };
        if !self.imports_to_add.contains(&spec) {
            self.imports_to_add.push(spec);
        }
    }

    pub fn remove_import(&mut self, component: impl Into<String>, feature: Option<String>) {
        let removal = ImportRemoval {
            component: component.into(),
            feature,
        };
        if !self.imports_to_remove.contains(&removal) {
            self.imports_to_remove.push(removal);
        }
    }
}

pub fn rewrite(
    source: &str,
    batch: &EditBatch,
    conventions: &Conventions,
) -> Result<String, RewriteError> {
    let document = layout::parse(source, conventions)?;
    rewrite_document(&document, batch, conventions, &SplicePrinter)
}

pub fn rewrite_document(
    document: &LayoutDocument,
    batch: &EditBatch,
    conventions: &Conventions,
    printer: &dyn Printer,
) -> Result<String, RewriteError> {
    if batch.is_empty() {
        return Ok(document.source.clone());
    }
    let splices = plan(document, batch, conventions)?;
    let text = printer.print(&document.source, splices)?;
    layout::parse(&text, conventions).map_err(RewriteError::Unparsable)?;
    Ok(text)
}

pub fn plan(
    document: &LayoutDocument,
    batch: &EditBatch,
    conventions: &Conventions,
) -> Result<Vec<Splice>, RewriteError> {
    let mut planner = Planner {
        document,
        conventions,
        lists: BTreeMap::new(),
        splices: Vec::new(),
    };

    planner.delete_screens(&batch.screens_to_delete);
    planner.insert_screens(&batch.screens_to_add, &batch.screens_to_delete)?;
    for patch in &batch.option_patches {
        planner.patch_option(patch)?;
    }
    planner.edit_imports(&batch.imports_to_add, &batch.imports_to_remove);
    if batch.clear_commands {
        planner.clear_commands();
    }

    Ok(planner.finish())
}

struct Planner<'a> {
    document: &'a LayoutDocument,
    conventions: &'a Conventions,
    lists: BTreeMap<usize, ListPlan>,
    splices: Vec<Splice>,
}

impl<'a> Planner<'a> {
    fn list(&mut self, syntax: &crate::layout::ListSyntax) -> &mut ListPlan {
        self.lists
            .entry(syntax.open)
            .or_insert_with(|| ListPlan::new(syntax))
    }

    fn finish(self) -> Vec<Splice> {
        let source = &self.document.source;
        let unit = &self.document.style.indent_unit;
        let mut splices = self.splices;
        for plan in self.lists.values() {
            splices.extend(plan.splices(source, unit));
        }
        splices
    }

    fn navigator(&self, name: &str) -> Result<&'a NavigatorNode, RewriteError> {
        self.document
            .find_navigator(name)
            .ok_or_else(|| RewriteError::NavigatorMissing(name.to_string()))
    }

    fn delete_screens(&mut self, keys: &[ScreenKey]) {
        for key in keys {
            let Some(navigator) = self.document.find_navigator(&key.parent) else {
                debug!(screen = %key, "navigator already gone");
                continue;
            };
            let Some(array) = navigator.screens_array() else {
                continue;
            };
            let indices: Vec<usize> = navigator
                .screens()
                .filter(|s| s.entry.name == key.name)
                .map(|s| s.index)
                .collect();
            if indices.is_empty() {
                debug!(screen = %key, "screen already absent");
                continue;
            }
            self.list(&array.list).remove.extend(indices);
        }
    }

    fn insert_screens(
        &mut self,
        inserts: &[ScreenInsert],
        deleted: &[ScreenKey],
    ) -> Result<(), RewriteError> {
        let mut grouped: BTreeMap<&str, Vec<&ScreenInsert>> = BTreeMap::new();
        for insert in inserts {
            grouped.entry(insert.parent.as_str()).or_default().push(insert);
        }

        let document = self.document;
        let conventions = self.conventions;
        let root_navigator = conventions.root_navigator.as_str();
        let style = &document.style;
        for (parent, group) in grouped {
            let navigator = self.navigator(parent)?;
            let parent_ref = navigator.parent_ref();
            let mut seen = HashSet::new();

            let rendered: Vec<String> = group
                .into_iter()
                .filter(|insert| {
                    let replaced = deleted
                        .iter()
                        .any(|k| k.parent == parent && k.name == insert.entry.name);
                    let exists = navigator.has_screen(&insert.entry.name) && !replaced;
                    if exists {
                        debug!(screen = %insert.entry.name, navigator = parent, "already declared");
                    }
                    !exists && seen.insert(insert.entry.name.clone())
                })
                .map(|insert| render::screen(&insert.entry, &parent_ref, root_navigator, style))
                .collect();

            if rendered.is_empty() {
                continue;
            }

            match navigator.screens_array() {
                Some(array) => self.list(&array.list).append.extend(rendered),
                None => {
                    let property =
                        render::property("screens", &render::array(&rendered, style), style);
                    self.list(&navigator.object.list).append.push(property);
                }
            }
        }
        Ok(())
    }

    fn patch_option(&mut self, patch: &OptionPatch) -> Result<(), RewriteError> {
        let navigator = self.navigator(&patch.navigator)?;
        let document = self.document;
        let style = &document.style;
        let leaf = render::scalar(&patch.value, style);
        let conflict = || RewriteError::OptionConflict {
            navigator: patch.navigator.clone(),
            path: patch.path.join("."),
        };

        let Some((last, parents)) = patch.path.split_last() else {
            return Ok(());
        };

        let mut object: &ObjectLit = &navigator.object;
        for (depth, segment) in parents.iter().enumerate() {
            match object.get(segment) {
                Some(Value::Object(inner)) => object = inner,
                Some(_) => return Err(conflict()),
                None => {
                    let property = render::nested_property(&patch.path[depth..], &leaf, style);
                    self.list(&object.list).append.push(property);
                    return Ok(());
                }
            }
        }

        match object.get(last) {
            Some(Value::Object(_)) | Some(Value::Array(_)) => Err(conflict()),
            Some(existing) => {
                let span = existing.span();
                self.splices.push(Splice::replace(span.start, span.end, leaf));
                Ok(())
            }
            None => {
                let property = render::property(last, &leaf, style);
                self.list(&object.list).append.push(property);
                Ok(())
            }
        }
    }

    fn edit_imports(&mut self, adds: &[ImportSpec], removals: &[ImportRemoval]) {
        let document = self.document;
        let conventions = self.conventions;
        let prefix = &conventions.import_prefix;

        let removals: Vec<&ImportRemoval> = removals
            .iter()
            .filter(|removal| {
                let readded = adds.iter().any(|add| {
                    add.component == removal.component
                        && removal.feature.as_ref().is_none_or(|f| *f == add.feature)
                });
                if readded {
                    debug!(component = %removal.component, "import removal cancelled by re-add");
                }
                !readded
            })
            .collect();

        let mut doomed: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
        for (i, import) in document.imports.iter().enumerate() {
            if import.type_only {
                continue;
            }
            let Some(feature) = feature_from_import(prefix, &import.module) else {
                continue;
            };
            for (n, name) in import.names.iter().enumerate() {
                let hit = removals.iter().any(|r| {
                    r.component == name.local && r.feature.as_deref().is_none_or(|f| f == feature)
                });
                if hit {
                    doomed.entry(i).or_default().insert(n);
                }
            }
        }

        let mut dropped_statements = BTreeSet::new();
        for (i, names) in &doomed {
            let import = &document.imports[*i];
            let whole = names.len() == import.names.len()
                && import.default.is_none()
                && !import.namespace;
            match &import.named {
                Some(list) if !whole && list.items.len() == import.names.len() => {
                    self.list(list).remove.extend(names.iter().copied());
                }
                _ if whole => {
                    dropped_statements.insert(*i);
                    self.splices.push(statement_removal(&document.source, import.span));
                }
                _ => warn!(module = %import.module, "cannot edit import bindings in place"),
            }
        }

        let survives = |component: &str, module: &str| {
            document.imports.iter().enumerate().any(|(i, import)| {
                !import.type_only
                    && import.module == module
                    && import.names.iter().enumerate().any(|(n, name)| {
                        name.local == component
                            && !doomed.get(&i).is_some_and(|names| names.contains(&n))
                    })
            })
        };

        let mut queued = HashSet::new();
        let lines: Vec<String> = adds
            .iter()
            .filter_map(|add| {
                let module = feature_import_path(prefix, &add.feature);
                if survives(&add.component, &module)
                    || !queued.insert((add.component.clone(), module.clone()))
                {
                    return None;
                }
                Some(render::import(&add.component, &module, &document.style))
            })
            .collect();

        if lines.is_empty() {
            return;
        }

        let splice = match document.imports.iter().enumerate().last() {
            Some((i, last)) if dropped_statements.contains(&i) => {
                let at = line_start(&document.source, last.span.start);
                Splice::insert(at, lines.iter().map(|l| format!("{l}\n")).collect::<String>())
            }
            Some((_, last)) => Splice::insert(
                last.span.end,
                lines.iter().map(|l| format!("\n{l}")).collect::<String>(),
            ),
            None => Splice::insert(
                document.preamble_end,
                lines.iter().map(|l| format!("{l}\n")).collect::<String>(),
            ),
        };
        self.splices.push(splice);
    }

    fn clear_commands(&mut self) {
        if let Some(span) = self.document.commands_value {
            self.splices
                .push(Splice::replace(span.start, span.end, render::empty_commands()));
        }
    }
}

fn statement_removal(source: &str, span: crate::layout::Span) -> Splice {
    let rest = &source[span.end..];
    let blanks = rest.len() - rest.trim_start_matches([' ', '\t']).len();
    let after = &rest[blanks..];
    let line_ends = after.is_empty() || after.starts_with('\n') || after.starts_with("\r\n");
    if starts_line(source, span.start) && line_ends {
        let newline = after.find('\n').map(|i| i + 1).unwrap_or(0);
        Splice::remove(line_start(source, span.start), span.end + blanks + newline)
    } else {
        Splice::remove(span.start, span.end)
    }
}
