use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::model::{DeclaredScreen, ScreenKey, Snapshot};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub added: Vec<DeclaredScreen>,
    pub removed: Vec<DeclaredScreen>,
    pub updated: Vec<ScreenChange>,
    pub renamed: Vec<ScreenChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenChange {
    pub old: DeclaredScreen,
    pub new: DeclaredScreen,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.updated.is_empty()
            && self.renamed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.updated.len() + self.renamed.len()
    }

    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        for (count, label) in [
            (self.added.len(), "added"),
            (self.removed.len(), "removed"),
            (self.updated.len(), "updated"),
            (self.renamed.len(), "renamed"),
        ] {
            if count > 0 {
                parts.push(format!("{count} {label}"));
            }
        }
        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

pub fn diff(current: &Snapshot, previous: &Snapshot) -> ChangeSet {
    let current = unique(current);
    let previous = unique(previous);

    let current_keys: HashSet<ScreenKey> = current.iter().map(|s| s.key()).collect();
    let previous_by_key: HashMap<ScreenKey, &DeclaredScreen> =
        previous.iter().map(|s| (s.key(), *s)).collect();

    let mut changes = ChangeSet::default();

    for screen in &current {
        if let Some(old) = previous_by_key.get(&screen.key()) {
            if screen.entry.differs_from(&old.entry) {
                changes.updated.push(ScreenChange {
                    old: (*old).clone(),
                    new: (*screen).clone(),
                });
            }
        }
    }

    let fresh: Vec<&DeclaredScreen> = current
        .iter()
        .copied()
        .filter(|s| !previous_by_key.contains_key(&s.key()))
        .collect();
    let mut matched = vec![false; fresh.len()];

    for old in previous.iter().filter(|s| !current_keys.contains(&s.key())) {
        let candidate = fresh
            .iter()
            .enumerate()
            .find(|(i, new)| !matched[*i] && new.entry.component == old.entry.component)
            .map(|(i, _)| i);

        match candidate {
            Some(i) => {
                matched[i] = true;
                changes.renamed.push(ScreenChange {
                    old: (*old).clone(),
                    new: fresh[i].clone(),
                });
            }
            None => changes.removed.push((*old).clone()),
        }
    }

    changes.added = fresh
        .iter()
        .zip(&matched)
        .filter(|(_, taken)| !**taken)
        .map(|(screen, _)| (*screen).clone())
        .collect();

    changes
}

fn unique(snapshot: &Snapshot) -> Vec<&DeclaredScreen> {
    let mut seen = HashSet::new();
    snapshot
        .screens
        .iter()
        .filter(|s| seen.insert(s.key()))
        .collect()
}
