use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigatorKind {
    Stack,
    Tabs,
    Drawer,
}

impl NavigatorKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "stack" => Some(NavigatorKind::Stack),
            "tabs" => Some(NavigatorKind::Tabs),
            "drawer" => Some(NavigatorKind::Drawer),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            NavigatorKind::Stack => "stack",
            NavigatorKind::Tabs => "tabs",
            NavigatorKind::Drawer => "drawer",
        }
    }

    pub fn options_key(self) -> &'static str {
        match self {
            NavigatorKind::Stack => "stackNavigatorOptions",
            NavigatorKind::Tabs => "tabNavigatorOptions",
            NavigatorKind::Drawer => "drawerNavigatorOptions",
        }
    }
}

impl fmt::Display for NavigatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentRef {
    pub name: String,
    pub kind: NavigatorKind,
    pub route_path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenEntry {
    pub name: String,
    pub component: String,
    pub href: Option<String>,
    pub title: Option<String>,
    pub icon: Option<String>,
    pub label: Option<String>,
    pub visibility: Option<Vec<String>>,
}

impl ScreenEntry {
    pub fn new(name: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            component: component.into(),
            href: None,
            title: None,
            icon: None,
            label: None,
            visibility: None,
        }
    }

    pub fn differs_from(&self, other: &ScreenEntry) -> bool {
        self.component != other.component
            || self.title != other.title
            || self.icon != other.icon
            || self.label != other.label
            || self.href != other.href
            || self.visibility != other.visibility
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredScreen {
    pub parent: ParentRef,
    pub entry: ScreenEntry,
}

impl DeclaredScreen {
    pub fn key(&self) -> ScreenKey {
        ScreenKey {
            parent: self.parent.name.clone(),
            name: self.entry.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScreenKey {
    pub parent: String,
    pub name: String,
}

impl ScreenKey {
    pub fn new(parent: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ScreenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.name, self.parent)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub screens: Vec<DeclaredScreen>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    pub fn find(&self, key: &ScreenKey) -> Option<&DeclaredScreen> {
        self.screens
            .iter()
            .find(|s| s.parent.name == key.parent && s.entry.name == key.name)
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.screens.iter().map(|s| s.entry.component.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCommand {
    pub name: String,
    pub component: Option<String>,
    pub title: Option<String>,
    pub icon: Option<String>,
    pub label: Option<String>,
    pub href: Option<String>,
    pub parent: Option<String>,
}

impl PendingCommand {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandQueue {
    pub add: Vec<PendingCommand>,
    pub delete: Vec<PendingCommand>,
}

impl CommandQueue {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.delete.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutFlags {
    pub autosave: bool,
    pub editing: bool,
}
