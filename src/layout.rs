pub mod parse;
pub mod syntax;

pub use parse::parse;
pub use syntax::{ArrayLit, ListItem, ListSyntax, ObjectLit, Prop, Span, Value};

use crate::model::{
    CommandQueue, DeclaredScreen, LayoutFlags, NavigatorKind, ParentRef, ScreenEntry, Snapshot,
};

#[derive(Debug, Clone)]
pub struct LayoutDocument {
    pub source: String,
    pub imports: Vec<ImportDecl>,
    pub preamble_end: usize,
    pub root_array: ArrayLit,
    pub root: NavigatorNode,
    pub flags: LayoutFlags,
    pub commands: CommandQueue,
    pub commands_value: Option<Span>,
    pub style: SourceStyle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    pub span: Span,
    pub module: String,
    pub default: Option<String>,
    pub names: Vec<ImportName>,
    pub named: Option<ListSyntax>,
    pub namespace: bool,
    pub type_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportName {
    pub imported: String,
    pub local: String,
}

#[derive(Debug, Clone)]
pub struct NavigatorNode {
    pub name: String,
    pub kind: NavigatorKind,
    pub object: ObjectLit,
    pub route_path: Vec<String>,
    pub children: Vec<NavChild>,
}

#[derive(Debug, Clone)]
pub enum NavChild {
    Navigator(NavigatorNode),
    Screen(ScreenNode),
}

#[derive(Debug, Clone)]
pub struct ScreenNode {
    pub entry: ScreenEntry,
    pub span: Span,
    pub index: usize,
}

impl NavigatorNode {
    pub fn parent_ref(&self) -> ParentRef {
        ParentRef {
            name: self.name.clone(),
            kind: self.kind,
            route_path: self.route_path.clone(),
        }
    }

    pub fn screens_array(&self) -> Option<&ArrayLit> {
        self.object.get_array("screens")
    }

    pub fn screens(&self) -> impl Iterator<Item = &ScreenNode> {
        self.children.iter().filter_map(|c| match c {
            NavChild::Screen(s) => Some(s),
            NavChild::Navigator(_) => None,
        })
    }

    pub fn navigators(&self) -> impl Iterator<Item = &NavigatorNode> {
        self.children.iter().filter_map(|c| match c {
            NavChild::Navigator(n) => Some(n),
            NavChild::Screen(_) => None,
        })
    }

    pub fn has_screen(&self, name: &str) -> bool {
        self.screens().any(|s| s.entry.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStyle {
    pub quote: char,
    pub indent_unit: String,
    pub semicolons: bool,
}

impl Default for SourceStyle {
    fn default() -> Self {
        Self {
            quote: '\'',
            indent_unit: "  ".to_string(),
            semicolons: true,
        }
    }
}

impl LayoutDocument {
    pub fn snapshot(&self) -> Snapshot {
        let mut screens = Vec::new();
        collect_screens(&self.root, &mut screens);
        Snapshot { screens }
    }

    pub fn navigators(&self) -> Vec<&NavigatorNode> {
        let mut out = Vec::new();
        collect_navigators(&self.root, &mut out);
        out
    }

    pub fn find_navigator(&self, name: &str) -> Option<&NavigatorNode> {
        self.navigators().into_iter().find(|n| n.name == name)
    }

    pub fn parent_ref(&self, navigator: &str) -> Option<ParentRef> {
        self.find_navigator(navigator).map(NavigatorNode::parent_ref)
    }

    pub fn has_pending_commands(&self) -> bool {
        !self.commands.is_empty()
    }
}

fn collect_screens(navigator: &NavigatorNode, out: &mut Vec<DeclaredScreen>) {
    let parent = navigator.parent_ref();
    for child in &navigator.children {
        match child {
            NavChild::Screen(screen) => out.push(DeclaredScreen {
                parent: parent.clone(),
                entry: screen.entry.clone(),
            }),
            NavChild::Navigator(nested) => collect_screens(nested, out),
        }
    }
}

fn collect_navigators<'a>(navigator: &'a NavigatorNode, out: &mut Vec<&'a NavigatorNode>) {
    out.push(navigator);
    for nested in navigator.navigators() {
        collect_navigators(nested, out);
    }
}
