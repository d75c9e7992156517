use std::cell::RefCell;
use tracing::{debug, warn};
use tree_sitter::{Node, Parser};

use super::syntax::{self, ListSyntax, ObjectLit, Span, Value, line_indent, lower, node_text};
use super::{
    ImportDecl, ImportName, LayoutDocument, NavChild, NavigatorNode, ScreenNode, SourceStyle,
};
use crate::config::Conventions;
use crate::error::ParseFailure;
use crate::model::{CommandQueue, LayoutFlags, NavigatorKind, PendingCommand, ScreenEntry};

const AUTOSAVE_FLAG: &str = "isAutoSaveEnabled";
const EDITING_FLAG: &str = "isEditing";
const COMMANDS: &str = "commandsToExecute";

thread_local! {
    static PARSER: RefCell<Parser> = RefCell::new({
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_typescript::LANGUAGE_TSX.into())
            .expect("TSX grammar");
        parser
    });
}

struct Declaration<'t> {
    name: String,
    value: Option<Node<'t>>,
    statement: Node<'t>,
}

pub fn parse(source: &str, conventions: &Conventions) -> Result<LayoutDocument, ParseFailure> {
    let tree = PARSER
        .with(|parser| parser.borrow_mut().parse(source, None))
        .ok_or(ParseFailure::Parser)?;
    let program = tree.root_node();

    if program.has_error() {
        let (line, column) = first_error(program).unwrap_or((1, 1));
        return Err(ParseFailure::Syntax { line, column });
    }

    let mut imports = Vec::new();
    let mut declarations = Vec::new();
    let mut preamble_end = None;

    let mut cursor = program.walk();
    for child in program.children(&mut cursor) {
        match child.kind() {
            "comment" => continue,
            "import_statement" => {
                if let Some(import) = lower_import(child, source) {
                    imports.push(import);
                }
            }
            "export_statement" => {
                if let Some(declaration) = child.child_by_field_name("declaration") {
                    collect_declarators(declaration, child, source, &mut declarations);
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                collect_declarators(child, child, source, &mut declarations);
            }
            _ => {}
        }
        if preamble_end.is_none() && child.kind() != "import_statement" {
            preamble_end = Some(child.start_byte());
        }
    }

    let Some(root_decl) = declarations
        .iter()
        .find(|d| d.name == conventions.root_declaration)
    else {
        warn!(
            declaration = %conventions.root_declaration,
            "root navigation declaration not found"
        );
        return Err(ParseFailure::RootMissing(
            conventions.root_declaration.clone(),
        ));
    };

    let malformed = |reason: &str| ParseFailure::RootMalformed {
        name: conventions.root_declaration.clone(),
        reason: reason.to_string(),
    };

    let root_value = root_decl
        .value
        .map(|v| lower(v, source))
        .ok_or_else(|| malformed("declaration has no initializer"))?;
    let Value::Array(root_array) = root_value else {
        return Err(malformed("expected an array literal"));
    };
    let root_object = root_array
        .elements
        .first()
        .and_then(Value::as_object)
        .ok_or_else(|| malformed("expected a navigator object as the first element"))?;
    let root = build_navigator(root_object, Vec::new())
        .ok_or_else(|| malformed("first element is not a navigator"))?;

    if root.name != conventions.root_navigator {
        warn!(
            expected = %conventions.root_navigator,
            found = %root.name,
            "root navigator has an unexpected name"
        );
    }

    let flags = LayoutFlags {
        autosave: declared_bool(&declarations, AUTOSAVE_FLAG, source),
        editing: declared_bool(&declarations, EDITING_FLAG, source),
    };

    let (commands, commands_value) = match declarations.iter().find(|d| d.name == COMMANDS) {
        Some(Declaration {
            value: Some(node), ..
        }) => {
            let value = lower(*node, source);
            let queue = value.as_object().map(command_queue).unwrap_or_default();
            (queue, Some(value.span()))
        }
        _ => (CommandQueue::default(), None),
    };

    let style = detect_style(source, &root_array, root_object, root_decl.statement);

    Ok(LayoutDocument {
        source: source.to_string(),
        imports,
        preamble_end: preamble_end.unwrap_or(source.len()),
        root_array,
        root,
        flags,
        commands,
        commands_value,
        style,
    })
}

fn first_error(node: Node) -> Option<(usize, usize)> {
    if node.is_error() || node.is_missing() {
        let position = node.start_position();
        return Some((position.row + 1, position.column + 1));
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            if let Some(found) = first_error(child) {
                return Some(found);
            }
        }
    }
    None
}

fn collect_declarators<'t>(
    declaration: Node<'t>,
    statement: Node<'t>,
    source: &str,
    out: &mut Vec<Declaration<'t>>,
) {
    if !matches!(
        declaration.kind(),
        "lexical_declaration" | "variable_declaration"
    ) {
        return;
    }

    let mut cursor = declaration.walk();
    for declarator in declaration.named_children(&mut cursor) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let Some(name) = declarator.child_by_field_name("name") else {
            continue;
        };
        out.push(Declaration {
            name: node_text(&name, source).to_string(),
            value: declarator.child_by_field_name("value"),
            statement,
        });
    }
}

fn lower_import(node: Node, source: &str) -> Option<ImportDecl> {
    let module_node = node.child_by_field_name("source")?;
    let module = match lower(module_node, source) {
        Value::Str { value, .. } => value,
        _ => return None,
    };

    let mut import = ImportDecl {
        span: Span::of(&node),
        module,
        default: None,
        names: Vec::new(),
        named: None,
        namespace: false,
        type_only: false,
    };

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "type" => import.type_only = true,
            "import_clause" => lower_import_clause(child, source, &mut import),
            _ => {}
        }
    }

    Some(import)
}

fn lower_import_clause(clause: Node, source: &str, import: &mut ImportDecl) {
    let mut cursor = clause.walk();
    for part in clause.named_children(&mut cursor) {
        match part.kind() {
            "identifier" => import.default = Some(node_text(&part, source).to_string()),
            "namespace_import" => import.namespace = true,
            "named_imports" => {
                let (list, specifiers) = syntax::lower_list(part, "{", "}");
                import.names = specifiers
                    .iter()
                    .filter_map(|spec| import_name(*spec, source))
                    .collect();
                if import.names.len() == list.items.len() {
                    import.named = Some(list);
                } else {
                    import.named = Some(ListSyntax {
                        items: Vec::new(),
                        ..list
                    });
                }
            }
            _ => {}
        }
    }
}

fn import_name(spec: Node, source: &str) -> Option<ImportName> {
    if spec.kind() != "import_specifier" {
        return None;
    }
    let imported = node_text(&spec.child_by_field_name("name")?, source).to_string();
    let local = spec
        .child_by_field_name("alias")
        .map(|alias| node_text(&alias, source).to_string())
        .unwrap_or_else(|| imported.clone());
    Some(ImportName { imported, local })
}

fn build_navigator(object: &ObjectLit, route_path: Vec<String>) -> Option<NavigatorNode> {
    let kind = object.get_str("type").and_then(NavigatorKind::from_tag)?;
    let name = object.get_str("name")?.to_string();

    let mut children = Vec::new();
    if let Some(screens) = object.get_array("screens") {
        for (index, element) in screens.elements.iter().enumerate() {
            let Some(child) = element.as_object() else {
                debug!(navigator = %name, index, "skipping non-object screen element");
                continue;
            };
            match child.get_str("type") {
                Some("screen") => {
                    if let Some(entry) = screen_entry(child) {
                        children.push(NavChild::Screen(ScreenNode {
                            entry,
                            span: child.span,
                            index,
                        }));
                    }
                }
                Some(tag) if NavigatorKind::from_tag(tag).is_some() => {
                    let Some(nested_name) = child.get_str("name") else {
                        warn!(navigator = %name, index, "nested navigator has no name");
                        continue;
                    };
                    let mut nested_path = route_path.clone();
                    nested_path.push(nested_name.to_string());
                    if let Some(nested) = build_navigator(child, nested_path) {
                        children.push(NavChild::Navigator(nested));
                    }
                }
                other => {
                    debug!(navigator = %name, index, tag = ?other, "skipping unknown element type");
                }
            }
        }
    }

    Some(NavigatorNode {
        name,
        kind,
        object: object.clone(),
        route_path,
        children,
    })
}

fn screen_entry(object: &ObjectLit) -> Option<ScreenEntry> {
    let Some(name) = object.get_str("name") else {
        warn!("screen without a string name, skipping");
        return None;
    };
    let component = match object.get("component") {
        Some(Value::Ident { name, .. }) => name.clone(),
        _ => {
            warn!(screen = %name, "screen component is not a plain identifier, skipping");
            return None;
        }
    };

    let options = object.get_object("options");
    let option = |key: &str| options.and_then(|o| o.get_str(key)).map(str::to_string);

    Some(ScreenEntry {
        name: name.to_string(),
        component,
        href: object.get_str("href").map(str::to_string),
        title: option("title"),
        icon: option("tabBarIconName"),
        label: option("drawerLabel").or_else(|| option("tabBarLabel")),
        visibility: object
            .get_strings("showOn")
            .or_else(|| options.and_then(|o| o.get_strings("showOn"))),
    })
}

fn declared_bool(declarations: &[Declaration], name: &str, source: &str) -> bool {
    declarations
        .iter()
        .find(|d| d.name == name)
        .and_then(|d| d.value)
        .and_then(|v| lower(v, source).as_bool())
        .unwrap_or(false)
}

fn command_queue(object: &ObjectLit) -> CommandQueue {
    let read = |key: &str| -> Vec<PendingCommand> {
        let Some(array) = object.get_array(key) else {
            return Vec::new();
        };
        array
            .elements
            .iter()
            .filter_map(|element| {
                let command = pending_command(element);
                if command.is_none() {
                    warn!(list = key, "discarding malformed command entry");
                }
                command
            })
            .collect()
    };

    CommandQueue {
        add: read("add"),
        delete: read("delete"),
    }
}

fn pending_command(value: &Value) -> Option<PendingCommand> {
    match value {
        Value::Str { value, .. } if !value.trim().is_empty() => Some(PendingCommand::named(value)),
        Value::Object(object) => {
            let name = object.get_str("name").filter(|n| !n.trim().is_empty())?;
            let text = |key: &str| object.get_str(key).map(str::to_string);
            Some(PendingCommand {
                name: name.to_string(),
                component: text("componentName").or_else(|| text("component")),
                title: text("title"),
                icon: text("icon").or_else(|| text("tabBarIconName")),
                label: text("label"),
                href: text("href"),
                parent: text("parent"),
            })
        }
        _ => None,
    }
}

fn detect_style(
    source: &str,
    root_array: &syntax::ArrayLit,
    root_object: &ObjectLit,
    statement: Node,
) -> SourceStyle {
    let mut style = SourceStyle::default();

    if let Some(Value::Str { span, .. }) = root_object.get("type") {
        if let Some(quote) = source[span.start..].chars().next() {
            if quote == '"' || quote == '\'' {
                style.quote = quote;
            }
        }
    }

    let outer = line_indent(source, root_array.span.start);
    let inner = line_indent(source, root_object.span.start);
    if let Some(unit) = inner.strip_prefix(outer) {
        if !unit.is_empty() && source[..root_object.span.start].ends_with(inner) {
            style.indent_unit = unit.to_string();
        }
    }

    style.semicolons = node_text(&statement, source).trim_end().ends_with(';');
    style
}
