use super::Scalar;
use crate::layout::SourceStyle;
use crate::model::{NavigatorKind, ParentRef, ScreenEntry};
use crate::naming::{clean_feature_name, default_href, display_title, is_identifier};

pub fn quote(value: &str, style: &SourceStyle) -> String {
    let q = style.quote;
    let mut out = String::with_capacity(value.len() + 2);
    out.push(q);
    for c in value.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' | '\u{2029}' => out.push_str(&format!("\\u{:04x}", c as u32)),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c if c == q || c == '\\' => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(q);
    out
}

pub fn key(name: &str, style: &SourceStyle) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        quote(name, style)
    }
}

pub fn scalar(value: &Scalar, style: &SourceStyle) -> String {
    match value {
        Scalar::Str(s) => quote(s, style),
        Scalar::Bool(b) => b.to_string(),
        Scalar::Int(n) => n.to_string(),
    }
}

pub fn object(props: &[(String, String)], style: &SourceStyle) -> String {
    let unit = &style.indent_unit;
    let mut out = String::from("{\n");
    for (name, value) in props {
        out.push_str(unit);
        out.push_str(&key(name, style));
        out.push_str(": ");
        out.push_str(&super::list::indent_block(value, unit));
        out.push_str(",\n");
    }
    out.push('}');
    out
}

pub fn array(elements: &[String], style: &SourceStyle) -> String {
    let unit = &style.indent_unit;
    let mut out = String::from("[\n");
    for element in elements {
        out.push_str(unit);
        out.push_str(&super::list::indent_block(element, unit));
        out.push_str(",\n");
    }
    out.push(']');
    out
}

pub fn property(name: &str, value: &str, style: &SourceStyle) -> String {
    format!("{}: {value}", key(name, style))
}

pub fn nested_property(path: &[String], leaf: &str, style: &SourceStyle) -> String {
    match path {
        [] => leaf.to_string(),
        [last] => property(last, leaf, style),
        [head, rest @ ..] => {
            let inner = nested_value(rest, leaf, style);
            property(head, &inner, style)
        }
    }
}

fn nested_value(path: &[String], leaf: &str, style: &SourceStyle) -> String {
    match path {
        [] => leaf.to_string(),
        [head, rest @ ..] => {
            let value = nested_value(rest, leaf, style);
            object(&[(head.clone(), value)], style)
        }
    }
}

pub fn screen(
    entry: &ScreenEntry,
    parent: &ParentRef,
    root_navigator: &str,
    style: &SourceStyle,
) -> String {
    let clean = clean_feature_name(&entry.name);
    let title = entry.title.clone().unwrap_or_else(|| display_title(clean));
    let href = entry
        .href
        .clone()
        .unwrap_or_else(|| default_href(clean, parent, root_navigator));

    let mut options = vec![("title".to_string(), quote(&title, style))];
    match parent.kind {
        NavigatorKind::Tabs => {
            let icon = entry.icon.clone().unwrap_or_else(|| clean.to_lowercase());
            options.push(("tabBarIconName".to_string(), quote(&icon, style)));
            if let Some(label) = &entry.label {
                options.push(("tabBarLabel".to_string(), quote(label, style)));
            }
        }
        NavigatorKind::Drawer => {
            let label = entry.label.clone().unwrap_or_else(|| display_title(clean));
            options.push(("drawerLabel".to_string(), quote(&label, style)));
        }
        NavigatorKind::Stack => {}
    }

    let mut props = vec![
        ("type".to_string(), quote("screen", style)),
        ("name".to_string(), quote(&entry.name, style)),
        ("component".to_string(), entry.component.clone()),
        ("href".to_string(), quote(&href, style)),
        ("options".to_string(), object(&options, style)),
    ];
    if let Some(visibility) = &entry.visibility {
        let devices: Vec<String> = visibility.iter().map(|v| quote(v, style)).collect();
        props.push(("showOn".to_string(), format!("[{}]", devices.join(", "))));
    }

    object(&props, style)
}

pub fn import(component: &str, module: &str, style: &SourceStyle) -> String {
    format!(
        "import {{ {component} }} from {}{}",
        quote(module, style),
        if style.semicolons { ";" } else { "" }
    )
}

pub fn empty_commands() -> &'static str {
    "{ add: [], delete: [] }"
}
