use regex::Regex;
use std::sync::LazyLock;

use crate::model::ParentRef;

static FEATURE_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9_().-]+)/screen$").expect("feature import pattern"));

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier pattern"));

pub fn route_segment(name: &str) -> &str {
    name.strip_suffix("/index").unwrap_or(name)
}

pub fn clean_feature_name(name: &str) -> &str {
    let segment = route_segment(name);
    let segment = segment.strip_prefix('(').unwrap_or(segment);
    segment.strip_suffix(')').unwrap_or(segment)
}

pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn sanitize_cli_name(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

pub fn screen_name_for(clean: &str) -> String {
    format!("{clean}/index")
}

pub fn component_for(clean: &str) -> String {
    format!("{}Screen", capitalize(clean))
}

pub fn display_title(clean: &str) -> String {
    capitalize(clean)
}

pub fn default_href(clean: &str, parent: &ParentRef, root_navigator: &str) -> String {
    if parent.name == root_navigator {
        format!("/{clean}")
    } else {
        format!("/{}/{clean}", clean_feature_name(&parent.name))
    }
}

pub fn feature_import_path(prefix: &str, clean: &str) -> String {
    format!("{prefix}/{clean}/screen")
}

pub fn feature_from_import<'a>(prefix: &str, module: &'a str) -> Option<&'a str> {
    let rest = module.strip_prefix(prefix)?.strip_prefix('/')?;
    FEATURE_SEGMENT
        .captures(rest)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn is_identifier(value: &str) -> bool {
    IDENTIFIER.is_match(value)
}
