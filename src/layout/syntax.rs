use tree_sitter::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn of(node: &Node) -> Self {
        Self {
            start: node.start_byte(),
            end: node.end_byte(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSyntax {
    pub open: usize,
    pub close: usize,
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListItem {
    pub span: Span,
    pub comma: Option<usize>,
}

impl ListItem {
    pub fn end_with_comma(&self) -> usize {
        self.comma.map(|c| c + 1).unwrap_or(self.span.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Object(ObjectLit),
    Array(ArrayLit),
    Str { span: Span, value: String },
    Bool { span: Span, value: bool },
    Ident { span: Span, name: String },
    Other(Span),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLit {
    pub span: Span,
    pub list: ListSyntax,
    pub props: Vec<Prop>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prop {
    pub key: Option<String>,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayLit {
    pub span: Span,
    pub list: ListSyntax,
    pub elements: Vec<Value>,
}

impl Value {
    pub fn span(&self) -> Span {
        match self {
            Value::Object(o) => o.span,
            Value::Array(a) => a.span,
            Value::Str { span, .. }
            | Value::Bool { span, .. }
            | Value::Ident { span, .. }
            | Value::Other(span) => *span,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectLit> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayLit> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool { value, .. } => Some(*value),
            _ => None,
        }
    }

}

impl ObjectLit {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.props
            .iter()
            .find(|p| p.key.as_deref() == Some(key))
            .map(|p| &p.value)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_object(&self, key: &str) -> Option<&ObjectLit> {
        self.get(key).and_then(Value::as_object)
    }

    pub fn get_array(&self, key: &str) -> Option<&ArrayLit> {
        self.get(key).and_then(Value::as_array)
    }

    pub fn get_strings(&self, key: &str) -> Option<Vec<String>> {
        self.get_array(key).map(|a| {
            a.elements
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
    }
}

pub(crate) fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

pub(crate) fn unwrap_expression<'t>(node: Node<'t>) -> Node<'t> {
    let mut current = node;
    while matches!(
        current.kind(),
        "as_expression" | "satisfies_expression" | "parenthesized_expression"
    ) {
        match current.named_child(0) {
            Some(inner) => current = inner,
            None => break,
        }
    }
    current
}

pub(crate) fn lower(node: Node, source: &str) -> Value {
    let node = unwrap_expression(node);
    let span = Span::of(&node);

    match node.kind() {
        "object" => {
            let (list, members) = lower_list(node, "{", "}");
            let props = members
                .into_iter()
                .map(|member| lower_member(member, source))
                .collect();
            Value::Object(ObjectLit { span, list, props })
        }
        "array" => {
            let (list, members) = lower_list(node, "[", "]");
            let elements = members
                .into_iter()
                .map(|member| lower(member, source))
                .collect();
            Value::Array(ArrayLit {
                span,
                list,
                elements,
            })
        }
        "string" => Value::Str {
            span,
            value: unquote(node_text(&node, source)),
        },
        "true" => Value::Bool { span, value: true },
        "false" => Value::Bool { span, value: false },
        "identifier" => Value::Ident {
            span,
            name: node_text(&node, source).to_string(),
        },
        _ => Value::Other(span),
    }
}

fn lower_member(node: Node, source: &str) -> Prop {
    match node.kind() {
        "pair" => {
            let key = node.child_by_field_name("key").and_then(|k| match k.kind() {
                "property_identifier" | "number" => Some(node_text(&k, source).to_string()),
                "string" => Some(unquote(node_text(&k, source))),
                _ => None,
            });
            let value = node
                .child_by_field_name("value")
                .map(|v| lower(v, source))
                .unwrap_or(Value::Other(Span::of(&node)));
            Prop { key, value }
        }
        "shorthand_property_identifier" => {
            let name = node_text(&node, source).to_string();
            Prop {
                key: Some(name.clone()),
                value: Value::Ident {
                    span: Span::of(&node),
                    name,
                },
            }
        }
        _ => Prop {
            key: None,
            value: Value::Other(Span::of(&node)),
        },
    }
}

pub(crate) fn lower_list<'t>(node: Node<'t>, open: &str, close: &str) -> (ListSyntax, Vec<Node<'t>>) {
    let mut syntax = ListSyntax {
        open: node.start_byte(),
        close: node.end_byte().saturating_sub(1),
        items: Vec::new(),
    };
    let mut members = Vec::new();

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let kind = child.kind();
        if kind == open {
            syntax.open = child.start_byte();
        } else if kind == close {
            syntax.close = child.start_byte();
        } else if kind == "," {
            if let Some(last) = syntax.items.last_mut() {
                if last.comma.is_none() {
                    last.comma = Some(child.start_byte());
                }
            }
        } else if child.is_named() && kind != "comment" {
            syntax.items.push(ListItem {
                span: Span::of(&child),
                comma: None,
            });
            members.push(child);
        }
    }

    (syntax, members)
}

fn unquote(text: &str) -> String {
    for quote in ['\'', '"', '`'] {
        if let Some(inner) = text.strip_prefix(quote).and_then(|t| t.strip_suffix(quote)) {
            return unescape(inner);
        }
    }
    text.to_string()
}

fn unescape(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('u') => match unicode_escape(&mut chars) {
                Some(decoded) => out.push(decoded),
                None => out.push('u'),
            },
            Some('\n') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn unicode_escape(chars: &mut std::str::Chars) -> Option<char> {
    let mut ahead = chars.clone();
    let digits: String = if ahead.clone().next() == Some('{') {
        ahead.next();
        let digits: String = ahead.by_ref().take_while(|c| *c != '}').collect();
        if digits.is_empty() || digits.len() > 6 {
            return None;
        }
        digits
    } else {
        let digits: String = ahead.by_ref().take(4).collect();
        if digits.len() != 4 {
            return None;
        }
        digits
    };
    let decoded = u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32)?;
    *chars = ahead;
    Some(decoded)
}

pub fn line_start(source: &str, offset: usize) -> usize {
    source[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

pub fn line_indent(source: &str, offset: usize) -> &str {
    let start = line_start(source, offset);
    let line = &source[start..];
    let width = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..width]
}
