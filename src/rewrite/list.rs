use std::collections::BTreeSet;

use super::print::Splice;
use crate::layout::syntax::{ListItem, ListSyntax, line_indent, line_start};

#[derive(Debug, Clone)]
pub struct ListPlan {
    pub list: ListSyntax,
    pub remove: BTreeSet<usize>,
    pub append: Vec<String>,
}

impl ListPlan {
    pub fn new(list: &ListSyntax) -> Self {
        Self {
            list: list.clone(),
            remove: BTreeSet::new(),
            append: Vec::new(),
        }
    }

    pub fn splices(&self, source: &str, unit: &str) -> Vec<Splice> {
        let items = &self.list.items;
        let multiline = source[self.list.open..self.list.close].contains('\n');
        let base = line_indent(source, self.list.open);
        let indent = items
            .iter()
            .find(|item| starts_line(source, item.span.start))
            .map(|item| line_indent(source, item.span.start).to_string())
            .unwrap_or_else(|| format!("{base}{unit}"));

        let mut out = Vec::new();

        for (first, last) in runs(&self.remove) {
            if last >= items.len() {
                continue;
            }
            let splice = if multiline {
                remove_lines(source, items, first, last)
            } else if last + 1 < items.len() {
                Splice::remove(items[first].span.start, items[last + 1].span.start)
            } else if first > 0 {
                Splice::remove(items[first - 1].span.end, items[last].end_with_comma())
            } else {
                Splice::remove(self.list.open + 1, self.list.close)
            };
            out.push(splice);
        }

        if self.append.is_empty() {
            return out;
        }

        let anchor = items
            .iter()
            .enumerate()
            .rev()
            .find(|(i, _)| !self.remove.contains(i))
            .map(|(_, item)| item);

        match anchor {
            Some(anchor) if multiline => {
                let text: String = if anchor.comma.is_some() {
                    self.append
                        .iter()
                        .map(|t| format!("\n{indent}{},", indent_block(t, &indent)))
                        .collect()
                } else {
                    self.append
                        .iter()
                        .map(|t| format!(",\n{indent}{}", indent_block(t, &indent)))
                        .collect()
                };
                let at = if anchor.comma.is_some() {
                    end_of_line_comment(source, anchor.end_with_comma())
                } else {
                    anchor.span.end
                };
                out.push(Splice::insert(at, text));
            }
            Some(anchor) => {
                let text: String = self.append.iter().map(|t| format!(", {t}")).collect();
                out.push(Splice::insert(anchor.span.end, text));
            }
            None if items.is_empty()
                && source[self.list.open + 1..self.list.close].trim().is_empty() =>
            {
                let mut text: String = self
                    .append
                    .iter()
                    .map(|t| format!("\n{indent}{},", indent_block(t, &indent)))
                    .collect();
                text.push('\n');
                text.push_str(base);
                out.push(Splice::replace(self.list.open + 1, self.list.close, text));
            }
            None if multiline => {
                let text: String = self
                    .append
                    .iter()
                    .map(|t| format!("\n{indent}{},", indent_block(t, &indent)))
                    .collect();
                out.push(Splice::insert(self.list.open + 1, text));
            }
            None => {
                out.push(Splice::insert(self.list.open + 1, self.append.join(", ")));
            }
        }

        out
    }
}

pub fn indent_block(text: &str, indent: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(indent);
            }
        }
        out.push_str(line);
    }
    out
}

fn runs(indices: &BTreeSet<usize>) -> Vec<(usize, usize)> {
    let mut out: Vec<(usize, usize)> = Vec::new();
    for &i in indices {
        match out.last_mut() {
            Some((_, last)) if *last + 1 == i => *last = i,
            _ => out.push((i, i)),
        }
    }
    out
}

pub(crate) fn starts_line(source: &str, offset: usize) -> bool {
    source[line_start(source, offset)..offset]
        .chars()
        .all(|c| c == ' ' || c == '\t')
}

fn remove_lines(source: &str, items: &[ListItem], first: usize, last: usize) -> Splice {
    let start_item = items[first].span.start;
    let end = items[last].end_with_comma();
    let after = skip_blanks(source, end);
    let rest = &source[after..];

    let line_ends = rest.is_empty() || rest.starts_with('\n') || rest.starts_with("\r\n");
    let trailing_comment = rest.starts_with("//");

    if starts_line(source, start_item) && (line_ends || trailing_comment) {
        let start = line_start(source, start_item);
        let newline = after + rest.find('\n').map(|i| i + 1).unwrap_or(rest.len());
        Splice::remove(start, newline)
    } else {
        Splice::remove(start_item, after)
    }
}

fn skip_blanks(source: &str, from: usize) -> usize {
    from + source[from..]
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(source.len() - from)
}

fn end_of_line_comment(source: &str, from: usize) -> usize {
    let after = skip_blanks(source, from);
    let rest = &source[after..];
    if rest.starts_with("//") {
        let line = rest.find('\n').unwrap_or(rest.len());
        let line = if rest[..line].ends_with('\r') { line - 1 } else { line };
        after + line
    } else {
        from
    }
}
