use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("syntax error at line {line}, column {column}")]
    Syntax { line: usize, column: usize },

    #[error("root declaration `{0}` not found")]
    RootMissing(String),

    #[error("root declaration `{name}` is malformed: {reason}")]
    RootMalformed { name: String, reason: String },

    #[error("tree-sitter could not parse the layout")]
    Parser,
}

impl ParseFailure {
    pub fn is_transient(&self) -> bool {
        matches!(self, ParseFailure::Syntax { .. } | ParseFailure::RootMissing(_))
    }
}

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error(transparent)]
    Parse(#[from] ParseFailure),

    #[error("navigator `{0}` not found in layout")]
    NavigatorMissing(String),

    #[error("option path `{path}` on `{navigator}` runs through a non-object value")]
    OptionConflict { navigator: String, path: String },

    #[error("overlapping edits at bytes {first}..{second}")]
    Overlap { first: usize, second: usize },

    #[error("rewritten layout does not parse ({0}), nothing written")]
    Unparsable(ParseFailure),
}
