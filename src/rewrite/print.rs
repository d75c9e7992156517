use crate::error::RewriteError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Splice {
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            start: at,
            end: at,
            text: text.into(),
        }
    }

    pub fn replace(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn remove(start: usize, end: usize) -> Self {
        Self::replace(start, end, String::new())
    }
}

pub trait Printer {
    fn print(&self, source: &str, splices: Vec<Splice>) -> Result<String, RewriteError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SplicePrinter;

impl Printer for SplicePrinter {
    fn print(&self, source: &str, mut splices: Vec<Splice>) -> Result<String, RewriteError> {
        splices.sort_by_key(|s| (s.start, s.end));

        for pair in splices.windows(2) {
            if pair[1].start < pair[0].end {
                return Err(RewriteError::Overlap {
                    first: pair[0].start,
                    second: pair[1].start,
                });
            }
        }

        let extra: usize = splices.iter().map(|s| s.text.len()).sum();
        let mut out = String::with_capacity(source.len() + extra);
        let mut cursor = 0;
        for splice in &splices {
            out.push_str(&source[cursor..splice.start]);
            out.push_str(&splice.text);
            cursor = splice.end;
        }
        out.push_str(&source[cursor..]);
        Ok(out)
    }
}
