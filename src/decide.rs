use console::{Term, style};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, warn};

pub trait Decider: Send + Sync {
    fn confirm(&self, message: &str, default: bool) -> bool;

    fn choose(&self, message: &str, options: &[String]) -> Option<usize>;

    fn select(&self, message: &str, items: &[String]) -> Vec<usize>;

    fn input(&self, message: &str, default: &str) -> String;

    fn is_interactive(&self) -> bool {
        false
    }
}

pub struct Prompt {
    term: Term,
}

impl Prompt {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    pub fn available() -> bool {
        Term::stderr().is_term()
    }

    fn ask(&self, question: &str) -> Option<String> {
        if let Err(e) = self.term.write_str(question) {
            warn!("prompt failed: {e}");
            return None;
        }
        match self.term.read_line() {
            Ok(line) => Some(line.trim().to_string()),
            Err(e) => {
                warn!("prompt failed: {e}");
                None
            }
        }
    }
}

impl Default for Prompt {
    fn default() -> Self {
        Self::new()
    }
}

impl Decider for Prompt {
    fn confirm(&self, message: &str, default: bool) -> bool {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            let Some(answer) = self.ask(&format!("{} [{hint}] ", style(message).bold())) else {
                return default;
            };
            match answer.to_lowercase().as_str() {
                "" => return default,
                "y" | "yes" => return true,
                "n" | "no" => return false,
                _ => continue,
            }
        }
    }

    fn choose(&self, message: &str, options: &[String]) -> Option<usize> {
        if options.is_empty() {
            return None;
        }
        let _ = self.term.write_line(&style(message).bold().to_string());
        for (i, option) in options.iter().enumerate() {
            let _ = self.term.write_line(&format!("  {}) {option}", i + 1));
        }
        loop {
            let answer = self.ask("Choice [1]: ")?;
            if answer.is_empty() {
                return Some(0);
            }
            if answer.eq_ignore_ascii_case("q") {
                return None;
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Some(n - 1),
                _ => continue,
            }
        }
    }

    fn select(&self, message: &str, items: &[String]) -> Vec<usize> {
        let _ = self.term.write_line(&style(message).bold().to_string());
        for (i, item) in items.iter().enumerate() {
            let _ = self
                .term
                .write_line(&format!("  [{}] {}) {item}", style("x").green(), i + 1));
        }
        let Some(answer) =
            self.ask("Numbers to skip (comma separated), 'none' to skip all, Enter to apply all: ")
        else {
            return Vec::new();
        };

        if answer.eq_ignore_ascii_case("none") {
            return Vec::new();
        }
        let skipped: Vec<usize> = answer
            .split(',')
            .filter_map(|part| part.trim().parse::<usize>().ok())
            .filter(|n| *n >= 1)
            .map(|n| n - 1)
            .collect();
        (0..items.len()).filter(|i| !skipped.contains(i)).collect()
    }

    fn input(&self, message: &str, default: &str) -> String {
        match self.ask(&format!("{} [{default}]: ", style(message).bold())) {
            Some(answer) if !answer.is_empty() => answer,
            _ => default.to_string(),
        }
    }

    fn is_interactive(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Confirm(bool),
    Choose(Option<usize>),
    Select(Vec<usize>),
    Input(String),
}

#[derive(Default)]
pub struct Policy {
    script: Mutex<VecDeque<Answer>>,
}

impl Policy {
    pub fn accept_defaults() -> Self {
        Self::default()
    }

    pub fn scripted(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            script: Mutex::new(answers.into_iter().collect()),
        }
    }

    fn next(&self, kind: fn(&Answer) -> bool) -> Option<Answer> {
        let mut script = self.script.lock().ok()?;
        if script.front().is_some_and(kind) {
            script.pop_front()
        } else {
            None
        }
    }
}

impl Decider for Policy {
    fn confirm(&self, message: &str, default: bool) -> bool {
        let answer = match self.next(|a| matches!(a, Answer::Confirm(_))) {
            Some(Answer::Confirm(value)) => value,
            _ => default,
        };
        debug!(prompt = message, answer, "confirm");
        answer
    }

    fn choose(&self, message: &str, options: &[String]) -> Option<usize> {
        let answer = match self.next(|a| matches!(a, Answer::Choose(_))) {
            Some(Answer::Choose(choice)) => choice.filter(|i| *i < options.len()),
            _ if options.is_empty() => None,
            _ => Some(0),
        };
        debug!(prompt = message, ?answer, "choose");
        answer
    }

    fn select(&self, message: &str, items: &[String]) -> Vec<usize> {
        let answer = match self.next(|a| matches!(a, Answer::Select(_))) {
            Some(Answer::Select(picked)) => {
                picked.into_iter().filter(|i| *i < items.len()).collect()
            }
            _ => (0..items.len()).collect(),
        };
        debug!(prompt = message, ?answer, "select");
        answer
    }

    fn input(&self, message: &str, default: &str) -> String {
        let answer = match self.next(|a| matches!(a, Answer::Input(_))) {
            Some(Answer::Input(value)) if !value.is_empty() => value,
            _ => default.to_string(),
        };
        debug!(prompt = message, %answer, "input");
        answer
    }
}
