//! Badge-glob message resolution.
//!
//! Failure messages are looked up by matching a badge name against glob
//! patterns: an exact name, `prefix*`, `*suffix`, or a bare `*`. Lookup
//! order is always: explicit per-call message, the validation's own book,
//! the process-wide default book, the empty string.

use std::sync::OnceLock;

/// A parsed badge glob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Glob {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Any,
}

impl Glob {
    pub fn parse(pattern: &str) -> Glob {
        if pattern == "*" {
            Glob::Any
        } else if let Some(suffix) = pattern.strip_prefix('*') {
            Glob::Suffix(suffix.to_string())
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            Glob::Prefix(prefix.to_string())
        } else {
            Glob::Exact(pattern.to_string())
        }
    }

    pub fn matches(&self, badge: &str) -> bool {
        match self {
            Glob::Exact(name) => badge == name,
            Glob::Prefix(prefix) => badge.starts_with(prefix.as_str()),
            Glob::Suffix(suffix) => badge.ends_with(suffix.as_str()),
            Glob::Any => true,
        }
    }
}

/// An ordered glob → message dictionary; the first matching entry in
/// declaration order wins.
#[derive(Debug, Clone, Default)]
pub struct MessageBook {
    entries: Vec<(Glob, String)>,
}

impl MessageBook {
    pub fn new() -> MessageBook {
        MessageBook::default()
    }

    /// Builder-style insertion, for literal book declarations.
    pub fn with(mut self, pattern: &str, message: &str) -> MessageBook {
        self.insert(pattern, message);
        self
    }

    pub fn insert(&mut self, pattern: &str, message: &str) {
        self.entries.push((Glob::parse(pattern), message.to_string()));
    }

    pub fn resolve(&self, badge: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(glob, _)| glob.matches(badge))
            .map(|(_, message)| message.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

static DEFAULT_BOOK: OnceLock<MessageBook> = OnceLock::new();

/// Installs the process-wide default message book. May be called once;
/// returns false (leaving the installed book untouched) on later calls.
pub fn set_default_messages(book: MessageBook) -> bool {
    DEFAULT_BOOK.set(book).is_ok()
}

pub(crate) fn default_message(badge: &str) -> Option<&'static str> {
    DEFAULT_BOOK.get().and_then(|book| book.resolve(badge))
}
