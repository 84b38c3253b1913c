//! Substring triggers for raw log lines
//!
//! Log lines have no identity, so they bypass the differ: a line that contains any
//! configured trigger becomes a `Created` event on its own.

use crate::event::{ChangeEvent, Item};
use tracing::debug;

/// Matches log lines against a fixed set of substrings.
#[derive(Debug, Clone)]
pub struct LogTrigger {
    /// Substrings to look for (case-sensitive), checked in order
    patterns: Vec<String>,
}

impl LogTrigger {
    /// Create a trigger from the given substrings. Empty patterns are dropped.
    pub fn new(patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            patterns: patterns
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    /// First configured pattern found in `line`, if any
    pub fn matched<'a>(&'a self, line: &str) -> Option<&'a str> {
        self.patterns
            .iter()
            .find(|p| line.contains(p.as_str()))
            .map(String::as_str)
    }

    /// Turn a log line into an event if it matches.
    ///
    /// At most one event per line, however many patterns it contains. The item carries
    /// the source name as id, the verbatim line as label and the matched pattern as
    /// status.
    pub fn evaluate(&self, source_name: &str, line: &str) -> Option<ChangeEvent> {
        let pattern = self.matched(line)?;

        debug!(source = %source_name, trigger = %pattern, "Log line matched trigger");

        Some(ChangeEvent::Created {
            item: Item::new(source_name, line, pattern),
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
