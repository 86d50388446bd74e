//! Reporting of messages and errors, back to whoever runs the batch.

use std::fmt::{Display, Formatter};
#[cfg(test)]
use std::sync::Mutex;

mod censor;

pub use censor::*;
pub(crate) use censor::{censored_error, censored_message};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Message,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub level: Level,
    pub text: String,
}

impl Display for Entry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.level {
            Level::Message => write!(f, "{}", self.text),
            Level::Error => write!(f, "error: {}", self.text),
        }
    }
}

/// An append-only sink for report entries.
///
/// Entries may get appended from different threads, e.g. the readers of the process output.
pub trait LogSink: Send + Sync {
    fn append(&self, entry: Entry);
}

/// Forward entries to the [`log`] facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogFacadeSink;

impl LogSink for LogFacadeSink {
    fn append(&self, entry: Entry) {
        match entry.level {
            Level::Message => log::info!("{}", entry.text),
            Level::Error => log::error!("{}", entry.text),
        }
    }
}

/// Keep entries in memory, in the order they got appended.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<Entry>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Entry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn errors(&self) -> Vec<String> {
        self.texts(Level::Error)
    }

    pub fn messages(&self) -> Vec<String> {
        self.texts(Level::Message)
    }

    fn texts(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.level == level)
            .map(|entry| entry.text)
            .collect()
    }

    /// Check if any entry contains the text.
    pub fn contains(&self, text: &str) -> bool {
        self.entries().iter().any(|entry| entry.text.contains(text))
    }
}

#[cfg(test)]
impl LogSink for MemorySink {
    fn append(&self, entry: Entry) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}
