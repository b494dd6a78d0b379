//! Structured run reporting.
//!
//! The pipeline never logs through globals; it receives a [`Reporter`] and
//! emits events through it. [`LogReporter`] forwards to the `log` facade.

use log::Level;
use std::sync::Mutex;

pub trait Reporter: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);

    /// Fine-grained detail such as run state transitions.
    fn debug(&self, _message: &str) {}

    /// A batch of `total` units of work is starting.
    fn progress_start(&self, _label: &str, _total: usize) {}
    fn progress_advance(&self) {}
    fn progress_finish(&self) {}
}

/// Forwards every event to the `log` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn debug(&self, message: &str) {
        log::debug!("{message}");
    }

    fn info(&self, message: &str) {
        log::info!("{message}");
    }

    fn warn(&self, message: &str) {
        log::warn!("{message}");
    }

    fn error(&self, message: &str) {
        log::error!("{message}");
    }
}

/// Keeps every event in memory. Useful for tests and for callers that want
/// to render the run themselves.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<(Level, String)>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(Level, String)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self, level: Level) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    fn push(&self, level: Level, message: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push((level, message.to_string()));
        }
    }
}

impl Reporter for MemoryReporter {
    fn debug(&self, message: &str) {
        self.push(Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self.push(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }
}
