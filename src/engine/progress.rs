use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Consumer of human-readable progress lines. Appends are whole lines and
/// must be safe from many concurrent chain tasks.
pub trait ProgressSink: Send + Sync {
    fn append(&self, message: String);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Append-only in-memory log. Each append takes the lock once, so lines
/// never interleave.
#[derive(Debug, Default)]
pub struct ProgressLog {
    events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.message).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Each push completes under the lock, so a poisoned log is intact.
    fn lock(&self) -> MutexGuard<'_, Vec<ProgressEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProgressSink for ProgressLog {
    fn append(&self, message: String) {
        let event = ProgressEvent {
            at: Utc::now(),
            message,
        };
        self.lock().push(event);
    }
}

/// Prints each line to stdout with a wall-clock prefix.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn append(&self, message: String) {
        println!("[{}] {}", Utc::now().format("%H:%M:%S"), message);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn append(&self, _message: String) {}
}

/// Per-run progress: a fresh log owned by the run, mirrored to the caller's
/// sink.
pub(crate) struct RunProgress {
    log: ProgressLog,
    sink: Arc<dyn ProgressSink>,
}

impl RunProgress {
    pub(crate) fn new(sink: Arc<dyn ProgressSink>) -> Self {
        RunProgress {
            log: ProgressLog::new(),
            sink,
        }
    }

    pub(crate) fn into_events(self) -> Vec<ProgressEvent> {
        self.log
            .events
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProgressSink for RunProgress {
    fn append(&self, message: String) {
        self.log.append(message.clone());
        self.sink.append(message);
    }
}
