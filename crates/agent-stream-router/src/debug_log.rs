use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

/// Ordered, append-only diagnostic log owned by a single run.
///
/// When built with a tee sink (incremental diagnostics), every pushed entry is
/// also handed to the sink immediately.
pub struct DebugLog {
    run_id: uuid::Uuid,
    entries: Vec<String>,
    tee: Option<Arc<dyn DiagnosticSink>>,
}

impl DebugLog {
    /// Creates an empty log for `run_id`.
    pub fn new(run_id: uuid::Uuid) -> Self {
        Self {
            run_id,
            entries: Vec::new(),
            tee: None,
        }
    }

    pub(crate) fn teed(run_id: uuid::Uuid, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            run_id,
            entries: Vec::new(),
            tee: Some(sink),
        }
    }

    pub fn run_id(&self) -> uuid::Uuid {
        self.run_id
    }

    /// Appends one entry.
    pub fn push(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        if let Some(sink) = &self.tee {
            sink.record(self.run_id, &entry);
        }
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newline-joined text, the format handed to log files and consoles.
    pub fn render(&self) -> String {
        self.entries.join("\n")
    }
}

impl fmt::Debug for DebugLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugLog")
            .field("run_id", &self.run_id)
            .field("entries", &self.entries)
            .field("incremental", &self.tee.is_some())
            .finish()
    }
}

/// Receives diagnostics produced by router runs.
pub trait DiagnosticSink: Send + Sync {
    /// Called once with the finished log when a run completes successfully.
    fn flush(&self, run_id: uuid::Uuid, log: &DebugLog);

    /// Called for every entry as it is appended when incremental diagnostics
    /// are enabled.
    fn record(&self, _run_id: uuid::Uuid, _entry: &str) {}
}

/// Default sink: writes diagnostics through `tracing` at DEBUG level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn flush(&self, run_id: uuid::Uuid, log: &DebugLog) {
        debug!(
            target: "agent_stream_router::diagnostics",
            run_id = %run_id,
            entries = log.len(),
            "run diagnostics:\n{}",
            log.render()
        );
    }

    fn record(&self, run_id: uuid::Uuid, entry: &str) {
        debug!(target: "agent_stream_router::diagnostics", run_id = %run_id, "{entry}");
    }
}

/// Finished log captured by `MemorySink`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlushedLog {
    pub run_id: uuid::Uuid,
    pub entries: Vec<String>,
}

/// Keeps diagnostics in memory for later inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    flushed: Mutex<Vec<FlushedLog>>,
    recorded: Mutex<Vec<(uuid::Uuid, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs of runs that completed, in completion order.
    pub fn flushed(&self) -> Vec<FlushedLog> {
        self.flushed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Entries received incrementally, in arrival order.
    pub fn recorded(&self) -> Vec<(uuid::Uuid, String)> {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Entries of the most recently flushed run.
    pub fn last_entries(&self) -> Option<Vec<String>> {
        self.flushed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .map(|log| log.entries.clone())
    }
}

impl DiagnosticSink for MemorySink {
    fn flush(&self, run_id: uuid::Uuid, log: &DebugLog) {
        self.flushed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FlushedLog {
                run_id,
                entries: log.entries().to_vec(),
            });
    }

    fn record(&self, run_id: uuid::Uuid, entry: &str) {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((run_id, entry.to_string()));
    }
}
