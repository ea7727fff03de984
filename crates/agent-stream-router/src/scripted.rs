//! In-memory collaborators for demos and tests.
//!
//! `ScriptedSource` replays a fixed list of events as a node sub-stream, and
//! `ScriptedRun` builds a fresh node list for every prompt it is started with.
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::{StreamExt as _, stream};

use crate::errors::SourceError;
use crate::event::RawEvent;
use crate::node::{AgentRun, EventSource, EventStream, NodeStream, RunNode};

/// Boxes a fixed list of nodes into a `NodeStream`.
pub fn nodes(nodes: Vec<Result<RunNode, SourceError>>) -> NodeStream {
    Box::pin(stream::iter(nodes))
}

struct ReleaseGuard(Arc<AtomicUsize>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// An `EventSource` that replays scripted events.
pub struct ScriptedSource {
    events: Option<Vec<Result<RawEvent, SourceError>>>,
    open_error: Option<SourceError>,
    released: Option<Arc<AtomicUsize>>,
}

impl ScriptedSource {
    /// Replays `events` in order.
    pub fn new(events: Vec<RawEvent>) -> Self {
        Self::from_results(events.into_iter().map(Ok).collect())
    }

    /// Replays events and read failures in order.
    pub fn from_results(events: Vec<Result<RawEvent, SourceError>>) -> Self {
        Self {
            events: Some(events),
            open_error: None,
            released: None,
        }
    }

    /// A source whose acquisition fails with `error`.
    pub fn failing(error: SourceError) -> Self {
        Self {
            events: None,
            open_error: Some(error),
            released: None,
        }
    }

    /// Increments `counter` when the opened stream is dropped.
    pub fn track_release(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.released = Some(counter);
        self
    }
}

#[async_trait::async_trait]
impl EventSource for ScriptedSource {
    async fn open(&mut self) -> Result<EventStream, SourceError> {
        if let Some(err) = self.open_error.take() {
            return Err(err);
        }
        let events = self
            .events
            .take()
            .ok_or_else(|| SourceError::protocol("scripted source opened twice"))?;
        let guard = self.released.take().map(ReleaseGuard);
        Ok(Box::pin(stream::iter(events).map(move |event| {
            let _held = &guard;
            event
        })))
    }
}

/// An `AgentRun` that asks a closure for the nodes of each run.
pub struct ScriptedRun<F> {
    name: String,
    script: F,
}

impl<F> ScriptedRun<F>
where
    F: Fn(&str) -> Vec<Result<RunNode, SourceError>> + Send + Sync,
{
    pub fn new(name: impl Into<String>, script: F) -> Self {
        Self {
            name: name.into(),
            script,
        }
    }
}

#[async_trait::async_trait]
impl<F> AgentRun for ScriptedRun<F>
where
    F: Fn(&str) -> Vec<Result<RunNode, SourceError>> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, prompt: &str) -> Result<NodeStream, SourceError> {
        Ok(nodes((self.script)(prompt)))
    }
}
