use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use futures::stream::BoxStream;
use tracing::trace;

use crate::errors::SourceError;
use crate::event::RawEvent;

/// Events of one node sub-stream. Dropping the stream releases whatever
/// resource backs it.
pub type EventStream = BoxStream<'static, Result<RawEvent, SourceError>>;

/// The outer agent run: a lazy sequence of nodes.
pub type NodeStream = BoxStream<'static, Result<RunNode, SourceError>>;

/// Opens the event sub-stream of a model-request or tool-call node.
#[async_trait::async_trait]
pub trait EventSource: Send {
    /// Acquires the node's sub-stream.
    ///
    /// Called at most once per node by the router.
    async fn open(&mut self) -> Result<EventStream, SourceError>;
}

/// Starts agent runs for a prompt.
#[async_trait::async_trait]
pub trait AgentRun: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str {
        "agent"
    }

    /// Begins a run and returns its node sequence.
    async fn start(&self, prompt: &str) -> Result<NodeStream, SourceError>;
}

/// One step of an agent run.
pub enum RunNode {
    /// The user prompt was submitted.
    UserPrompt { prompt: String },
    /// A model request whose sub-stream carries text and tool-call deltas.
    ModelRequest(Box<dyn EventSource>),
    /// Tool execution whose sub-stream carries tool calls and results.
    ToolCall(Box<dyn EventSource>),
    /// The run finished with its aggregated result.
    End { final_result: String },
    /// A node kind this crate does not model.
    Other { kind: String, detail: String },
}

impl RunNode {
    pub fn user_prompt(prompt: impl Into<String>) -> Self {
        Self::UserPrompt {
            prompt: prompt.into(),
        }
    }

    pub fn model_request(source: impl EventSource + 'static) -> Self {
        Self::ModelRequest(Box::new(source))
    }

    pub fn tool_call(source: impl EventSource + 'static) -> Self {
        Self::ToolCall(Box::new(source))
    }

    pub fn end(final_result: impl Into<String>) -> Self {
        Self::End {
            final_result: final_result.into(),
        }
    }

    pub fn other(kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Other {
            kind: kind.into(),
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::UserPrompt { .. } => NodeKind::UserPrompt,
            Self::ModelRequest(_) => NodeKind::ModelRequest,
            Self::ToolCall(_) => NodeKind::ToolCall,
            Self::End { .. } => NodeKind::End,
            Self::Other { .. } => NodeKind::Other,
        }
    }
}

impl fmt::Debug for RunNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserPrompt { prompt } => f.debug_struct("UserPrompt").field("prompt", prompt).finish(),
            Self::ModelRequest(_) => f.write_str("ModelRequest(..)"),
            Self::ToolCall(_) => f.write_str("ToolCall(..)"),
            Self::End { final_result } => f
                .debug_struct("End")
                .field("final_result", final_result)
                .finish(),
            Self::Other { kind, detail } => f
                .debug_struct("Other")
                .field("kind", kind)
                .field("detail", detail)
                .finish(),
        }
    }
}

/// Payload-free node discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    UserPrompt,
    ModelRequest,
    ToolCall,
    End,
    Other,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserPrompt => "user_prompt",
            Self::ModelRequest => "model_request",
            Self::ToolCall => "tool_call",
            Self::End => "end",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An opened sub-stream, released when this guard is dropped on any path:
/// exhaustion, error or the consumer walking away.
pub(crate) struct ScopedEvents {
    run_id: uuid::Uuid,
    kind: NodeKind,
    inner: EventStream,
}

impl ScopedEvents {
    pub(crate) async fn open(
        run_id: uuid::Uuid,
        kind: NodeKind,
        source: &mut dyn EventSource,
    ) -> Result<Self, SourceError> {
        let inner = source.open().await?;
        trace!(run_id = %run_id, node = %kind, "acquired node sub-stream");
        Ok(Self {
            run_id,
            kind,
            inner,
        })
    }
}

impl Stream for ScopedEvents {
    type Item = Result<RawEvent, SourceError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for ScopedEvents {
    fn drop(&mut self) {
        trace!(run_id = %self.run_id, node = %self.kind, "released node sub-stream");
    }
}
