//! Common imports for typical router usage.
pub use crate::{
    AbortHandle, AgentRun, DebugLog, DiagnosticFlush, DiagnosticSink, DisplayStream, EventSource,
    EventStream, MemorySink, NodeStream, RawEvent, RouteEvent, Router, RouterConfig, RouterError,
    RunNode, RunOutput, RunStream, ScriptedRun, ScriptedSource, SourceError, ToolCallPart,
};
