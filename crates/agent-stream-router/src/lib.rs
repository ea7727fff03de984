//! Routes a nested agent-run event stream into two channels: live display
//! text for the end user and an ordered debug log for diagnostics.
//!
//! An agent run is a lazy sequence of `RunNode`s. Model-request and tool-call
//! nodes expose their own event sub-streams, which are classified event by
//! event. Display text from model requests is forwarded as it arrives; if a
//! run never streams any text, its final result is emitted once instead.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use futures::StreamExt as _;
//! use agent_stream_router::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), RouterError> {
//! let agent = Arc::new(ScriptedRun::new("demo", |prompt: &str| {
//!     vec![
//!         Ok(RunNode::user_prompt(prompt)),
//!         Ok(RunNode::model_request(ScriptedSource::new(vec![
//!             RawEvent::text_start(0, "Hello"),
//!             RawEvent::text_delta(0, " world"),
//!         ]))),
//!         Ok(RunNode::end("Hello world")),
//!     ]
//! }));
//!
//! let router = Router::builder().build()?;
//! let mut chunks = router.run(agent, "Say hello")?;
//! while let Some(chunk) = chunks.next().await {
//!     print!("{}", chunk?);
//! }
//! # Ok(())
//! # }
//! ```

/// Event classification into display and debug channels.
pub mod classify;
/// Configuration for routing behavior.
pub mod config;
/// Final output of spawned runs.
pub mod content;
/// Diagnostic log and sinks.
pub mod debug_log;
/// Public error types.
pub mod errors;
/// Raw sub-stream event shapes.
pub mod event;
/// Run nodes and the contracts of the agent-run provider.
pub mod node;
/// Process-wide logging setup.
pub mod observability;
mod orchestrator;
/// Common imports for typical usage.
pub mod prelude;
/// Per-node dual-channel adapter.
pub mod route;
/// Router entry point and builder.
pub mod router;
/// Spawned run handle and cancellation handle.
pub mod run;
/// In-memory agent runs and event sources.
pub mod scripted;
/// Events exposed by spawned runs.
pub mod stream;

pub use classify::{ClassifiedEvent, classify};
pub use config::{DiagnosticFlush, RouterConfig};
pub use content::RunOutput;
pub use debug_log::{DebugLog, DiagnosticSink, FlushedLog, MemorySink, TracingSink};
pub use errors::{RouterError, SourceError};
pub use event::{Delta, Part, RawEvent, ToolCallPart};
pub use node::{AgentRun, EventSource, EventStream, NodeKind, NodeStream, RunNode};
pub use route::route;
pub use router::{DisplayStream, Router, RouterBuilder};
pub use run::{AbortHandle, RunStream};
pub use scripted::{ScriptedRun, ScriptedSource};
pub use stream::RouteEvent;
