use std::sync::Arc;

use futures::stream::BoxStream;
use futures::{Stream, TryStreamExt as _, stream};
use tracing::warn;

use crate::config::RouterConfig;
use crate::debug_log::{DiagnosticSink, TracingSink};
use crate::errors::RouterError;
use crate::node::{AgentRun, NodeStream};
use crate::orchestrator;
use crate::run::{RunStream, spawn_run};

/// Lazy, single-pass sequence of display text for one run.
pub type DisplayStream = BoxStream<'static, Result<String, RouterError>>;

pub(crate) struct RouterInner {
    config: RouterConfig,
    sink: Arc<dyn DiagnosticSink>,
}

/// Entry point for routing agent runs.
#[derive(Clone)]
pub struct Router {
    pub(crate) inner: Arc<RouterInner>,
}

impl Router {
    /// Starts a builder for configuring a `Router`.
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    pub fn config(&self) -> &RouterConfig {
        &self.inner.config
    }

    /// Routes an already started run.
    ///
    /// `prompt` is the prompt the run was started with; the node sequence
    /// reports it to the debug log through its user-prompt node.
    pub fn drive(&self, nodes: NodeStream, prompt: impl Into<String>) -> DisplayStream {
        Box::pin(orchestrator::drive(
            uuid::Uuid::new_v4(),
            nodes,
            prompt.into(),
            self.inner.config.clone(),
            self.inner.sink.clone(),
        ))
    }

    /// Starts `agent` on first poll and routes its run.
    ///
    /// The prompt is validated immediately; a failure to start the run is
    /// reported as the first (and only) item of the returned stream.
    pub fn run(
        &self,
        agent: Arc<dyn AgentRun>,
        prompt: impl Into<String>,
    ) -> Result<DisplayStream, RouterError> {
        let prompt = validate_prompt(prompt.into())?;
        Ok(Box::pin(self.run_stream(uuid::Uuid::new_v4(), agent, prompt)))
    }

    /// Runs `agent` on a background task and returns a handle for consuming
    /// its events. Must be called from within a Tokio runtime.
    pub fn spawn(
        &self,
        agent: Arc<dyn AgentRun>,
        prompt: impl Into<String>,
    ) -> Result<RunStream, RouterError> {
        let prompt = validate_prompt(prompt.into())?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| RouterError::Config(format!("spawn requires a Tokio runtime: {e}")))?;
        let run_id = uuid::Uuid::new_v4();
        let agent_name = agent.name().to_string();
        let chunks = Box::pin(self.run_stream(run_id, agent, prompt));
        Ok(spawn_run(
            &runtime,
            run_id,
            agent_name,
            chunks,
            self.inner.config.stream_buffer_capacity,
        ))
    }

    /// Runs `agent` to completion and returns the concatenated display text.
    pub async fn collect_text(
        &self,
        agent: Arc<dyn AgentRun>,
        prompt: impl Into<String>,
    ) -> Result<String, RouterError> {
        let chunks: Vec<String> = self.run(agent, prompt)?.try_collect().await?;
        Ok(chunks.concat())
    }

    fn run_stream(
        &self,
        run_id: uuid::Uuid,
        agent: Arc<dyn AgentRun>,
        prompt: String,
    ) -> impl Stream<Item = Result<String, RouterError>> + Send + 'static {
        let config = self.inner.config.clone();
        let sink = self.inner.sink.clone();
        let started = async move {
            let nodes = agent.start(&prompt).await.inspect_err(|err| {
                warn!(run_id = %run_id, agent = agent.name(), error = %err, "agent run failed to start");
            })?;
            Ok::<_, RouterError>(orchestrator::drive(run_id, nodes, prompt, config, sink))
        };
        stream::once(started).try_flatten()
    }
}

fn validate_prompt(prompt: String) -> Result<String, RouterError> {
    if prompt.trim().is_empty() {
        return Err(RouterError::Validation("prompt must not be empty".into()));
    }
    Ok(prompt)
}

/// Builder used to configure a `Router`.
#[derive(Default)]
pub struct RouterBuilder {
    config: Option<RouterConfig>,
    sink: Option<Arc<dyn DiagnosticSink>>,
}

impl RouterBuilder {
    /// Replaces the default configuration.
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets where finished debug logs go (default: `TracingSink`).
    pub fn diagnostic_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds the router after validating the configuration.
    pub fn build(self) -> Result<Router, RouterError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        Ok(Router {
            inner: Arc::new(RouterInner {
                config,
                sink: self.sink.unwrap_or_else(|| Arc::new(TracingSink)),
            }),
        })
    }
}
