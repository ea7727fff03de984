use crate::errors::RouterError;

const DIAGNOSTICS_ENV: &str = "AGENT_ROUTER_DIAGNOSTICS";
const NODE_MARKERS_ENV: &str = "AGENT_ROUTER_NODE_MARKERS";
const STREAM_BUFFER_ENV: &str = "AGENT_ROUTER_STREAM_BUFFER";

/// When diagnostic entries reach the `DiagnosticSink`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticFlush {
    /// Hand the whole log to the sink once, after the run completes.
    #[default]
    Batch,
    /// Also hand every entry to the sink as soon as it is appended.
    Incremental,
}

impl std::str::FromStr for DiagnosticFlush {
    type Err = RouterError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "batch" => Ok(Self::Batch),
            "incremental" | "stream" => Ok(Self::Incremental),
            other => Err(RouterError::Config(format!(
                "unknown diagnostics mode `{other}` (expected batch or incremental)"
            ))),
        }
    }
}

/// Router behavior options.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RouterConfig {
    /// Diagnostic delivery mode.
    pub diagnostics: DiagnosticFlush,
    /// Log a marker entry when entering model-request and tool-call nodes.
    pub node_markers: bool,
    /// Bounded event buffer size used by spawned runs.
    pub stream_buffer_capacity: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            diagnostics: DiagnosticFlush::Batch,
            node_markers: false,
            stream_buffer_capacity: 128,
        }
    }
}

impl RouterConfig {
    /// Builds a config from defaults overridden by `AGENT_ROUTER_*` variables.
    ///
    /// - `AGENT_ROUTER_DIAGNOSTICS`: `batch` or `incremental`.
    /// - `AGENT_ROUTER_NODE_MARKERS`: boolean word (`1`, `true`, `off`, ...).
    /// - `AGENT_ROUTER_STREAM_BUFFER`: positive integer.
    pub fn from_env() -> Result<Self, RouterError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, RouterError> {
        let mut config = Self::default();
        if let Some(value) = lookup(DIAGNOSTICS_ENV) {
            config.diagnostics = value.parse()?;
        }
        if let Some(value) = lookup(NODE_MARKERS_ENV) {
            config.node_markers = parse_bool_env(&value).ok_or_else(|| {
                RouterError::Config(format!("{NODE_MARKERS_ENV} must be a boolean, got `{value}`"))
            })?;
        }
        if let Some(value) = lookup(STREAM_BUFFER_ENV) {
            config.stream_buffer_capacity = value.trim().parse().map_err(|e| {
                RouterError::Config(format!("{STREAM_BUFFER_ENV} must be an integer: {e}"))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Sets the diagnostic delivery mode.
    pub fn diagnostics(mut self, mode: DiagnosticFlush) -> Self {
        self.diagnostics = mode;
        self
    }

    /// Enables or disables node marker entries.
    pub fn node_markers(mut self, enabled: bool) -> Self {
        self.node_markers = enabled;
        self
    }

    /// Sets the bounded channel size used by `Router::spawn`.
    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.stream_buffer_capacity = capacity;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), RouterError> {
        if self.stream_buffer_capacity == 0 {
            return Err(RouterError::Config(
                "stream_buffer_capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}
