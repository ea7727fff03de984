/// Errors produced by the collaborators that feed the router: the agent run
/// itself and the per-node event sources it exposes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Transport or stream I/O failed.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// The upstream model provider or agent framework reported a failure.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        status_code: Option<u16>,
    },
    /// Upstream produced an invalid sequence (for example a node stream that
    /// cannot be opened twice).
    #[error("protocol error: {message}")]
    Protocol { message: String },
}

impl SourceError {
    /// Creates a transport-level error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a provider-level error.
    pub fn provider(message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self::Provider {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a protocol-level error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Returns the human-readable message for this error.
    pub fn message(&self) -> &str {
        match self {
            Self::Transport { message }
            | Self::Provider { message, .. }
            | Self::Protocol { message } => message,
        }
    }
}

/// Top-level error type for the public router API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    /// Invalid router configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid caller input (for example a blank prompt).
    #[error("validation error: {0}")]
    Validation(String),
    /// The agent run or one of its node sub-streams failed. The source error
    /// is passed through unmodified.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// A spawned run was cancelled through its `AbortHandle`.
    #[error("run cancelled")]
    Cancelled,
    /// Internal protocol misuse or invariant violation.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl RouterError {
    pub(crate) fn protocol_msg(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Returns the upstream error when this failure came from the agent run.
    pub fn source_error(&self) -> Option<&SourceError> {
        match self {
            Self::Source(err) => Some(err),
            _ => None,
        }
    }
}
