use crate::content::RunOutput;
use crate::errors::RouterError;

/// Events exposed by a spawned `RunStream`.
#[derive(Clone, Debug, PartialEq)]
pub enum RouteEvent {
    /// First event for every run.
    RunStarted { run_id: uuid::Uuid, agent: String },
    /// Display text, in the order it was produced.
    Chunk {
        run_id: uuid::Uuid,
        seq: u64,
        text: String,
    },
    /// Terminal success event with every forwarded chunk.
    Completed {
        run_id: uuid::Uuid,
        output: RunOutput,
    },
    /// Terminal failure event.
    Error {
        run_id: uuid::Uuid,
        error: RouterError,
    },
}

impl RouteEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Error { .. })
    }
}
