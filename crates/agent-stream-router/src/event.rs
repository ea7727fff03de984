use std::fmt;

/// A tool invocation as the model described it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolCallPart {
    /// Name of the tool the model asked for.
    pub tool_name: String,
    /// Arguments exactly as the model produced them (object or raw string).
    #[serde(default)]
    pub args: serde_json::Value,
    /// Provider-assigned call id, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ToolCallPart {
    pub fn new(tool_name: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            args,
            tool_call_id: None,
        }
    }

    pub fn with_id(mut self, tool_call_id: impl Into<String>) -> Self {
        self.tool_call_id = Some(tool_call_id.into());
        self
    }
}

impl fmt::Display for ToolCallPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tool_name)?;
        if let Some(id) = &self.tool_call_id {
            write!(f, " (id={id})")?;
        }
        if !self.args.is_null() {
            write!(f, " args={}", self.args)?;
        }
        Ok(())
    }
}

/// The content part announced by a `RawEvent::PartStart`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "part_kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum Part {
    /// A text part with its first piece of inline content.
    Text { content: String },
    /// A tool-call part.
    ToolCall(ToolCallPart),
    /// Any part shape this crate does not model.
    Other {
        kind: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
}

/// An incremental update to a previously started part.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "delta_kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum Delta {
    /// More text for a text part.
    Text { content_delta: String },
    /// More of a tool call (usually argument JSON fragments).
    ToolCall {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_name_delta: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        args_delta: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_call_id: Option<String>,
    },
    /// Any delta shape this crate does not model.
    Other {
        kind: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
}

/// One low-level event from a node sub-stream.
///
/// The router never interprets these beyond classification; producers are
/// free to surface shapes this crate does not know about through `Other`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "event_kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum RawEvent {
    /// A new content part started at `index`.
    PartStart { index: usize, part: Part },
    /// The part at `index` received an incremental update.
    PartDelta { index: usize, delta: Delta },
    /// The model produced output that will become the final result.
    FinalResult {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_call_id: Option<String>,
    },
    /// The agent is about to invoke a tool.
    FunctionToolCall { part: ToolCallPart },
    /// A tool returned.
    FunctionToolResult {
        tool_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_call_id: Option<String>,
        #[serde(default)]
        content: serde_json::Value,
    },
    /// Unrecognized event shape.
    Other {
        kind: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
}

impl RawEvent {
    /// Start of a text part carrying `content`.
    pub fn text_start(index: usize, content: impl Into<String>) -> Self {
        Self::PartStart {
            index,
            part: Part::Text {
                content: content.into(),
            },
        }
    }

    /// Text delta for the part at `index`.
    pub fn text_delta(index: usize, content_delta: impl Into<String>) -> Self {
        Self::PartDelta {
            index,
            delta: Delta::Text {
                content_delta: content_delta.into(),
            },
        }
    }

    /// Start of a tool-call part.
    pub fn tool_call_start(index: usize, part: ToolCallPart) -> Self {
        Self::PartStart {
            index,
            part: Part::ToolCall(part),
        }
    }

    /// Argument fragment for the tool-call part at `index`.
    pub fn tool_args_delta(index: usize, args_delta: impl Into<String>) -> Self {
        Self::PartDelta {
            index,
            delta: Delta::ToolCall {
                tool_name_delta: None,
                args_delta: Some(args_delta.into()),
                tool_call_id: None,
            },
        }
    }

    /// Tool invocation announced by the agent.
    pub fn tool_call(part: ToolCallPart) -> Self {
        Self::FunctionToolCall { part }
    }

    /// Result returned by a tool.
    pub fn tool_result(tool_name: impl Into<String>, content: serde_json::Value) -> Self {
        Self::FunctionToolResult {
            tool_name: tool_name.into(),
            tool_call_id: None,
            content,
        }
    }

    /// Unrecognized event shape with an arbitrary payload.
    pub fn other(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::Other {
            kind: kind.into(),
            payload,
        }
    }

    /// Stable name of the event shape, used as the prefix of debug entries.
    pub fn kind(&self) -> &str {
        match self {
            Self::PartStart { .. } => "part_start",
            Self::PartDelta { .. } => "part_delta",
            Self::FinalResult { .. } => "final_result",
            Self::FunctionToolCall { .. } => "function_tool_call",
            Self::FunctionToolResult { .. } => "function_tool_result",
            Self::Other { kind, .. } => kind,
        }
    }
}
