use crate::event::{Delta, Part, RawEvent};

/// Outcome of classifying one `RawEvent`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum ClassifiedEvent {
    /// Text meant for the end user.
    Display { text: String },
    /// Diagnostic description, kept out of the display channel.
    Debug { description: String },
}

impl ClassifiedEvent {
    pub fn is_display(&self) -> bool {
        matches!(self, Self::Display { .. })
    }

    fn debug(kind: &str, summary: impl std::fmt::Display) -> Self {
        Self::Debug {
            description: format!("{kind}: {summary}"),
        }
    }

    fn unknown(kind: &str, payload: &serde_json::Value) -> Self {
        Self::Debug {
            description: format!("UNKNOWN {kind}: {payload}"),
        }
    }
}

/// Maps one raw event to exactly one channel.
///
/// Rules are checked in order and the first match wins:
/// 1. a text part start carries display text;
/// 2. a text delta carries display text;
/// 3. tool-call starts and deltas, final-result markers, tool calls and tool
///    results become debug summaries;
/// 4. anything else becomes an `UNKNOWN` debug entry.
pub fn classify(event: RawEvent) -> ClassifiedEvent {
    match event {
        RawEvent::PartStart {
            part: Part::Text { content },
            ..
        } => ClassifiedEvent::Display { text: content },
        RawEvent::PartDelta {
            delta: Delta::Text { content_delta },
            ..
        } => ClassifiedEvent::Display {
            text: content_delta,
        },
        RawEvent::PartStart {
            index,
            part: Part::ToolCall(part),
        } => ClassifiedEvent::debug("part_start", format_args!("[{index}] tool_call {part}")),
        RawEvent::PartDelta {
            index,
            delta:
                Delta::ToolCall {
                    tool_name_delta,
                    args_delta,
                    tool_call_id,
                },
        } => {
            let mut summary = format!("[{index}] tool_call");
            if let Some(id) = tool_call_id {
                summary.push_str(&format!(" (id={id})"));
            }
            if let Some(name) = tool_name_delta {
                summary.push_str(&format!(" name_delta={name:?}"));
            }
            if let Some(args) = args_delta {
                summary.push_str(&format!(" args_delta={args:?}"));
            }
            ClassifiedEvent::debug("part_delta", summary)
        }
        RawEvent::FinalResult {
            tool_name,
            tool_call_id,
        } => ClassifiedEvent::debug(
            "final_result",
            format_args!(
                "tool_name={} tool_call_id={}",
                tool_name.as_deref().unwrap_or("-"),
                tool_call_id.as_deref().unwrap_or("-")
            ),
        ),
        RawEvent::FunctionToolCall { part } => ClassifiedEvent::debug("function_tool_call", part),
        RawEvent::FunctionToolResult {
            tool_name,
            tool_call_id,
            content,
        } => {
            let id = tool_call_id
                .map(|id| format!(" (id={id})"))
                .unwrap_or_default();
            ClassifiedEvent::debug(
                "function_tool_result",
                format_args!("{tool_name}{id} -> {content}"),
            )
        }
        RawEvent::PartStart {
            part: Part::Other { kind, payload },
            ..
        } => ClassifiedEvent::unknown(&format!("part_start/{kind}"), &payload),
        RawEvent::PartDelta {
            delta: Delta::Other { kind, payload },
            ..
        } => ClassifiedEvent::unknown(&format!("part_delta/{kind}"), &payload),
        RawEvent::Other { kind, payload } => ClassifiedEvent::unknown(&kind, &payload),
    }
}
