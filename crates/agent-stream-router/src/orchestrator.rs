use std::sync::Arc;

use futures::{Stream, StreamExt as _};
use tracing::{debug, info, warn};

use crate::config::{DiagnosticFlush, RouterConfig};
use crate::debug_log::{DebugLog, DiagnosticSink};
use crate::errors::RouterError;
use crate::node::{NodeStream, RunNode, ScopedEvents};
use crate::route::{log_hidden, route};

const MODEL_REQUEST_MARKER: &str = "ModelRequestNode: streaming partial request tokens";
const TOOL_CALL_MARKER: &str = "ToolCallNode: streaming tool calls and results (debug only)";

/// Drives one agent run and flattens it into display text.
///
/// Text from model-request nodes is forwarded as soon as it arrives. If the
/// run reaches its end node without having forwarded any text, the final
/// result is yielded once instead. Diagnostics go to `sink` when the node
/// sequence is exhausted; a failed or abandoned run flushes nothing.
pub(crate) fn drive(
    run_id: uuid::Uuid,
    nodes: NodeStream,
    prompt: String,
    config: RouterConfig,
    sink: Arc<dyn DiagnosticSink>,
) -> impl Stream<Item = Result<String, RouterError>> + Send + 'static {
    async_stream::try_stream! {
        let mut nodes = nodes;
        let mut log = match config.diagnostics {
            DiagnosticFlush::Batch => DebugLog::new(run_id),
            DiagnosticFlush::Incremental => DebugLog::teed(run_id, sink.clone()),
        };
        let mut content_streamed = false;
        let mut fallback_emitted = false;
        let mut seq = 0_u64;
        info!(run_id = %run_id, prompt_chars = prompt.chars().count(), "agent run started");

        while let Some(node) = nodes.next().await {
            let node = node
                .inspect_err(|err| warn!(run_id = %run_id, error = %err, "agent run aborted"))?;
            let kind = node.kind();
            match node {
                RunNode::UserPrompt { prompt } => {
                    log.push(format!("UserPromptNode: {prompt}"));
                }
                RunNode::ModelRequest(mut source) => {
                    if config.node_markers {
                        log.push(MODEL_REQUEST_MARKER);
                    }
                    let events = ScopedEvents::open(run_id, kind, source.as_mut())
                        .await
                        .inspect_err(|err| warn!(run_id = %run_id, node = %kind, error = %err, "failed to open node sub-stream"))?;
                    let chunks = route(events, &mut log);
                    futures::pin_mut!(chunks);
                    while let Some(chunk) = chunks.next().await {
                        let chunk = chunk
                            .inspect_err(|err| warn!(run_id = %run_id, node = %kind, error = %err, "node sub-stream failed"))?;
                        if chunk.is_empty() {
                            continue;
                        }
                        content_streamed = true;
                        debug!(run_id = %run_id, seq, "display chunk");
                        seq = seq.saturating_add(1);
                        yield chunk;
                    }
                }
                RunNode::ToolCall(mut source) => {
                    if config.node_markers {
                        log.push(TOOL_CALL_MARKER);
                    }
                    let events = ScopedEvents::open(run_id, kind, source.as_mut())
                        .await
                        .inspect_err(|err| warn!(run_id = %run_id, node = %kind, error = %err, "failed to open node sub-stream"))?;
                    log_hidden(events, &mut log)
                        .await
                        .inspect_err(|err| warn!(run_id = %run_id, node = %kind, error = %err, "node sub-stream failed"))?;
                }
                RunNode::End { final_result } => {
                    if content_streamed || fallback_emitted {
                        log.push(format!("end_node: {final_result}"));
                    } else {
                        fallback_emitted = true;
                        debug!(run_id = %run_id, seq, "no text streamed, emitting final result");
                        seq = seq.saturating_add(1);
                        yield final_result;
                    }
                }
                RunNode::Other { kind, detail } => {
                    log.push(format!("Unknown Node: {kind}: {detail}"));
                }
            }
        }

        info!(
            run_id = %run_id,
            chunks = seq,
            fallback = fallback_emitted,
            debug_entries = log.len(),
            "agent run completed"
        );
        sink.flush(run_id, &log);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug_log::MemorySink;
    use crate::errors::SourceError;
    use crate::event::{RawEvent, ToolCallPart};
    use crate::scripted::{ScriptedSource, nodes};
    use futures::TryStreamExt as _;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn run_to_end(
        run: Vec<Result<RunNode, SourceError>>,
        config: RouterConfig,
    ) -> (Result<Vec<String>, RouterError>, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let output = drive(
            uuid::Uuid::new_v4(),
            nodes(run),
            "prompt".into(),
            config,
            sink.clone(),
        )
        .try_collect::<Vec<_>>()
        .await;
        (output, sink)
    }

    #[tokio::test]
    async fn streamed_text_suppresses_final_result() {
        let (output, sink) = run_to_end(
            vec![
                Ok(RunNode::user_prompt("hi")),
                Ok(RunNode::model_request(ScriptedSource::new(vec![
                    RawEvent::text_delta(0, "Hello"),
                    RawEvent::text_delta(0, " world"),
                ]))),
                Ok(RunNode::end("Hello world")),
            ],
            RouterConfig::default(),
        )
        .await;

        assert_eq!(output.expect("run"), vec!["Hello", " world"]);
        assert_eq!(
            sink.last_entries().expect("flushed"),
            vec!["UserPromptNode: hi", "end_node: Hello world"]
        );
    }

    #[tokio::test]
    async fn tool_only_run_falls_back_to_final_result() {
        let (output, sink) = run_to_end(
            vec![
                Ok(RunNode::user_prompt("call tool")),
                Ok(RunNode::tool_call(ScriptedSource::new(vec![
                    RawEvent::tool_call_start(0, ToolCallPart::new("answer", json!({}))),
                    RawEvent::tool_result("answer", json!(42)),
                ]))),
                Ok(RunNode::end("Tool said 42")),
            ],
            RouterConfig::default(),
        )
        .await;

        assert_eq!(output.expect("run"), vec!["Tool said 42"]);
        let entries = sink.last_entries().expect("flushed");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], "UserPromptNode: call tool");
        assert!(entries[1].starts_with("part_start:"));
        assert!(entries[2].starts_with("function_tool_result:"));
    }

    #[tokio::test]
    async fn empty_final_result_still_falls_back() {
        let (output, _) = run_to_end(vec![Ok(RunNode::end(""))], RouterConfig::default()).await;
        assert_eq!(output.expect("run"), vec![String::new()]);
    }

    #[tokio::test]
    async fn unknown_node_is_logged_and_skipped() {
        let (output, sink) = run_to_end(
            vec![
                Ok(RunNode::model_request(ScriptedSource::new(vec![
                    RawEvent::text_start(0, "ok"),
                ]))),
                Ok(RunNode::other("CheckpointNode", "step 3")),
                Ok(RunNode::end("ok")),
            ],
            RouterConfig::default(),
        )
        .await;

        assert_eq!(output.expect("run"), vec!["ok"]);
        assert_eq!(
            sink.last_entries().expect("flushed"),
            vec!["Unknown Node: CheckpointNode: step 3", "end_node: ok"]
        );
    }

    #[tokio::test]
    async fn tool_node_text_is_logged_not_forwarded() {
        let (output, sink) = run_to_end(
            vec![
                Ok(RunNode::tool_call(ScriptedSource::new(vec![
                    RawEvent::text_delta(0, "tool chatter"),
                ]))),
                Ok(RunNode::end("done")),
            ],
            RouterConfig::default(),
        )
        .await;

        assert_eq!(output.expect("run"), vec!["done"]);
        assert_eq!(
            sink.last_entries().expect("flushed"),
            vec!["ToolCallNode text: tool chatter"]
        );
    }

    #[tokio::test]
    async fn tool_node_text_keeps_its_place_in_the_log() {
        let (output, sink) = run_to_end(
            vec![
                Ok(RunNode::tool_call(ScriptedSource::new(vec![
                    RawEvent::text_delta(0, "early"),
                    RawEvent::tool_result("t", json!(1)),
                    RawEvent::text_delta(0, ""),
                    RawEvent::text_delta(0, "late"),
                ]))),
                Ok(RunNode::end("done")),
            ],
            RouterConfig::default().diagnostics(DiagnosticFlush::Incremental),
        )
        .await;

        assert_eq!(output.expect("run"), vec!["done"]);
        let expected = vec![
            "ToolCallNode text: early",
            "function_tool_result: t -> 1",
            "ToolCallNode text: late",
        ];
        let live: Vec<String> = sink.recorded().into_iter().map(|(_, e)| e).collect();
        assert_eq!(live, expected);
        assert_eq!(sink.last_entries().expect("flushed"), expected);
    }

    #[tokio::test]
    async fn empty_deltas_do_not_count_as_streamed_content() {
        let (output, _) = run_to_end(
            vec![
                Ok(RunNode::model_request(ScriptedSource::new(vec![
                    RawEvent::text_start(0, ""),
                ]))),
                Ok(RunNode::end("fallback")),
            ],
            RouterConfig::default(),
        )
        .await;
        assert_eq!(output.expect("run"), vec!["fallback"]);
    }

    #[tokio::test]
    async fn fallback_fires_at_most_once() {
        let (output, sink) = run_to_end(
            vec![Ok(RunNode::end("first")), Ok(RunNode::end("second"))],
            RouterConfig::default(),
        )
        .await;
        assert_eq!(output.expect("run"), vec!["first"]);
        assert_eq!(
            sink.last_entries().expect("flushed"),
            vec!["end_node: second"]
        );
    }

    #[tokio::test]
    async fn node_markers_are_opt_in() {
        let (_, sink) = run_to_end(
            vec![
                Ok(RunNode::model_request(ScriptedSource::new(vec![]))),
                Ok(RunNode::tool_call(ScriptedSource::new(vec![]))),
                Ok(RunNode::end("r")),
            ],
            RouterConfig::default().node_markers(true),
        )
        .await;
        assert_eq!(
            sink.last_entries().expect("flushed"),
            vec![MODEL_REQUEST_MARKER, TOOL_CALL_MARKER]
        );
    }

    #[tokio::test]
    async fn sub_stream_failure_aborts_after_partial_output() {
        let sink = Arc::new(MemorySink::new());
        let stream = drive(
            uuid::Uuid::new_v4(),
            nodes(vec![
                Ok(RunNode::model_request(ScriptedSource::from_results(vec![
                    Ok(RawEvent::text_delta(0, "par")),
                    Err(SourceError::transport("socket closed")),
                ]))),
                Ok(RunNode::end("never")),
            ]),
            "p".into(),
            RouterConfig::default(),
            sink.clone(),
        );
        futures::pin_mut!(stream);

        assert_eq!(stream.next().await, Some(Ok("par".to_string())));
        assert_eq!(
            stream.next().await,
            Some(Err(RouterError::Source(SourceError::transport(
                "socket closed"
            ))))
        );
        assert_eq!(stream.next().await, None);
        assert!(sink.flushed().is_empty());
    }

    #[tokio::test]
    async fn acquisition_failure_aborts_the_run() {
        let (output, sink) = run_to_end(
            vec![
                Ok(RunNode::tool_call(ScriptedSource::failing(
                    SourceError::provider("tool backend down", Some(503)),
                ))),
                Ok(RunNode::end("never")),
            ],
            RouterConfig::default(),
        )
        .await;
        assert_eq!(
            output,
            Err(RouterError::Source(SourceError::provider(
                "tool backend down",
                Some(503)
            )))
        );
        assert!(sink.flushed().is_empty());
    }

    #[tokio::test]
    async fn outer_run_failure_aborts_the_run() {
        let (output, _) = run_to_end(
            vec![
                Ok(RunNode::user_prompt("hi")),
                Err(SourceError::protocol("node stream corrupted")),
                Ok(RunNode::end("never")),
            ],
            RouterConfig::default(),
        )
        .await;
        assert_eq!(
            output,
            Err(RouterError::Source(SourceError::protocol(
                "node stream corrupted"
            )))
        );
    }

    #[tokio::test]
    async fn abandoning_the_output_releases_the_sub_stream() {
        let released = Arc::new(AtomicUsize::new(0));
        let source = ScriptedSource::new(vec![
            RawEvent::text_delta(0, "one"),
            RawEvent::text_delta(0, "two"),
        ])
        .track_release(released.clone());
        let sink = Arc::new(MemorySink::new());
        let stream = drive(
            uuid::Uuid::new_v4(),
            nodes(vec![Ok(RunNode::model_request(source)), Ok(RunNode::end("x"))]),
            "p".into(),
            RouterConfig::default(),
            sink.clone(),
        );
        let mut stream = Box::pin(stream);

        assert_eq!(stream.next().await, Some(Ok("one".to_string())));
        assert_eq!(released.load(Ordering::SeqCst), 0);
        drop(stream);
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert!(sink.flushed().is_empty());
    }

    #[tokio::test]
    async fn drained_sub_streams_are_released_before_the_next_node() {
        let released = Arc::new(AtomicUsize::new(0));
        let first = ScriptedSource::new(vec![RawEvent::text_delta(0, "a")])
            .track_release(released.clone());
        let second = ScriptedSource::new(vec![RawEvent::tool_result("t", json!(1))])
            .track_release(released.clone());
        let (output, _) = run_to_end(
            vec![
                Ok(RunNode::model_request(first)),
                Ok(RunNode::tool_call(second)),
                Ok(RunNode::end("a")),
            ],
            RouterConfig::default(),
        )
        .await;
        assert_eq!(output.expect("run"), vec!["a"]);
        assert_eq!(released.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn incremental_diagnostics_reach_the_sink_before_completion() {
        let sink = Arc::new(MemorySink::new());
        let stream = drive(
            uuid::Uuid::new_v4(),
            nodes(vec![
                Ok(RunNode::user_prompt("hi")),
                Ok(RunNode::model_request(ScriptedSource::new(vec![
                    RawEvent::other("ping", json!(null)),
                    RawEvent::text_delta(0, "hey"),
                ]))),
                Ok(RunNode::end("hey")),
            ]),
            "hi".into(),
            RouterConfig::default().diagnostics(DiagnosticFlush::Incremental),
            sink.clone(),
        );
        futures::pin_mut!(stream);

        assert_eq!(stream.next().await, Some(Ok("hey".to_string())));
        let live: Vec<String> = sink.recorded().into_iter().map(|(_, e)| e).collect();
        assert_eq!(live, vec!["UserPromptNode: hi", "UNKNOWN ping: null"]);
        assert!(sink.flushed().is_empty());

        assert_eq!(stream.next().await, None);
        assert_eq!(sink.recorded().len(), 3);
        assert_eq!(sink.flushed().len(), 1);
    }
}
