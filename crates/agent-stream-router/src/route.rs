use futures::{Stream, StreamExt as _, stream};

use crate::classify::{ClassifiedEvent, classify};
use crate::debug_log::DebugLog;
use crate::errors::SourceError;
use crate::event::RawEvent;

/// Splits one node sub-stream into display text and debug entries.
///
/// Display text is yielded in source order; debug descriptions are appended
/// to `log` in source order as they are reached. Nothing is read ahead of
/// demand, and the first upstream error ends the stream.
pub fn route<'a, S>(
    events: S,
    log: &'a mut DebugLog,
) -> impl Stream<Item = Result<String, SourceError>> + Send + 'a
where
    S: Stream<Item = Result<RawEvent, SourceError>> + Send + Unpin + 'a,
{
    stream::try_unfold((events, log), |(mut events, log)| async move {
        loop {
            match events.next().await {
                Some(Ok(event)) => match classify(event) {
                    ClassifiedEvent::Display { text } => return Ok(Some((text, (events, log)))),
                    ClassifiedEvent::Debug { description } => log.push(description),
                },
                Some(Err(err)) => return Err(err),
                None => return Ok(None),
            }
        }
    })
}

/// Drains a sub-stream whose display text is never shown, logging every
/// event in arrival order.
///
/// Display text becomes a `ToolCallNode text:` entry at the point it was
/// read; empty text is skipped.
pub(crate) async fn log_hidden<S>(mut events: S, log: &mut DebugLog) -> Result<(), SourceError>
where
    S: Stream<Item = Result<RawEvent, SourceError>> + Send + Unpin,
{
    while let Some(event) = events.next().await {
        match classify(event?) {
            ClassifiedEvent::Display { text } if text.is_empty() => {}
            ClassifiedEvent::Display { text } => log.push(format!("ToolCallNode text: {text}")),
            ClassifiedEvent::Debug { description } => log.push(description),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ToolCallPart;
    use futures::TryStreamExt as _;
    use serde_json::json;

    fn source(
        events: Vec<Result<RawEvent, SourceError>>,
    ) -> impl Stream<Item = Result<RawEvent, SourceError>> + Send + Unpin {
        stream::iter(events)
    }

    #[tokio::test]
    async fn display_and_debug_keep_their_own_order() {
        let mut log = DebugLog::new(uuid::Uuid::new_v4());
        let events = source(vec![
            Ok(RawEvent::text_start(0, "a")),
            Ok(RawEvent::tool_call(ToolCallPart::new("first", json!(null)))),
            Ok(RawEvent::text_delta(0, "b")),
            Ok(RawEvent::tool_call(ToolCallPart::new("second", json!(null)))),
            Ok(RawEvent::other("mystery", json!(1))),
            Ok(RawEvent::text_delta(0, "c")),
        ]);

        let chunks: Vec<String> = route(events, &mut log).try_collect().await.expect("route");
        assert_eq!(chunks, vec!["a", "b", "c"]);
        assert_eq!(
            log.entries(),
            [
                "function_tool_call: first",
                "function_tool_call: second",
                "UNKNOWN mystery: 1",
            ]
        );
    }

    #[tokio::test]
    async fn debug_entries_are_logged_only_as_far_as_consumed() {
        let mut log = DebugLog::new(uuid::Uuid::new_v4());
        let events = source(vec![
            Ok(RawEvent::other("before", json!(null))),
            Ok(RawEvent::text_delta(0, "x")),
            Ok(RawEvent::other("after", json!(null))),
        ]);
        {
            let routed = route(events, &mut log);
            futures::pin_mut!(routed);
            let first = routed.next().await.expect("one chunk").expect("ok");
            assert_eq!(first, "x");
        }
        assert_eq!(log.entries(), ["UNKNOWN before: null"]);
    }

    #[tokio::test]
    async fn upstream_error_ends_the_stream_after_earlier_output() {
        let mut log = DebugLog::new(uuid::Uuid::new_v4());
        let events = source(vec![
            Ok(RawEvent::text_delta(0, "partial")),
            Err(SourceError::transport("connection reset")),
            Ok(RawEvent::text_delta(0, "never")),
        ]);
        let routed = route(events, &mut log);
        futures::pin_mut!(routed);
        assert_eq!(routed.next().await, Some(Ok("partial".to_string())));
        assert_eq!(
            routed.next().await,
            Some(Err(SourceError::transport("connection reset")))
        );
        assert_eq!(routed.next().await, None);
    }

    #[tokio::test]
    async fn only_debug_events_yield_nothing() {
        let mut log = DebugLog::new(uuid::Uuid::new_v4());
        let events = source(vec![
            Ok(RawEvent::tool_call_start(0, ToolCallPart::new("t", json!({})))),
            Ok(RawEvent::tool_result("t", json!("ok"))),
        ]);
        let chunks: Vec<String> = route(events, &mut log).try_collect().await.expect("route");
        assert!(chunks.is_empty());
        assert_eq!(log.len(), 2);
    }

    #[tokio::test]
    async fn hidden_text_is_logged_where_it_arrives() {
        let mut log = DebugLog::new(uuid::Uuid::new_v4());
        let events = source(vec![
            Ok(RawEvent::text_delta(0, "early")),
            Ok(RawEvent::tool_result("t", json!(1))),
            Ok(RawEvent::text_delta(0, "")),
            Ok(RawEvent::text_delta(0, "late")),
        ]);
        log_hidden(events, &mut log).await.expect("drain");
        assert_eq!(
            log.entries(),
            [
                "ToolCallNode text: early",
                "function_tool_result: t -> 1",
                "ToolCallNode text: late",
            ]
        );
    }

    #[tokio::test]
    async fn hidden_drain_stops_at_the_first_error() {
        let mut log = DebugLog::new(uuid::Uuid::new_v4());
        let events = source(vec![
            Ok(RawEvent::text_delta(0, "before")),
            Err(SourceError::protocol("bad frame")),
            Ok(RawEvent::text_delta(0, "after")),
        ]);
        let result = log_hidden(events, &mut log).await;
        assert_eq!(result, Err(SourceError::protocol("bad frame")));
        assert_eq!(log.entries(), ["ToolCallNode text: before"]);
    }
}
