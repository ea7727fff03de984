use std::io::Write as _;
use std::sync::Arc;

use agent_stream_router::observability::init_observability;
use agent_stream_router::prelude::*;
use futures::StreamExt as _;
use serde_json::json;

/// A run that calls a tool and then answers in streamed text, or, for prompts
/// mentioning "quiet", answers through tool calls only so the final result
/// is emitted as a fallback.
fn weather_agent() -> Arc<dyn AgentRun> {
    Arc::new(ScriptedRun::new("weather", |prompt: &str| {
        let call = ToolCallPart::new("get_weather", json!({"city": "Lisbon"})).with_id("call_1");
        let mut nodes = vec![
            Ok(RunNode::user_prompt(prompt)),
            Ok(RunNode::model_request(ScriptedSource::new(vec![
                RawEvent::tool_call_start(0, call.clone()),
                RawEvent::tool_args_delta(0, r#"{"city":"Lisbon"}"#),
            ]))),
            Ok(RunNode::tool_call(ScriptedSource::new(vec![
                RawEvent::tool_call(call),
                RawEvent::tool_result("get_weather", json!({"sky": "clear", "celsius": 24})),
            ]))),
        ];
        if !prompt.contains("quiet") {
            nodes.push(Ok(RunNode::model_request(ScriptedSource::new(vec![
                RawEvent::text_start(0, "Clear skies"),
                RawEvent::text_delta(0, " in Lisbon,"),
                RawEvent::text_delta(0, " 24°C."),
            ]))));
        }
        nodes.push(Ok(RunNode::end("Clear skies in Lisbon, 24°C.")));
        nodes
    }))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), RouterError> {
    init_observability();

    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "What's the weather in Lisbon?".to_string());
    let sink = Arc::new(MemorySink::new());
    let router = Router::builder()
        .config(RouterConfig::from_env()?)
        .diagnostic_sink(sink.clone())
        .build()?;

    let mut chunks = router.run(weather_agent(), prompt)?;
    let mut stdout = std::io::stdout();
    while let Some(chunk) = chunks.next().await {
        print!("{}", chunk?);
        let _ = stdout.flush();
    }
    println!();

    if let Some(entries) = sink.last_entries() {
        println!("\nDebug:");
        println!("{}", entries.join("\n"));
    }
    Ok(())
}
