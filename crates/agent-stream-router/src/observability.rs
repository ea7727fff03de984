use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::config::parse_bool_env;

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_JSON_LOG_FILE: &str = "agent-router.logs.jsonl";

fn observability_enabled(lookup: impl Fn(&str) -> Option<String>) -> bool {
    lookup("AGENT_ROUTER_OBSERVABILITY_ENABLED")
        .map(|value| parse_bool_env(&value).unwrap_or(true))
        .unwrap_or(true)
}

fn resolve_env_filter() -> tracing_subscriber::EnvFilter {
    if let Ok(level) = std::env::var("AGENT_ROUTER_LOG_LEVEL")
        && let Ok(filter) = tracing_subscriber::EnvFilter::try_new(level)
    {
        return filter;
    }
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

/// Initialize logging once per process.
///
/// Environment variables:
/// - `AGENT_ROUTER_OBSERVABILITY_ENABLED`: optional enable/disable flag (default enabled).
/// - `AGENT_ROUTER_LOG_LEVEL`: optional level/filter override (`info`, `agent_stream_router=debug`, ...).
/// - `AGENT_ROUTER_JSON_LOG_PATH`: optional log file path. If set, logs are JSONL in that file.
///   If unset, logs are emitted to stderr in a compact console format so they
///   do not interleave with display text written to stdout.
/// - `RUST_LOG`: optional filter override.
pub fn init_observability() {
    INIT.get_or_init(|| {
        if !observability_enabled(|key| std::env::var(key).ok()) {
            return;
        }

        let env_filter = resolve_env_filter();
        match std::env::var("AGENT_ROUTER_JSON_LOG_PATH") {
            Ok(path) => {
                let (dir, file_name) = json_log_location(&path);
                let _ = std::fs::create_dir_all(&dir);
                let json_layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(tracing_appender::rolling::never(dir, file_name));
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(json_layer)
                    .try_init();
            }
            Err(_) => {
                let console_layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(console_layer)
                    .try_init();
            }
        }
    });
}

/// Splits a configured log path into its directory and file name.
fn json_log_location(path: &str) -> (PathBuf, String) {
    let path = Path::new(path);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_JSON_LOG_FILE)
        .to_string();
    (dir, file_name)
}
