//! Host binary: loads configuration, wires up `Core`, and exposes the tool
//! façade over a minimal stdin/stdout JSON harness for manual smoke-testing.
//!
//! Each line of stdin is a JSON request tagged by `op`; the matching
//! `Core` operation runs and its result is written back as a JSON line
//! on stdout. This is a thin stand-in for a real tool-invocation
//! transport, which is out of scope here.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use localindex_core::{Core, ExitCode, load_config};

/// One line of stdin input dispatched to a façade operation.
#[derive(Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request {
    Search {
        query: String,
        #[serde(default = "default_limit")]
        limit: u32,
    },
    GetIndexStats,
    RefreshIndex {
        #[serde(default)]
        filepath: Option<String>,
        #[serde(default)]
        force: bool,
    },
}

const fn default_limit() -> u32 {
    10
}

#[derive(Serialize)]
struct Response {
    result: String,
}

fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let config_path =
        std::env::args().nth(1).map_or_else(|| PathBuf::from("config.json"), PathBuf::from);

    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return ExitCode::DataErr.into();
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "failed to start async runtime");
            return ExitCode::Software.into();
        }
    };

    runtime.block_on(async_main(config))
}

async fn async_main(config: localindex_core::ServerConfig) -> std::process::ExitCode {
    let core = match Core::initialize(config, true).await {
        Ok(core) => core,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize core");
            return ExitCode::Software.into();
        }
    };

    tracing::info!("server initialized, reading requests from stdin");

    let stdin = io::stdin();
    let stdout = io::stdout();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let result = match serde_json::from_str::<Request>(&line) {
            Ok(Request::Search { query, limit }) => core.search(&query, limit).await,
            Ok(Request::GetIndexStats) => core.get_index_stats().await,
            Ok(Request::RefreshIndex { filepath, force }) => {
                core.refresh_index(filepath.as_deref(), force).await
            }
            Err(e) => format!("Error: invalid request: {e}"),
        };

        let response = Response { result };
        if let Ok(json) = serde_json::to_string(&response) {
            let mut out = stdout.lock();
            let _ = writeln!(out, "{json}");
        }
    }

    core.shutdown().await;
    ExitCode::Ok.into()
}
