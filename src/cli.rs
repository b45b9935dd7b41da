//! Command-line surface of the `godot-bridge` binary.

pub mod commands;
pub mod output;

use std::time::Duration;

use clap::Parser;
use log::debug;
use serde_json::{Map, Value, json};

use crate::bridge::BridgeClient;
use crate::config::{self, Overrides};
use crate::error::{BridgeError, BridgeResult};

pub use commands::{Action, Command, RpcCall};

/// Control a running Godot editor over its WebSocket bridge
#[derive(Debug, Parser)]
#[command(name = "godot-bridge")]
#[command(version)]
#[command(about = "Control a running Godot editor over its WebSocket bridge")]
pub struct Cli {
    /// Output as JSON
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Editor WebSocket URL (overrides GODOT_WS_URL and the settings file)
    #[arg(long, global = true, value_name = "URL")]
    pub url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECS", allow_negative_numbers = true)]
    pub timeout: Option<f64>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn overrides(&self) -> BridgeResult<Overrides> {
        let request_timeout = match self.timeout {
            Some(secs) => Some(
                Duration::try_from_secs_f64(secs)
                    .ok()
                    .filter(|timeout| !timeout.is_zero())
                    .ok_or_else(|| {
                        BridgeError::usage(format!("--timeout must be a positive number, got {}", secs))
                    })?,
            ),
            None => None,
        };
        Ok(Overrides {
            url: self.url.clone(),
            request_timeout,
        })
    }
}

/// Run one command line to completion and return the process exit code.
pub async fn run(cli: Cli) -> i32 {
    match execute(&cli).await {
        Ok(data) => {
            println!("{}", output::render_success(&data, cli.json));
            0
        }
        Err(error) => {
            let (text, to_stdout) = output::render_error(&error, cli.json);
            if to_stdout {
                println!("{}", text);
            } else {
                eprintln!("{}", text);
            }
            error.exit_code()
        }
    }
}

async fn execute(cli: &Cli) -> BridgeResult<Value> {
    // Argument errors surface before any configuration or network I/O
    let action = cli.command.action()?;
    let overrides = cli.overrides()?;
    let (endpoint, settings) = config::load(&overrides)?;
    debug!(target: "godot_bridge::cli", "Using {:?}", endpoint);

    let client = BridgeClient::new(endpoint, settings);
    let outcome = match action {
        Action::Status => Ok(status_report(&client).await),
        Action::Call(call) => client.call_default(&call.method, call.params).await,
    };
    client.shutdown().await;
    outcome
}

/// Connect and describe the connection.
///
/// An unreachable or rejecting editor is reported as `connected: false`
/// rather than as an error.
pub async fn status_report(client: &BridgeClient) -> Value {
    let mut report = Map::new();
    match client.connect().await {
        Ok(()) => {
            let status = client.status();
            report.insert("connected".into(), json!(true));
            report.insert("authenticated".into(), json!(status.authenticated));
            report.insert("ws_url".into(), json!(status.url));
            if let Some(version) = status.editor_version {
                report.insert("editor_version".into(), json!(version));
            }
            if let Ok(info) = client.call_default("project.get_info", json!({})).await {
                let name = info.get("name").cloned().unwrap_or_else(|| json!("unknown"));
                report.insert("project".into(), name);
            }
        }
        Err(error) => {
            report.insert("connected".into(), json!(false));
            report.insert("ws_url".into(), json!(client.endpoint().url()));
            report.insert(
                "error".into(),
                json!({"kind": error.kind(), "message": error.to_string()}),
            );
        }
    }
    Value::Object(report)
}
