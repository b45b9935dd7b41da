// CLI integration tests for godot-bridge
// Runs the built binary with an isolated environment

mod helpers;

use std::process::{Command, Output};

use helpers::TEST_TOKEN;
use helpers::mock_editor::{MockEditor, Reply, error_for, method_of, result_for};
use serde_json::{Value, json};

/// Command for the binary with no ambient configuration leaking in.
fn godot_bridge(config_home: &std::path::Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_godot-bridge"));
    command
        .env("XDG_CONFIG_HOME", config_home)
        .env_remove("GODOT_WS_URL")
        .env_remove("GODOT_TOKEN")
        .env_remove("GODOT_TOKEN_FILE")
        .env_remove("RUST_LOG");
    command
}

fn unused_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}", addr)
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({}): {}",
            e,
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

/// Run the binary off the async runtime so the mock editor keeps serving.
async fn run_async(mut command: Command) -> Output {
    tokio::task::spawn_blocking(move || command.output().expect("Failed to execute command"))
        .await
        .unwrap()
}

/// Test that --help flag shows help message with program description
#[test]
fn test_help_flag_shows_help_message() {
    let home = tempfile::tempdir().unwrap();
    let output = godot_bridge(home.path())
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Help should exit with success");
    assert!(
        stdout.contains("godot-bridge"),
        "Help should contain program name. Got: {}",
        stdout
    );
    for subcommand in ["scene", "node", "rpc", "status"] {
        assert!(
            stdout.contains(subcommand),
            "Help should list {}. Got: {}",
            subcommand,
            stdout
        );
    }
}

#[test]
fn test_invalid_json_argument_exits_with_usage_code() {
    let home = tempfile::tempdir().unwrap();
    let output = godot_bridge(home.path())
        .args(["node", "set", "/root/Main", "{not json"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid JSON"), "Got: {}", stderr);
}

#[test]
fn test_invalid_json_argument_in_json_mode() {
    let home = tempfile::tempdir().unwrap();
    let output = godot_bridge(home.path())
        .args(["--json", "rpc", "scene.get_tree", "[oops"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2));
    let document = stdout_json(&output);
    assert_eq!(document["ok"], false);
    assert_eq!(document["error"]["kind"], "usage");
}

#[test]
fn test_unreachable_editor_exits_with_connect_code() {
    let home = tempfile::tempdir().unwrap();
    let output = godot_bridge(home.path())
        .args(["--url", &unused_url(), "project", "info"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: Cannot connect"), "Got: {}", stderr);
}

#[test]
fn test_status_with_editor_down_still_succeeds() {
    let home = tempfile::tempdir().unwrap();
    let url = unused_url();
    let output = godot_bridge(home.path())
        .args(["status", "--json", "--url", &url])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let document = stdout_json(&output);
    assert_eq!(document["ok"], true);
    assert_eq!(document["data"]["connected"], false);
    assert_eq!(document["data"]["ws_url"], json!(url));
}

#[test]
fn test_malformed_settings_file_is_a_config_error() {
    let home = tempfile::tempdir().unwrap();
    let dir = home.path().join("godot-bridge");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("godot-bridge.toml"), "request_timeout_ms = [").unwrap();

    let output = godot_bridge(home.path())
        .args(["status"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid configuration"), "Got: {}", stderr);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_call_prints_result_as_json_document() {
    let editor = MockEditor::accepting(|request| match method_of(request) {
        "project.get_info" => vec![Reply::Frame(result_for(
            request,
            json!({"name": "Demo", "main_scene": "res://main.tscn"}),
        ))],
        _ => vec![Reply::Frame(error_for(request, json!(-32601), "Method not found"))],
    })
    .await;
    let home = tempfile::tempdir().unwrap();

    let mut command = godot_bridge(home.path());
    command
        .env("GODOT_WS_URL", editor.url())
        .env("GODOT_TOKEN", TEST_TOKEN)
        .args(["project", "info", "-j"]);
    let output = run_async(command).await;

    assert!(output.status.success(), "{:?}", output);
    assert_eq!(
        stdout_json(&output),
        json!({"ok": true, "data": {"name": "Demo", "main_scene": "res://main.tscn"}})
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_remote_error_exits_with_remote_code() {
    let editor = MockEditor::accepting(|request| {
        vec![Reply::Frame(error_for(request, json!(-32601), "Method not found"))]
    })
    .await;
    let home = tempfile::tempdir().unwrap();

    let mut command = godot_bridge(home.path());
    command
        .env("GODOT_WS_URL", editor.url())
        .env("GODOT_TOKEN", TEST_TOKEN)
        .args(["--json", "rpc", "scene.bogus"]);
    let output = run_async(command).await;

    assert_eq!(output.status.code(), Some(7));
    let document = stdout_json(&output);
    assert_eq!(document["error"]["type"], "rpc_error");
    assert_eq!(document["error"]["code"], -32601);
    assert_eq!(document["error"]["message"], "Method not found");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_token_file_supplies_token_and_port() {
    let editor = MockEditor::accepting(|request| {
        vec![Reply::Frame(result_for(request, json!({"name": "FromTokenFile"})))]
    })
    .await;
    let port = editor.url().rsplit(':').next().unwrap().to_string();
    let home = tempfile::tempdir().unwrap();
    let token_file = home.path().join("bridge.json");
    std::fs::write(
        &token_file,
        json!({"token": TEST_TOKEN, "port": port.parse::<u16>().unwrap()}).to_string(),
    )
    .unwrap();

    let mut command = godot_bridge(home.path());
    command
        .env("GODOT_TOKEN_FILE", &token_file)
        .args(["status", "--json"]);
    let output = run_async(command).await;

    assert!(output.status.success(), "{:?}", output);
    let data = &stdout_json(&output)["data"];
    assert_eq!(data["connected"], true);
    assert_eq!(data["authenticated"], true);
    assert_eq!(data["project"], "FromTokenFile");
    assert_eq!(data["editor_version"], "4.3.stable");
}
