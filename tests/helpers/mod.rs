//! Shared test helpers for integration tests.
//!
//! Note: We use `helpers/mod.rs` instead of the modern `helpers.rs` + `helpers/` pattern
//! because Cargo auto-discovers top-level `.rs` files in `tests/` as integration tests.
//! A `tests/helpers.rs` file would be compiled as a standalone test, which we don't want.

#![allow(dead_code)]

pub mod mock_editor;

use std::time::Duration;

use godot_bridge::{BridgeSettings, Endpoint};

pub const TEST_TOKEN: &str = "test-token";

/// Settings with short bounds so failing tests fail fast.
pub fn test_settings() -> BridgeSettings {
    BridgeSettings {
        request_timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(2),
        handshake_timeout: Duration::from_secs(2),
        shutdown_timeout: Duration::from_secs(1),
        ..BridgeSettings::default()
    }
}

pub fn endpoint(url: &str) -> Endpoint {
    Endpoint::new(url, TEST_TOKEN)
}

/// A ws:// URL on which nothing listens.
pub async fn unused_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}", addr)
}
