pub mod bridge;
pub mod cli;
pub mod config;
pub mod error;

pub use bridge::{BridgeClient, NotificationObserver, SessionStatus};
pub use config::{BridgeSettings, DecodeErrorPolicy, Endpoint, ReconnectPolicy};
pub use error::{BridgeError, BridgeResult};
