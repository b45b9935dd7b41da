//! `auth.hello` handshake on a freshly opened link.

use std::time::Duration;

use log::debug;

use super::link::Link;
use super::state::ConnectionState;
use crate::bridge::correlator::deadline_after;
use crate::bridge::protocol::{
    AUTH_METHOD, HelloAccepted, Request, build_hello_params, validate_hello_result,
};
use crate::error::BridgeError;

/// Authenticate a link with the editor.
///
/// Sends `auth.hello` through the link's Correlator like any other call and
/// waits at most `timeout`. Rejections (error envelope, or a result without
/// `ok: true`) become `Auth`; transport loss and timeouts keep their kind.
pub(crate) async fn authenticate(
    link: &Link,
    token: &str,
    timeout: Duration,
) -> Result<HelloAccepted, BridgeError> {
    if !link
        .status()
        .transition(ConnectionState::Connecting, ConnectionState::Authenticating)
    {
        return Err(BridgeError::connection_lost(format!(
            "connection became {} before authentication",
            link.state().as_str()
        )));
    }

    let deadline = deadline_after(timeout);
    let entry = link.correlator().register(AUTH_METHOD, deadline)?;
    let id = entry.id();
    let request = Request::new(id, AUTH_METHOD, build_hello_params(token), deadline);

    debug!(
        target: "godot_bridge::bridge::handshake",
        "Sending {} on link {}",
        AUTH_METHOD,
        link.generation()
    );

    // Dropping `entry` on any early return removes it from the correlator
    link.send(&request).await?;

    let outcome = match tokio::time::timeout_at(deadline, entry.wait()).await {
        Ok(outcome) => outcome,
        Err(_) => {
            return Err(BridgeError::Timeout {
                method: AUTH_METHOD.to_string(),
                elapsed: timeout,
            });
        }
    };

    match outcome {
        Ok(result) => {
            validate_hello_result(&result).map_err(|message| BridgeError::Auth {
                code: None,
                message,
            })
        }
        Err(BridgeError::Remote { code, message, .. }) => Err(BridgeError::Auth {
            code: Some(code),
            message,
        }),
        Err(other) => Err(other),
    }
}
