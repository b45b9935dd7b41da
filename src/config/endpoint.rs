use std::fmt;

/// URL used when neither the environment nor the settings file names one.
pub const DEFAULT_WS_URL: &str = "ws://127.0.0.1:49631";

/// Where the editor listens and the token it expects.
///
/// Immutable for the lifetime of the process. The token is deliberately kept
/// out of `Debug` output so endpoints can be logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: String,
    token: String,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.token.is_empty() {
            "<empty>"
        } else {
            "<redacted>"
        };
        f.debug_struct("Endpoint")
            .field("url", &self.url)
            .field("token", &token)
            .finish()
    }
}
