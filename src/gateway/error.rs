use crate::constants::{MSG_GENERIC_FAILURE, MSG_NETWORK_FAILURE};

/// Failure of a gateway call. Every gateway operation resolves to one of
/// these instead of panicking.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// The request never completed (connect, timeout, HTTP-level failure)
    #[error("transport error: {0}")]
    Transport(String),
    /// A reply arrived but did not have the expected shape
    #[error("malformed response: {0}")]
    Malformed(String),
    /// Exchanging the service credentials for a session token failed
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// The backend answered with an explicit error payload
    #[error("{message}")]
    Application {
        message: String,
        name: Option<String>,
    },
}

impl GatewayError {
    /// Text to show the user for this failure
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Application { message, .. } | GatewayError::Authentication(message) => {
                if message.trim().is_empty() {
                    MSG_GENERIC_FAILURE.to_string()
                } else {
                    message.clone()
                }
            }
            GatewayError::Transport(_) | GatewayError::Malformed(_) => {
                MSG_NETWORK_FAILURE.to_string()
            }
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Transport(_) | GatewayError::Malformed(_))
    }
}
