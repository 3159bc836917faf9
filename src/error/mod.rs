//! Error types for registry and manifest list operations
//!
//! Every layer returns these unchanged to its caller. Nothing below `main`
//! retries, suppresses or rewrites an error.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// Malformed image reference
    #[error("Parse error: {0}")]
    Parse(String),

    /// A source image lives on a different registry than the target
    #[error(
        "cannot use source images from a different registry than the target image: {source_host} != {target_host}"
    )]
    CrossRegistry {
        source_host: String,
        target_host: String,
    },

    /// A manifest list was supplied where a single-platform manifest is required
    #[error("manifest lists do not allow recursion: {0}")]
    Recursion(String),

    /// Token exchange with the registry's auth realm failed
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Non-2xx response, connection failure or timeout
    #[error("{}", transport_message(.status, .message))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// Unrecognized or malformed manifest content
    #[error("Decode error: {0}")]
    Decode(String),

    /// Registry echoed a digest that differs from the locally computed one
    #[error("digest mismatch: expected {expected}, registry returned {actual}")]
    DigestMismatch { expected: String, actual: String },

    /// Credential file problems
    #[error("Configuration error: {0}")]
    Config(String),
}

fn transport_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("Transport error: status code {code}, body {message}"),
        None => format!("Transport error: {message}"),
    }
}

impl RegistryError {
    pub fn transport(message: impl Into<String>) -> Self {
        RegistryError::Transport {
            status: None,
            message: message.into(),
        }
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        RegistryError::Transport {
            status: Some(status),
            message: body.into(),
        }
    }

    /// HTTP status carried by a transport error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RegistryError::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for RegistryError {
    fn from(err: url::ParseError) -> Self {
        RegistryError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        RegistryError::Config(err.to_string())
    }
}
