//! Error types for the Moodstocks API client.
//!
//! # Design
//! Callers must be able to tell "the service rejected the operation" apart
//! from "the request could not be built or sent". `Api` is the only variant
//! produced from a service response and keeps the status and raw body
//! verbatim; every other variant originates on this side of the wire.

use std::path::PathBuf;

/// Errors returned by the client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The service answered with a status other than 200.
    #[error("{status} - {body}")]
    Api { status: u16, body: String },

    /// A local image file could not be read. No request was sent.
    #[error("failed to read image file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A 200 response whose body is not a JSON object.
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The digest challenge sent by the service could not be answered.
    #[error("digest authentication failed: {0}")]
    Auth(String),

    /// The request never produced a response (connection, TLS, DNS...).
    #[error("transport error: {0}")]
    Transport(String),

    /// Client configuration is missing or invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// Status code of a service error, `None` for local failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
