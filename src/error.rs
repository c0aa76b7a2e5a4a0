//! Error handling types for iterm2-client
//!
//! This module provides the error taxonomy shared by the connection core,
//! the transport adapters and the configuration layer.

use std::sync::PoisonError;
use thiserror::Error;

use crate::protocol::RequestId;

/// Comprehensive error type for client operations
#[derive(Debug, Error)]
pub enum ClientError {
    /// A request reused an identifier that is still pending
    #[error("duplicated in-flight message. message ID: {id}")]
    DuplicateId { id: RequestId },

    /// A reply or a cleanup referenced an identifier with no pending entry
    #[error("unknown response channel. message ID: {id}")]
    UnknownId { id: RequestId },

    /// Outbound message could not be serialized
    #[error("failed to encode request: {message}")]
    Encode { message: String },

    /// Inbound frame could not be deserialized
    #[error("failed to decode message: {message}")]
    Decode { message: String },

    /// Writing a frame to the transport failed
    #[error("transport write failed for message ID {id}: {source}")]
    Transport {
        id: RequestId,
        #[source]
        source: std::io::Error,
    },

    /// Dialing the API endpoint failed
    #[error("error connecting to the iterm2 API: {details}")]
    Connect {
        details: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The server refused the credentials (HTTP 401)
    #[error(
        "error connecting to the iterm2 API: Access has been denied. You need to accept it in the iterm pop-up."
    )]
    AccessDenied,

    /// The server rejected the library version (HTTP 406)
    #[error(
        "error connecting to the iterm2 API: This version of the client is too old for the current version of iTerm2. Please upgrade."
    )]
    ProtocolTooOld,

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// `Connection::start` was called outside a tokio runtime
    #[error("no tokio runtime available to run the dispatch loop")]
    NoRuntime,

    /// The server answered with an `error` submessage
    #[error("server returned an error for message ID {id}: {message}")]
    Server { id: RequestId, message: String },

    /// The reply slot was closed without a value
    #[error("no reply received for message ID {id}")]
    NoReply { id: RequestId },

    /// No reply arrived within the configured deadline
    #[error("timed out after {timeout_ms}ms waiting for message ID {id}")]
    Timeout { id: RequestId, timeout_ms: u64 },

    /// The reply carried a different submessage than the request expects
    #[error("unexpected reply for message ID {id}: expected {expected}")]
    UnexpectedReply { id: RequestId, expected: &'static str },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Helper trait to recover from poisoned std locks
pub trait LockResultExt<T> {
    /// Recover the guard from a poisoned lock, logging which operation hit it.
    fn recover_poison(self, context: &str) -> T;
}

impl<T> LockResultExt<T> for Result<T, PoisonError<T>> {
    fn recover_poison(self, context: &str) -> T {
        match self {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!(
                    target: "iterm2_client::lock_recovery",
                    "Recovered from poisoned lock in {}",
                    context
                );
                poisoned.into_inner()
            }
        }
    }
}

/// Helper functions for common error patterns
impl ClientError {
    /// Create an encode error
    pub fn encode(message: impl Into<String>) -> Self {
        ClientError::Encode {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        ClientError::Decode {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        ClientError::Config {
            message: message.into(),
        }
    }

    /// Create a connect error without an underlying cause
    pub fn connect(details: impl Into<String>) -> Self {
        ClientError::Connect {
            details: details.into(),
            source: None,
        }
    }
}
