//! Binary codec between envelope messages and frame payloads.
//!
//! Outbound requests are serialized with prost. Inbound payloads are
//! deserialized and classified into a reply (correlated by `id`) or an
//! event (a `notification` submessage, which takes precedence over `id`).

use prost::Message;
use thiserror::Error;

use super::RequestId;
use super::api::server_originated_message::Submessage;
use super::api::{ClientOriginatedMessage, Notification, ServerOriginatedMessage};
use crate::error::ClientError;

/// Failure to turn a message into bytes or back.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Encode(#[from] prost::EncodeError),

    #[error(transparent)]
    Decode(#[from] prost::DecodeError),

    /// Outbound request or inbound reply without an `id` field
    #[error("message has no identifier")]
    MissingIdentifier,
}

/// Decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Reply to a previously sent request.
    Reply {
        id: RequestId,
        message: ServerOriginatedMessage,
    },
    /// Unsolicited server event.
    Event(Notification),
}

impl InboundMessage {
    /// Identifier of a reply, `None` for events.
    pub fn id(&self) -> Option<RequestId> {
        match self {
            InboundMessage::Reply { id, .. } => Some(*id),
            InboundMessage::Event(_) => None,
        }
    }

    pub fn is_event(&self) -> bool {
        matches!(self, InboundMessage::Event(_))
    }

    pub fn is_reply(&self) -> bool {
        matches!(self, InboundMessage::Reply { .. })
    }
}

/// Serialize an outbound request.
///
/// Requests must already carry an identifier from the connection's
/// `IdGenerator`; a request without one could never be answered.
pub fn encode(message: &ClientOriginatedMessage) -> Result<Vec<u8>, CodecError> {
    if message.id.is_none() {
        return Err(CodecError::MissingIdentifier);
    }
    let mut buf = Vec::with_capacity(message.encoded_len());
    message.encode(&mut buf)?;
    Ok(buf)
}

/// Deserialize and classify an inbound frame payload.
pub fn decode(bytes: &[u8]) -> Result<InboundMessage, CodecError> {
    let message = ServerOriginatedMessage::decode(bytes)?;
    match message.submessage {
        Some(Submessage::Notification(notification)) => Ok(InboundMessage::Event(notification)),
        submessage => {
            let id = message.id.ok_or(CodecError::MissingIdentifier)?;
            Ok(InboundMessage::Reply {
                id: RequestId::new(id),
                message: ServerOriginatedMessage {
                    id: Some(id),
                    submessage,
                },
            })
        }
    }
}

impl From<CodecError> for ClientError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Encode(_) => ClientError::encode(err.to_string()),
            CodecError::Decode(_) => ClientError::decode(err.to_string()),
            CodecError::MissingIdentifier => ClientError::encode(err.to_string()),
        }
    }
}
