//! Frame transport used by the connection core.
//!
//! A transport is split once into a sink, shared by all senders behind the
//! connection's write mutex, and a source owned by the single dispatcher.
//!
//! ## Module Structure
//!
//! - `websocket` - tokio-tungstenite transport for the iTerm2 API endpoint
//! - `memory` - in-process channel transport for tests and embedding

pub mod memory;
pub mod websocket;

use std::future::Future;
use std::io;

/// One discrete message unit delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Binary(Vec<u8>),
    Text(String),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

impl Frame {
    /// Short name of the frame type, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Binary(_) => "binary",
            Frame::Text(_) => "text",
            Frame::Ping(_) => "ping",
            Frame::Pong(_) => "pong",
            Frame::Close => "close",
        }
    }
}

/// Write half of a transport.
///
/// Not required to support concurrent writers; the connection serializes
/// every write.
pub trait FrameSink: Send + 'static {
    /// Write one frame.
    fn write_frame(&mut self, frame: Frame) -> impl Future<Output = io::Result<()>> + Send;

    /// Close the write half, telling the peer we are going away.
    fn close(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}

/// Read half of a transport.
pub trait FrameSource: Send + 'static {
    /// Wait for the next frame.
    ///
    /// Returns `None` once the peer closed the connection. An `Err` is
    /// terminal as well; callers stop reading after either.
    fn read_frame(&mut self) -> impl Future<Output = Option<io::Result<Frame>>> + Send;
}

/// An established, already-authenticated full-duplex connection.
pub trait Transport: Send + 'static {
    type Sink: FrameSink;
    type Source: FrameSource;

    fn split(self) -> (Self::Sink, Self::Source);
}
