//! In-process transport backed by tokio channels.
//!
//! `pair()` returns the client side, which plugs into `Connection::start`,
//! and a `ServerEnd` that plays the remote application: it sees every frame
//! the client writes and can push frames, read errors, or EOF back.

use std::io;

use prost::Message;
use tokio::sync::mpsc;

use super::{Frame, FrameSink, FrameSource, Transport};
use crate::protocol::api::{ClientOriginatedMessage, ServerOriginatedMessage};

/// Client side of an in-memory connection.
pub struct MemoryTransport {
    sink: MemorySink,
    source: MemorySource,
}

/// Write half of [`MemoryTransport`].
pub struct MemorySink {
    tx: Option<mpsc::UnboundedSender<Frame>>,
}

/// Read half of [`MemoryTransport`].
pub struct MemorySource {
    rx: mpsc::UnboundedReceiver<io::Result<Frame>>,
}

/// Remote side of an in-memory connection.
pub struct ServerEnd {
    from_client: mpsc::UnboundedReceiver<Frame>,
    to_client: Option<mpsc::UnboundedSender<io::Result<Frame>>>,
}

/// Create a connected client/server pair.
pub fn pair() -> (MemoryTransport, ServerEnd) {
    let (client_tx, from_client) = mpsc::unbounded_channel();
    let (to_client, client_rx) = mpsc::unbounded_channel();

    let transport = MemoryTransport {
        sink: MemorySink {
            tx: Some(client_tx),
        },
        source: MemorySource { rx: client_rx },
    };
    let server = ServerEnd {
        from_client,
        to_client: Some(to_client),
    };
    (transport, server)
}

impl Transport for MemoryTransport {
    type Sink = MemorySink;
    type Source = MemorySource;

    fn split(self) -> (MemorySink, MemorySource) {
        (self.sink, self.source)
    }
}

impl FrameSink for MemorySink {
    async fn write_frame(&mut self, frame: Frame) -> io::Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "sink closed"))?;
        tx.send(frame)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer stopped reading"))
    }

    async fn close(&mut self) -> io::Result<()> {
        if let Some(tx) = self.tx.take() {
            // Peer may already be gone; closing is best-effort.
            let _ = tx.send(Frame::Close);
        }
        Ok(())
    }
}

impl FrameSource for MemorySource {
    async fn read_frame(&mut self) -> Option<io::Result<Frame>> {
        self.rx.recv().await
    }
}

impl ServerEnd {
    /// Next frame written by the client, `None` once the client sink is gone.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.from_client.recv().await
    }

    /// Next binary frame from the client decoded as a request.
    ///
    /// Non-binary frames are skipped. Returns `None` when the client is gone
    /// or the payload does not decode.
    pub async fn recv_request(&mut self) -> Option<ClientOriginatedMessage> {
        loop {
            match self.recv().await? {
                Frame::Binary(bytes) => {
                    return ClientOriginatedMessage::decode(bytes.as_slice()).ok();
                }
                Frame::Close => return None,
                _ => continue,
            }
        }
    }

    /// Push a raw frame to the client. Returns `false` if the client is gone.
    pub fn send(&self, frame: Frame) -> bool {
        self.to_client
            .as_ref()
            .is_some_and(|tx| tx.send(Ok(frame)).is_ok())
    }

    /// Push an encoded server message to the client.
    pub fn send_message(&self, message: &ServerOriginatedMessage) -> bool {
        self.send(Frame::Binary(message.encode_to_vec()))
    }

    /// Make the client's next read fail with `error`.
    pub fn send_error(&self, error: io::Error) -> bool {
        self.to_client
            .as_ref()
            .is_some_and(|tx| tx.send(Err(error)).is_ok())
    }

    /// Close the server-to-client direction; the client reads EOF once the
    /// queued frames are consumed.
    pub fn close(&mut self) {
        self.to_client = None;
    }

    /// Stop accepting client writes; every later write fails.
    pub fn reject_writes(&mut self) {
        self.from_client.close();
    }
}
