//! WebSocket transport for the iTerm2 API endpoint.
//!
//! Dials the configured URL with the subprotocol and identification headers
//! the server expects, then exposes the stream as a frame sink/source pair.
//! Version and credential negotiation are out of scope: the two refusals
//! the server signals over HTTP are mapped to typed errors and nothing more.

use std::io;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use log::{debug, info};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::{Frame, FrameSink, FrameSource, Transport};
use crate::config::ClientSettings;
use crate::error::{ClientError, ClientResult};

const LOG_TARGET: &str = "iterm2_client::websocket";

/// Response header carrying the server's protocol version.
const PROTOCOL_VERSION_HEADER: &str = "x-iterm2-protocol-version";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// An established WebSocket connection to the API server.
pub struct WsTransport {
    stream: WsStream,
}

/// Write half of [`WsTransport`].
pub struct WsSink {
    inner: SplitSink<WsStream, Message>,
}

/// Read half of [`WsTransport`].
pub struct WsSource {
    inner: SplitStream<WsStream>,
}

/// Dial the API server described by `settings`.
///
/// # Errors
/// - `ProtocolTooOld` if the server answers 406
/// - `AccessDenied` if the server answers 401
/// - `Config` if the URL or a header value is invalid
/// - `Connect` for any other dial failure
pub async fn connect(settings: &ClientSettings) -> ClientResult<WsTransport> {
    let request = build_request(settings)?;
    let url = request.uri().to_string();

    match tokio_tungstenite::connect_async(request).await {
        Ok((stream, response)) => {
            let version = response
                .headers()
                .get(PROTOCOL_VERSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            info!(target: LOG_TARGET, "Server version: {}", version);
            Ok(WsTransport { stream })
        }
        Err(tungstenite::Error::Http(response)) => {
            let status = response.status();
            Err(refusal_for_status(status).unwrap_or_else(|| {
                ClientError::connect(format!("error dialing iterm API on {}: HTTP {}", url, status))
            }))
        }
        Err(e) => Err(ClientError::Connect {
            details: format!("error dialing iterm API on {}", url),
            source: Some(Box::new(e)),
        }),
    }
}

/// Build the handshake request with every header the server expects.
pub(crate) fn build_request(settings: &ClientSettings) -> ClientResult<Request> {
    let url = settings.url()?;
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| ClientError::config(format!("invalid url {}: {}", url, e)))?;

    let headers = request.headers_mut();
    headers.insert(
        "Sec-WebSocket-Protocol",
        header_value("subprotocol", settings.subprotocol())?,
    );
    headers.insert(
        "x-iterm2-library-version",
        header_value("library version", &settings.library_version())?,
    );
    headers.insert("Origin", header_value("origin", settings.origin())?);
    if let Some(cookie) = &settings.cookie {
        headers.insert("x-iterm2-cookie", header_value("cookie", cookie)?);
    }
    if let Some(key) = &settings.key {
        headers.insert("x-iterm2-key", header_value("key", key)?);
    }

    Ok(request)
}

fn header_value(name: &str, value: &str) -> ClientResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| ClientError::config(format!("{} is not a valid header value", name)))
}

/// Typed error for the HTTP refusals the server documents.
fn refusal_for_status(status: StatusCode) -> Option<ClientError> {
    match status {
        StatusCode::NOT_ACCEPTABLE => Some(ClientError::ProtocolTooOld),
        StatusCode::UNAUTHORIZED => Some(ClientError::AccessDenied),
        _ => None,
    }
}

impl Transport for WsTransport {
    type Sink = WsSink;
    type Source = WsSource;

    fn split(self) -> (WsSink, WsSource) {
        let (sink, stream) = self.stream.split();
        (WsSink { inner: sink }, WsSource { inner: stream })
    }
}

impl FrameSink for WsSink {
    async fn write_frame(&mut self, frame: Frame) -> io::Result<()> {
        let message = match frame {
            Frame::Binary(bytes) => Message::Binary(bytes.into()),
            Frame::Text(text) => Message::Text(text.into()),
            Frame::Ping(bytes) => Message::Ping(bytes.into()),
            Frame::Pong(bytes) => Message::Pong(bytes.into()),
            Frame::Close => Message::Close(None),
        };
        self.inner.send(message).await.map_err(io::Error::other)
    }

    async fn close(&mut self) -> io::Result<()> {
        self.inner.close().await.map_err(io::Error::other)
    }
}

impl FrameSource for WsSource {
    async fn read_frame(&mut self) -> Option<io::Result<Frame>> {
        loop {
            let frame = match self.inner.next().await? {
                Ok(Message::Binary(bytes)) => Frame::Binary(bytes.to_vec()),
                Ok(Message::Text(text)) => Frame::Text(text.as_str().to_owned()),
                Ok(Message::Ping(bytes)) => Frame::Ping(bytes.to_vec()),
                Ok(Message::Pong(bytes)) => Frame::Pong(bytes.to_vec()),
                Ok(Message::Close(_)) => Frame::Close,
                Ok(Message::Frame(_)) => {
                    debug!(target: LOG_TARGET, "Skipping raw frame");
                    continue;
                }
                Err(tungstenite::Error::ConnectionClosed) => return None,
                Err(e) => return Some(Err(io::Error::other(e))),
            };
            return Some(Ok(frame));
        }
    }
}
