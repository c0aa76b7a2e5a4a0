//! Connection handle: request/reply correlation over one transport.
//!
//! A `Connection` owns the write half of the transport, the identifier
//! generator and the pending-request table. The read half is owned by the
//! dispatcher task spawned in `Connection::start`.
//!
//! # Request flow
//!
//! ```text
//! caller ── new_id() ──► build request ── send() ──► ReplySlot ── recv().await
//!                                           │                        ▲
//!                                   register + write                 │
//!                                           ▼                        │
//!                                       transport ──► dispatcher ── deliver
//! ```
//!
//! Sending and waiting are separate steps, so a caller may send many
//! requests before awaiting any reply. The core applies no deadline: a
//! request that is never answered keeps its slot open until the connection
//! is dropped. Callers that need bounded waits race `ReplySlot::recv`
//! against a timer, as the convenience operations below do.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::{error, info};
use tokio::sync::{oneshot, watch};

use crate::actor::{DispatcherHandle, PendingTable, RouteContext, spawn_dispatcher};
use crate::config::ClientSettings;
use crate::error::{ClientError, ClientResult};
use crate::notification::{NotificationCategory, NotificationRouter};
use crate::protocol::api::client_originated_message::Submessage as ClientSubmessage;
use crate::protocol::api::server_originated_message::Submessage as ServerSubmessage;
use crate::protocol::api::{
    ClientOriginatedMessage, ListSessionsRequest, ListSessionsResponse, NotificationRequest,
    NotificationResponse, ServerOriginatedMessage,
};
use crate::protocol::{self, IdGenerator, RequestId};
use crate::transport::websocket::{self, WsSink};
use crate::transport::{Frame, FrameSink, Transport};

const LOG_TARGET: &str = "iterm2_client::connection";

/// Lifecycle of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport established, dispatcher not running yet
    Connected,
    /// Dispatcher is reading frames
    Dispatching,
    /// Dispatcher stopped; no further reply or event will be delivered
    Closed,
}

/// One-shot slot receiving the reply to a sent request.
#[derive(Debug)]
pub struct ReplySlot {
    id: RequestId,
    rx: oneshot::Receiver<ServerOriginatedMessage>,
}

impl ReplySlot {
    /// Identifier of the request this slot answers.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Wait for the reply.
    ///
    /// Returns `None` if the slot was closed without a value, which happens
    /// once the connection owning it is dropped.
    pub async fn recv(self) -> Option<ServerOriginatedMessage> {
        self.rx.await.ok()
    }
}

/// Shutdown bookkeeping, guarded as a whole so concurrent `close` calls
/// wait for the one doing the work.
struct Teardown {
    dispatcher: Option<DispatcherHandle>,
    closed: bool,
}

/// Client connection to the API server.
pub struct Connection<S: FrameSink> {
    /// Write half; the mutex serializes writers.
    sink: tokio::sync::Mutex<S>,
    ids: IdGenerator,
    pending: Arc<PendingTable>,
    notifications: Arc<NotificationRouter>,
    unknown_replies: Arc<AtomicU64>,
    teardown: tokio::sync::Mutex<Teardown>,
    state: watch::Receiver<ConnectionState>,
    request_timeout: Duration,
}

impl Connection<WsSink> {
    /// Dial the API server and start dispatching.
    pub async fn connect(settings: &ClientSettings) -> ClientResult<Self> {
        let transport = websocket::connect(settings).await?;
        Self::start(transport, settings)
    }
}

impl<S: FrameSink> Connection<S> {
    /// Take ownership of an established transport and spawn its dispatcher.
    ///
    /// # Errors
    /// Returns `NoRuntime` when called outside a tokio runtime.
    pub fn start<T>(transport: T, settings: &ClientSettings) -> ClientResult<Self>
    where
        T: Transport<Sink = S>,
    {
        tokio::runtime::Handle::try_current().map_err(|_| ClientError::NoRuntime)?;

        let (sink, source) = transport.split();
        let pending = Arc::new(PendingTable::new());
        let notifications = Arc::new(NotificationRouter::new());
        let unknown_replies = Arc::new(AtomicU64::new(0));
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connected);

        let dispatcher = spawn_dispatcher(
            source,
            RouteContext {
                pending: Arc::clone(&pending),
                notifications: Arc::clone(&notifications),
                unknown_replies: Arc::clone(&unknown_replies),
            },
            settings.max_concurrent_dispatch(),
            state_tx,
        );

        Ok(Self {
            sink: tokio::sync::Mutex::new(sink),
            ids: IdGenerator::new(),
            pending,
            notifications,
            unknown_replies,
            teardown: tokio::sync::Mutex::new(Teardown {
                dispatcher: Some(dispatcher),
                closed: false,
            }),
            state: state_rx,
            request_timeout: settings.request_timeout(),
        })
    }

    /// Allocate a fresh request identifier.
    pub fn new_id(&self) -> RequestId {
        self.ids.next()
    }

    /// Router receiving every server notification of this connection.
    pub fn notifications(&self) -> &NotificationRouter {
        &self.notifications
    }

    /// Current lifecycle state, as last published by the dispatcher.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Resolve once the dispatcher has stopped.
    pub async fn closed(&self) {
        let mut state = self.state.clone();
        let _ = state
            .wait_for(|state| *state == ConnectionState::Closed)
            .await;
    }

    /// Number of requests still waiting for a reply.
    pub fn pending_count(&self) -> usize {
        self.pending.pending_count()
    }

    /// Number of replies dropped because no request was waiting for them.
    pub fn unknown_replies(&self) -> u64 {
        self.unknown_replies.load(Ordering::Relaxed)
    }

    /// Send a request and return the slot its reply will be delivered to.
    ///
    /// The request must carry an identifier obtained from [`new_id`]. The
    /// slot is registered before the frame is written, so a reply can never
    /// arrive ahead of its waiter.
    ///
    /// # Errors
    /// - `Encode` if the request has no identifier or fails to serialize
    /// - `DuplicateId` if a request with the same identifier is still pending
    /// - `Transport` if the frame could not be written; nothing stays pending
    ///
    /// [`new_id`]: Connection::new_id
    pub async fn send(&self, request: &ClientOriginatedMessage) -> ClientResult<ReplySlot> {
        let id = request
            .id
            .map(RequestId::new)
            .ok_or_else(|| ClientError::encode("request has no identifier"))?;

        let (tx, rx) = oneshot::channel();
        match self.register_and_write(id, request, tx).await {
            Ok(()) => {
                info!(target: LOG_TARGET, "Sent message ID {}", id);
                Ok(ReplySlot { id, rx })
            }
            Err(e @ ClientError::Transport { .. }) => {
                error!(
                    target: LOG_TARGET,
                    "failed to send message ID {}: {}. Removing it from possible responses",
                    id,
                    e
                );
                Err(e)
            }
            Err(e) => {
                error!(target: LOG_TARGET, "failed to send message ID {}: {}", id, e);
                Err(e)
            }
        }
    }

    async fn register_and_write(
        &self,
        id: RequestId,
        request: &ClientOriginatedMessage,
        tx: oneshot::Sender<ServerOriginatedMessage>,
    ) -> ClientResult<()> {
        // Encoding comes first so a bad request never touches the table.
        let bytes = protocol::encode(request)?;
        self.pending.register(id, tx)?;

        let mut sink = self.sink.lock().await;
        if let Err(source) = sink.write_frame(Frame::Binary(bytes)).await {
            drop(sink);
            // A concurrent reply may already have consumed the entry.
            let _ = self.pending.forget(id);
            return Err(ClientError::Transport { id, source });
        }
        Ok(())
    }

    /// Stop the dispatcher and close the transport.
    ///
    /// Requests still pending are left unresolved. Once a `close` has
    /// succeeded, later calls return immediately; a concurrent call waits
    /// for the first one to finish. If closing the transport fails, the
    /// next call tries again.
    pub async fn close(&self) -> ClientResult<()> {
        let mut teardown = self.teardown.lock().await;
        if teardown.closed {
            return Ok(());
        }

        if let Some(mut dispatcher) = teardown.dispatcher.take() {
            dispatcher.shutdown().await;
        }

        let mut sink = self.sink.lock().await;
        sink.close().await?;
        teardown.closed = true;
        info!(target: LOG_TARGET, "Connection closed");
        Ok(())
    }

    /// List windows, tabs and sessions.
    pub async fn list_sessions(&self) -> ClientResult<ListSessionsResponse> {
        let (id, reply) = self
            .call(ClientSubmessage::ListSessionsRequest(ListSessionsRequest {}))
            .await?;
        match reply.submessage {
            Some(ServerSubmessage::ListSessionsResponse(response)) => Ok(response),
            _ => Err(ClientError::UnexpectedReply {
                id,
                expected: "list_sessions_response",
            }),
        }
    }

    /// Ask the server to start or stop sending one category of notification.
    ///
    /// `session` scopes the subscription; `None` leaves the field unset.
    /// The returned response carries the server's status.
    pub async fn subscribe_notifications(
        &self,
        session: Option<&str>,
        category: NotificationCategory,
        subscribe: bool,
    ) -> ClientResult<NotificationResponse> {
        let request = NotificationRequest {
            session: session.map(str::to_string),
            subscribe: Some(subscribe),
            notification_type: Some(category.notification_type() as i32),
        };
        let (id, reply) = self
            .call(ClientSubmessage::NotificationRequest(request))
            .await?;
        match reply.submessage {
            Some(ServerSubmessage::NotificationResponse(response)) => Ok(response),
            _ => Err(ClientError::UnexpectedReply {
                id,
                expected: "notification_response",
            }),
        }
    }

    /// Send one request and wait for its reply within the configured deadline.
    async fn call(
        &self,
        submessage: ClientSubmessage,
    ) -> ClientResult<(RequestId, ServerOriginatedMessage)> {
        let id = self.new_id();
        let request = ClientOriginatedMessage {
            id: Some(id.as_i64()),
            submessage: Some(submessage),
        };
        let slot = self.send(&request).await?;

        let reply = match tokio::time::timeout(self.request_timeout, slot.recv()).await {
            Ok(Some(reply)) => reply,
            Ok(None) => return Err(ClientError::NoReply { id }),
            Err(_) => {
                // Give up on the entry; a late reply is logged as unknown.
                let _ = self.pending.forget(id);
                return Err(ClientError::Timeout {
                    id,
                    timeout_ms: self.request_timeout.as_millis() as u64,
                });
            }
        };

        if let Some(ServerSubmessage::Error(message)) = reply.submessage {
            return Err(ClientError::Server { id, message });
        }
        Ok((id, reply))
    }
}
