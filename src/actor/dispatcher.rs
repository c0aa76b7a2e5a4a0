//! Dispatch loop: the single reader of a connection.
//!
//! The dispatcher task:
//! - Runs in a spawned tokio task for the lifetime of the connection
//! - Reads frames one at a time from the transport's `FrameSource`
//! - Spawns the routing of each frame as its own task, bounded by a semaphore
//! - Routes replies to the PendingTable and events to the NotificationRouter
//! - Stops on EOF, read error, or cancellation, leaving pending requests as-is

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, error, info, warn};
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{Delivery, PendingTable};
use crate::connection::ConnectionState;
use crate::notification::NotificationRouter;
use crate::protocol::{self, InboundMessage};
use crate::transport::{Frame, FrameSource};

const LOG_TARGET: &str = "iterm2_client::dispatcher";

/// Outcome of routing one frame. Used for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RouteResult {
    /// Reply handed to its waiter
    Delivered,
    /// Reply for an identifier with no pending entry
    UnknownReply,
    /// Reply whose caller dropped its slot before it arrived
    WaiterGone,
    /// Event handed to the notification router
    Event,
    /// Frame that is not a binary message
    NotBinary,
    /// Binary frame that failed to decode
    Undecodable,
}

/// Shared state every routing task needs.
#[derive(Clone)]
pub(crate) struct RouteContext {
    pub(crate) pending: Arc<PendingTable>,
    pub(crate) notifications: Arc<NotificationRouter>,
    /// Replies dropped because nobody was waiting for them.
    pub(crate) unknown_replies: Arc<AtomicU64>,
}

/// Handle to a running dispatcher.
///
/// Dropping the handle cancels the loop.
pub(crate) struct DispatcherHandle {
    join_handle: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl DispatcherHandle {
    /// Ask the loop to stop and wait for it to exit.
    pub(crate) async fn shutdown(&mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.join_handle.take() {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    error!(target: LOG_TARGET, "Dispatcher task panicked");
                }
            }
        }
    }
}

impl Drop for DispatcherHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// Spawn the dispatch loop on the current tokio runtime.
///
/// `max_concurrent` bounds the number of frames being routed at once; when
/// every permit is taken the loop stops reading until one is released.
pub(crate) fn spawn_dispatcher<R: FrameSource>(
    source: R,
    context: RouteContext,
    max_concurrent: usize,
    state: watch::Sender<ConnectionState>,
) -> DispatcherHandle {
    let cancel_token = CancellationToken::new();
    let permits = Arc::new(Semaphore::new(max_concurrent.max(1)));

    state.send_replace(ConnectionState::Dispatching);
    let join_handle = tokio::spawn(dispatch_loop(
        source,
        context,
        permits,
        cancel_token.clone(),
        state,
    ));

    DispatcherHandle {
        join_handle: Some(join_handle),
        cancel_token,
    }
}

/// The main dispatch loop - reads frames and spawns their routing.
async fn dispatch_loop<R: FrameSource>(
    mut source: R,
    context: RouteContext,
    permits: Arc<Semaphore>,
    cancel_token: CancellationToken,
    state: watch::Sender<ConnectionState>,
) {
    debug!(target: LOG_TARGET, "starting receive message loop");

    loop {
        let frame = tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                debug!(target: LOG_TARGET, "Dispatcher cancelled, shutting down");
                break;
            }

            result = source.read_frame() => match result {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    error!(
                        target: LOG_TARGET,
                        "failed to read message from transport: {}",
                        e
                    );
                    break;
                }
                None => {
                    info!(target: LOG_TARGET, "transport closed, stopping receive loop");
                    break;
                }
            },
        };

        // Back-pressure: wait for a routing slot before reading further.
        let permit = tokio::select! {
            biased;

            _ = cancel_token.cancelled() => break,
            permit = Arc::clone(&permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let context = context.clone();
        tokio::spawn(async move {
            route_frame(frame, &context);
            drop(permit);
        });
    }

    state.send_replace(ConnectionState::Closed);
}

/// Route a single frame read from the transport.
pub(crate) fn route_frame(frame: Frame, context: &RouteContext) -> RouteResult {
    let bytes = match frame {
        Frame::Binary(bytes) => bytes,
        other => {
            warn!(
                target: LOG_TARGET,
                "received unexpected message type {}, ignoring it",
                other.kind()
            );
            return RouteResult::NotBinary;
        }
    };

    let message = match protocol::decode(&bytes) {
        Ok(message) => message,
        Err(e) => {
            error!(
                target: LOG_TARGET,
                "failed to de-serialize message: {}, ignoring it",
                e
            );
            return RouteResult::Undecodable;
        }
    };

    match message {
        InboundMessage::Event(notification) => {
            context.notifications.dispatch(notification);
            RouteResult::Event
        }
        InboundMessage::Reply { id, message } => {
            match context.pending.deliver(id, message) {
                Delivery::Delivered => {
                    info!(target: LOG_TARGET, "done processing message ID {}", id);
                    RouteResult::Delivered
                }
                Delivery::Unknown => {
                    // Already logged by the pending table.
                    context.unknown_replies.fetch_add(1, Ordering::Relaxed);
                    RouteResult::UnknownReply
                }
                Delivery::WaiterGone => RouteResult::WaiterGone,
            }
        }
    }
}
