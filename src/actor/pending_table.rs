//! Bookkeeping for requests awaiting their reply.
//!
//! The PendingTable maps each in-flight request identifier to the oneshot
//! sender that will wake the caller waiting on that request:
//! - The send path calls `register(id, tx)` before writing the request
//! - The dispatcher calls `take(id)` when a reply with that id arrives
//! - The send path calls `forget(id)` when the write fails
//!
//! Every operation is serialized by one mutex and logs its outcome.

use std::collections::HashMap;

use log::{debug, error, warn};
use tokio::sync::oneshot;

use crate::error::{ClientError, ClientResult, LockResultExt};
use crate::protocol::RequestId;
use crate::protocol::api::ServerOriginatedMessage;

const LOG_TARGET: &str = "iterm2_client::pending";

/// Sender half of a one-shot reply slot.
pub(crate) type ReplySender = oneshot::Sender<ServerOriginatedMessage>;

/// Outcome of handing a reply to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// The waiter received the reply
    Delivered,
    /// No entry for the id
    Unknown,
    /// The entry existed but its caller had already dropped the slot
    WaiterGone,
}

/// Thread-safe table of in-flight requests.
///
/// Owned by one connection and shared only with that connection's
/// dispatcher. Nobody outside holds references into the map; all access
/// goes through the methods below.
pub(crate) struct PendingTable {
    pending: std::sync::Mutex<HashMap<RequestId, ReplySender>>,
}

impl Default for PendingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingTable {
    /// Create a new empty PendingTable.
    pub(crate) fn new() -> Self {
        Self {
            pending: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Store the reply sender for a request about to be sent.
    ///
    /// Fails with `DuplicateId` if an entry already exists for `id`; the
    /// existing entry is left untouched and `tx` is dropped, which closes the
    /// caller's slot.
    pub(crate) fn register(&self, id: RequestId, tx: ReplySender) -> ClientResult<()> {
        let mut pending = self.pending.lock().recover_poison("PendingTable::register");

        if pending.contains_key(&id) {
            error!(
                target: LOG_TARGET,
                "Response channel already exists for message ID {}",
                id
            );
            return Err(ClientError::DuplicateId { id });
        }

        pending.insert(id, tx);
        debug!(
            target: LOG_TARGET,
            "stored in-flight message ID {} response channel",
            id
        );
        Ok(())
    }

    /// Remove and return the reply sender for `id`.
    ///
    /// Unlike a plain lookup, this removes the entry: a oneshot sender is
    /// consumed by delivery, so `take` also does the work of the `forget`
    /// that would otherwise follow it. Once this returns `Ok`, any further
    /// `take` or `forget` for the same id fails with `UnknownId`.
    pub(crate) fn take(&self, id: RequestId) -> ClientResult<ReplySender> {
        let mut pending = self.pending.lock().recover_poison("PendingTable::take");

        match pending.remove(&id) {
            Some(tx) => {
                debug!(target: LOG_TARGET, "found in-flight message ID {}", id);
                Ok(tx)
            }
            None => {
                warn!(target: LOG_TARGET, "unknown message ID {}", id);
                Err(ClientError::UnknownId { id })
            }
        }
    }

    /// Drop the entry for `id` without delivering anything.
    ///
    /// Used when the request could not be written, so that no entry is left
    /// behind for a reply that will never come.
    pub(crate) fn forget(&self, id: RequestId) -> ClientResult<()> {
        let mut pending = self.pending.lock().recover_poison("PendingTable::forget");

        if pending.remove(&id).is_some() {
            debug!(
                target: LOG_TARGET,
                "forgetting about in-flight message ID {}",
                id
            );
            Ok(())
        } else {
            warn!(
                target: LOG_TARGET,
                "unknown message ID {} to forget about, nothing has been done",
                id
            );
            Err(ClientError::UnknownId { id })
        }
    }

    /// Deliver a reply to the caller waiting on `id`.
    ///
    /// Whatever the outcome, the table holds no entry for `id` afterwards.
    pub(crate) fn deliver(&self, id: RequestId, message: ServerOriginatedMessage) -> Delivery {
        let Ok(tx) = self.take(id) else {
            return Delivery::Unknown;
        };

        // Lock released by `take`; sending never happens under the mutex.
        if tx.send(message).is_err() {
            debug!(
                target: LOG_TARGET,
                "waiter for message ID {} is gone, reply dropped",
                id
            );
            return Delivery::WaiterGone;
        }
        Delivery::Delivered
    }

    /// Whether a request with this id is still waiting.
    #[cfg(test)]
    pub(crate) fn contains(&self, id: RequestId) -> bool {
        let pending = self.pending.lock().recover_poison("PendingTable::contains");
        pending.contains_key(&id)
    }

    /// Number of requests still waiting for a reply.
    pub(crate) fn pending_count(&self) -> usize {
        let pending = self
            .pending
            .lock()
            .recover_poison("PendingTable::pending_count");
        pending.len()
    }
}
