//! Request identifiers and their per-connection generator.
//!
//! Every outbound request carries an identifier that the server echoes back
//! on the matching reply. The generator hands out strictly increasing,
//! positive values for the lifetime of one connection.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Identifier correlating a request with its reply.
///
/// Wraps `i64` because the wire schema declares the `id` field as `int64`.
/// Values produced by [`IdGenerator`] are always `>= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(i64);

impl RequestId {
    /// Create a new RequestId from an i64 value.
    #[inline]
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the underlying i64 value.
    ///
    /// Used when filling the `id` field of an outbound envelope.
    #[inline]
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<RequestId> for i64 {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sequential identifier supply owned by one connection.
///
/// A single atomic counter: concurrent callers never observe the same value,
/// and the supply is monotonic even though requests may be sent in a
/// different order than their identifiers were allocated. Wraparound of the
/// 64-bit counter is not handled.
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicI64,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    /// Create a generator whose first identifier is 1.
    pub fn new() -> Self {
        Self {
            next: AtomicI64::new(1),
        }
    }

    /// Allocate the next identifier.
    pub fn next(&self) -> RequestId {
        RequestId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
