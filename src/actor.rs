//! Background machinery of a connection.
//!
//! # Components
//!
//! - `PendingTable`: maps in-flight request identifiers to their reply slots
//! - `dispatcher`: the single reader task that routes replies and events

pub(crate) mod dispatcher;
mod pending_table;

pub(crate) use dispatcher::{DispatcherHandle, RouteContext, spawn_dispatcher};
pub(crate) use pending_table::{Delivery, PendingTable};
