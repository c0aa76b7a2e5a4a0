//! Client core for the iTerm2 WebSocket API.
//!
//! Many requests may be in flight over one connection. Each request carries
//! an identifier; the dispatcher routes the reply with the same identifier
//! back to the caller that sent it, and routes unsolicited notifications to
//! the listeners registered on the connection's [`NotificationRouter`].
//!
//! ```ignore
//! let settings = iterm2_client::config::load_settings()?;
//! let connection = Connection::connect(&settings).await?;
//! let sessions = connection.list_sessions().await?;
//! ```

mod actor;
pub mod config;
pub mod connection;
pub mod error;
pub mod notification;
pub mod protocol;
pub mod transport;

pub use config::ClientSettings;
pub use connection::{Connection, ConnectionState, ReplySlot};
pub use error::{ClientError, ClientResult};
pub use notification::{ListenerId, NotificationCategory, NotificationRouter};
pub use protocol::{IdGenerator, RequestId};
