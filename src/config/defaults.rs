//! Default configuration values for iterm2-client.

/// Address of the iTerm2 API server.
pub const DEFAULT_URL: &str = "ws://localhost:1912";

/// WebSocket subprotocol spoken by the API server.
pub const DEFAULT_SUBPROTOCOL: &str = "api.iterm2.com";

/// Origin header expected by the API server.
pub const DEFAULT_ORIGIN: &str = "ws://localhost/";

/// Upper bound on frames being routed concurrently per connection.
pub const DEFAULT_MAX_CONCURRENT_DISPATCH: usize = 64;

/// Deadline applied by the convenience operations of `Connection`.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Environment variable carrying the cookie granted by iTerm2.
pub const COOKIE_ENV: &str = "ITERM2_COOKIE";

/// Environment variable carrying the key granted by iTerm2.
pub const KEY_ENV: &str = "ITERM2_KEY";

/// Value of the `x-iterm2-library-version` header.
pub fn default_library_version() -> String {
    format!("rust {}", env!("CARGO_PKG_VERSION"))
}
