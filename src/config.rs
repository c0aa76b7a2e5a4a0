pub mod defaults;
pub mod settings;
pub mod user;

pub use settings::ClientSettings;

use log::debug;

use crate::error::{ClientError, ClientResult};

const LOG_TARGET: &str = "iterm2_client::config";

/// Merge two ClientSettings, preferring values from `primary` over `fallback`
pub fn merge_settings(
    fallback: Option<ClientSettings>,
    primary: Option<ClientSettings>,
) -> Option<ClientSettings> {
    match (fallback, primary) {
        (None, None) => None,
        (Some(settings), None) => Some(settings),
        (None, Some(settings)) => Some(settings),
        (Some(fallback), Some(primary)) => Some(ClientSettings {
            url: primary.url.or(fallback.url),
            subprotocol: primary.subprotocol.or(fallback.subprotocol),
            origin: primary.origin.or(fallback.origin),
            library_version: primary.library_version.or(fallback.library_version),
            cookie: primary.cookie.or(fallback.cookie),
            key: primary.key.or(fallback.key),
            max_concurrent_dispatch: primary
                .max_concurrent_dispatch
                .or(fallback.max_concurrent_dispatch),
            request_timeout_ms: primary.request_timeout_ms.or(fallback.request_timeout_ms),
        }),
    }
}

/// Load settings from the user config file, then overlay the environment.
///
/// A missing file is not an error; an unreadable or malformed one is.
pub fn load_settings() -> ClientResult<ClientSettings> {
    let file = match user::user_config_path() {
        Some(path) if path.is_file() => {
            debug!(target: LOG_TARGET, "Loading settings from {}", path.display());
            let text = std::fs::read_to_string(&path).map_err(|e| {
                ClientError::config(format!("cannot read {}: {}", path.display(), e))
            })?;
            Some(ClientSettings::from_toml_str(&text)?)
        }
        _ => None,
    };

    Ok(merge_settings(file, Some(ClientSettings::from_env())).unwrap_or_default())
}
