use crate::interaction::error::{HttpError, InteractionError, PlatformError};

/// Core error type for the bot.
///
/// Adapter crates should map their specific errors into this type so the error
/// boundary can classify failures consistently (user-facing vs internal).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Interaction(#[from] InteractionError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
