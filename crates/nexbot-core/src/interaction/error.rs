use std::{any::Any, fmt};

use crate::errors::Error;

/// An error meant to be shown to the user who triggered an interaction.
///
/// Only useful where an interaction is involved (commands, button presses). Raised from a
/// detached context (event listeners, the HTTP API) nobody sees the message, so the error
/// boundary logs it instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InteractionError {
    user_message: String,
    internal_message: Option<String>,
}

impl InteractionError {
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            internal_message: None,
        }
    }

    /// Attach detail that only ends up in logs.
    pub fn with_internal(mut self, internal_message: impl Into<String>) -> Self {
        self.internal_message = Some(internal_message.into());
        self
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn internal_message(&self) -> Option<&str> {
        self.internal_message.as_deref()
    }
}

impl fmt::Display for InteractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.internal_message.as_deref().unwrap_or(&self.user_message))
    }
}

impl std::error::Error for InteractionError {}

/// Structured failure reported by the chat platform, carrying a machine-readable code.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("platform error {code}: {message}")]
pub struct PlatformError {
    pub code: String,
    pub message: String,
}

impl PlatformError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn known_code(&self) -> Option<KnownCode> {
        KnownCode::parse(&self.code)
    }
}

/// Platform error codes that are expected and outside of the bot's control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KnownCode {
    MissingPermissions,
    MissingAccess,
    UnknownMessage,
}

impl KnownCode {
    /// Accepts both the canonical names and the numeric codes gateways commonly use.
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim() {
            "50013" | "missing_permissions" => Some(Self::MissingPermissions),
            "50001" | "missing_access" => Some(Self::MissingAccess),
            "10008" | "unknown_message" => Some(Self::UnknownMessage),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingPermissions => "missing_permissions",
            Self::MissingAccess => "missing_access",
            Self::UnknownMessage => "unknown_message",
        }
    }

    pub fn user_message(self) -> &'static str {
        match self {
            Self::MissingPermissions => {
                "I don't have the required permissions to perform that action."
            }
            Self::MissingAccess => "I don't have access to that resource.",
            Self::UnknownMessage => "That message no longer exists.",
        }
    }
}

/// Response-shaped error raised by HTTP handlers.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct HttpError {
    pub status: u16,
    pub message: String,
    /// Full response payload; replaces the default `{statusCode, message}` body.
    pub body: Option<serde_json::Value>,
}

impl HttpError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            body: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Anything else: only a description survives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenericError {
    pub description: String,
}

impl GenericError {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

impl fmt::Display for GenericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// An unhandled failure as seen by the error boundary.
#[derive(Clone, Debug, PartialEq)]
pub enum CaughtError {
    Intentional(InteractionError),
    Platform(PlatformError),
    Http(HttpError),
    Generic(GenericError),
}

impl CaughtError {
    pub fn generic(err: impl fmt::Display) -> Self {
        Self::Generic(GenericError::new(err.to_string()))
    }

    /// Walk the error chain looking for a recognised variant.
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(core) = cause.downcast_ref::<Error>() {
                if let Some(caught) = Self::from_core_ref(core) {
                    return caught;
                }
            }
            if let Some(e) = cause.downcast_ref::<InteractionError>() {
                return Self::Intentional(e.clone());
            }
            if let Some(e) = cause.downcast_ref::<PlatformError>() {
                return Self::Platform(e.clone());
            }
            if let Some(e) = cause.downcast_ref::<HttpError>() {
                return Self::Http(e.clone());
            }
        }
        Self::Generic(GenericError::new(format!("{err:#}")))
    }

    /// Convert a panic payload (from `JoinError::into_panic` or `catch_unwind`).
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        if let Some(e) = payload.downcast_ref::<InteractionError>() {
            return Self::Intentional(e.clone());
        }
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Generic(GenericError::new(format!("panicked: {message}")))
    }

    pub fn is_intentional(&self) -> bool {
        matches!(self, Self::Intentional(_) | Self::Http(_))
    }

    fn from_core_ref(err: &Error) -> Option<Self> {
        match err {
            Error::Interaction(e) => Some(Self::Intentional(e.clone())),
            Error::Platform(e) => Some(Self::Platform(e.clone())),
            Error::Http(e) => Some(Self::Http(e.clone())),
            _ => None,
        }
    }
}

impl From<Error> for CaughtError {
    fn from(err: Error) -> Self {
        match err {
            Error::Interaction(e) => Self::Intentional(e),
            Error::Platform(e) => Self::Platform(e),
            Error::Http(e) => Self::Http(e),
            other => Self::generic(other),
        }
    }
}

impl From<anyhow::Error> for CaughtError {
    fn from(err: anyhow::Error) -> Self {
        Self::from_anyhow(err)
    }
}

impl From<InteractionError> for CaughtError {
    fn from(err: InteractionError) -> Self {
        Self::Intentional(err)
    }
}

impl From<PlatformError> for CaughtError {
    fn from(err: PlatformError) -> Self {
        Self::Platform(err)
    }
}

impl From<HttpError> for CaughtError {
    fn from(err: HttpError) -> Self {
        Self::Http(err)
    }
}
