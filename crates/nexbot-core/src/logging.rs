use crate::{errors::Error, Result};

/// Initialize logging/tracing for the bot.
pub fn init(service_name: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    // Default: info for our crates, warn for everything else.
    // Can be overridden with `RUST_LOG`.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,nexbot=info,nexbot_core=info,nexbot_telegram=info,nexbot_http=info,{service_name}=info"
        ))
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialised: {e}")))?;

    install_panic_hook();
    Ok(())
}

/// Route panics through tracing so they land next to the rest of the logs.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("💥 panic: {info}");
        default_hook(info);
    }));
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Warn,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    /// Pipeline step that produced the record.
    pub origin: &'static str,
    pub message: String,
}

impl LogRecord {
    pub fn error(origin: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Error,
            origin,
            message: message.into(),
        }
    }

    pub fn warn(origin: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Warn,
            origin,
            message: message.into(),
        }
    }
}

/// Fire-and-forget log destination used by the error boundary.
pub trait LogSink: Send + Sync {
    fn record(&self, record: LogRecord);
}

/// Production sink: one tracing event per record.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, record: LogRecord) {
        match record.level {
            LogLevel::Error => tracing::error!(origin = record.origin, "{}", record.message),
            LogLevel::Warn => tracing::warn!(origin = record.origin, "{}", record.message),
        }
    }
}
