use std::{
    env,
    fmt, fs,
    net::IpAddr,
    path::Path,
    str::FromStr,
    time::Duration,
};

use crate::{errors::Error, polls, Result};

/// Deployment stage, from `BOT_ENV`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BotEnv {
    Development,
    Staging,
    #[default]
    Production,
}

impl FromStr for BotEnv {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" => Ok(Self::Production),
            other => Err(Error::Config(format!(
                "BOT_ENV must be one of development, staging, production (got {other:?})"
            ))),
        }
    }
}

impl fmt::Display for BotEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        })
    }
}

/// Hosting metadata injected by Railway. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RailwayInfo {
    pub public_domain: Option<String>,
    pub private_domain: Option<String>,
    pub project_name: Option<String>,
    pub environment_name: Option<String>,
    pub service_name: Option<String>,
    pub project_id: Option<String>,
    pub environment_id: Option<String>,
    pub service_id: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,
    pub bot_env: BotEnv,

    // HTTP API; disabled when PORT is unset.
    pub http_port: Option<u16>,
    pub http_bind_address: IpAddr,

    pub railway: RailwayInfo,

    pub poll_default_duration: Duration,
}

impl Config {
    /// Read the process environment, after loading `.env` when present.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `load` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let telegram_bot_token = lookup("TELEGRAM_BOT_TOKEN")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
            })?;

        let bot_env = match lookup("BOT_ENV").and_then(non_empty) {
            Some(v) => v.parse()?,
            None => BotEnv::default(),
        };

        let http_port = lookup("PORT")
            .and_then(non_empty)
            .map(|v| {
                v.parse::<u16>()
                    .map_err(|_| Error::Config(format!("PORT must be a port number (got {v:?})")))
            })
            .transpose()?;

        let http_bind_address = match lookup("HTTP_BIND_ADDRESS").and_then(non_empty) {
            Some(v) => v.parse().map_err(|_| {
                Error::Config(format!("HTTP_BIND_ADDRESS must be an IP address (got {v:?})"))
            })?,
            None => IpAddr::from([0, 0, 0, 0]),
        };

        let railway_var = |key: &str| -> Result<Option<String>> {
            match lookup(key) {
                None => Ok(None),
                Some(v) if v.trim().is_empty() => {
                    Err(Error::Config(format!("{key} must not be empty when set")))
                }
                Some(v) => Ok(Some(v.trim().to_string())),
            }
        };
        let railway = RailwayInfo {
            public_domain: railway_var("RAILWAY_PUBLIC_DOMAIN")?,
            private_domain: railway_var("RAILWAY_PRIVATE_DOMAIN")?,
            project_name: railway_var("RAILWAY_PROJECT_NAME")?,
            environment_name: railway_var("RAILWAY_ENVIRONMENT_NAME")?,
            service_name: railway_var("RAILWAY_SERVICE_NAME")?,
            project_id: railway_var("RAILWAY_PROJECT_ID")?,
            environment_id: railway_var("RAILWAY_ENVIRONMENT_ID")?,
            service_id: railway_var("RAILWAY_SERVICE_ID")?,
        };

        let raw_poll = lookup("POLL_DEFAULT_DURATION")
            .and_then(non_empty)
            .unwrap_or_else(|| "1m".to_string());
        let poll_default_duration = polls::parse_duration(&raw_poll)
            .filter(|d| (polls::MIN_DURATION..=polls::MAX_DURATION).contains(d))
            .ok_or_else(|| {
                Error::Config(format!(
                    "POLL_DEFAULT_DURATION must be a duration between 10s and 7d (got {raw_poll:?})"
                ))
            })?;

        Ok(Self {
            telegram_bot_token,
            bot_env,
            http_port,
            http_bind_address,
            railway,
            poll_default_duration,
        })
    }

    pub fn is_production(&self) -> bool {
        self.bot_env == BotEnv::Production
    }
}

fn non_empty(v: String) -> Option<String> {
    let t = v.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Minimal `.env` support: `KEY=value` lines, optional quotes, existing variables win.
fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in contents.lines().filter_map(parse_dotenv_line) {
        if env::var_os(&key).is_some() {
            continue;
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv_line(raw: &str) -> Option<(String, String)> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (k, v) = line.split_once('=')?;
    let key = k.trim();
    if key.is_empty() {
        return None;
    }

    let val = v.trim();
    let quoted = val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')));
    let val = if quoted { &val[1..val.len() - 1] } else { val };
    Some((key.to_string(), val.to_string()))
}
