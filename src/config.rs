use std::{net::SocketAddr, str::FromStr, time::Duration};

use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300);
pub const DEFAULT_QUESTIONS_PER_CYCLE: usize = 10;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SHEET_GID: &str = "0";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Webhook {
    pub url: Url,
    pub addr: SocketAddr,
}

/// Everything the bot reads from the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub bot_token: String,
    pub sheet_id: String,
    pub sheet_gid: String,
    pub refresh_interval: Duration,
    pub questions_per_cycle: usize,
    pub fetch_timeout: Duration,
    pub log_level: String,
    pub webhook: Option<Webhook>,
}

// Keeps the token out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("sheet_id", &self.sheet_id)
            .field("sheet_gid", &self.sheet_gid)
            .field("refresh_interval", &self.refresh_interval)
            .field("questions_per_cycle", &self.questions_per_cycle)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("log_level", &self.log_level)
            .field("webhook", &self.webhook)
            .finish()
    }
}

impl Config {
    /// Loads `.env` (if any) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let bot_token = var("TELEGRAM_BOT_TOKEN")
            .or_else(|| var("TELOXIDE_TOKEN"))
            .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;
        let sheet_id = var("SHEET_ID").ok_or(ConfigError::Missing("SHEET_ID"))?;
        let sheet_gid = var("SHEET_GID").unwrap_or_else(|| DEFAULT_SHEET_GID.to_owned());

        let refresh_interval = match var("REFRESH_INTERVAL") {
            Some(value) => Duration::from_secs(parse("REFRESH_INTERVAL", &value)?),
            None => DEFAULT_REFRESH_INTERVAL,
        };

        let questions_per_cycle = match var("QUESTIONS_PER_CYCLE") {
            Some(value) => positive("QUESTIONS_PER_CYCLE", &value)?,
            None => DEFAULT_QUESTIONS_PER_CYCLE,
        };

        let fetch_timeout = match var("FETCH_TIMEOUT") {
            Some(value) => Duration::from_secs(positive("FETCH_TIMEOUT", &value)? as u64),
            None => DEFAULT_FETCH_TIMEOUT,
        };

        let log_level = var("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned());

        let webhook = match (var("WEBHOOK_URL"), var("WEBHOOK_ADDR")) {
            (Some(url), Some(addr)) => Some(Webhook {
                url: parse("WEBHOOK_URL", &url)?,
                addr: parse("WEBHOOK_ADDR", &addr)?,
            }),
            _ => None,
        };

        Ok(Self {
            bot_token,
            sheet_id,
            sheet_gid,
            refresh_interval,
            questions_per_cycle,
            fetch_timeout,
            log_level,
            webhook,
        })
    }
}

fn parse<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        value: value.to_owned(),
        reason: e.to_string(),
    })
}

fn positive(name: &'static str, value: &str) -> Result<usize, ConfigError> {
    match parse::<usize>(name, value)? {
        0 => Err(ConfigError::Invalid {
            name,
            value: value.to_owned(),
            reason: "must be at least 1".to_owned(),
        }),
        n => Ok(n),
    }
}
