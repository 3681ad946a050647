//! Runtime configuration read from the environment (and `.env` when present).

use crate::constants::{
    DEFAULT_GRACE_PERIOD_MS, DEFAULT_PAYLOAD_TTL_MINUTES, DEFAULT_SWEEP_INTERVAL_SECS,
};
use crate::error::ConfigError;
use crate::routes::InvocationContext;
use serenity::model::id::GuildId;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord_token: String,
    /// Guilds to register commands in. Empty means global registration.
    pub guild_ids: Vec<GuildId>,
    /// `None` when unset; `Some(vec![])` when set but empty (warned about at compile time).
    pub default_contexts: Option<Vec<InvocationContext>>,
    pub payload_ttl_minutes: u32,
    /// Zero disables the background sweep.
    pub sweep_interval: Duration,
    pub grace_period: Duration,
    pub database_url: Option<String>,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingEnv("DISCORD_TOKEN"))?;

        let guild_ids = match lookup("GUILD_IDS") {
            Some(raw) => split_list(&raw)
                .map(|s| {
                    s.parse::<u64>()
                        .ok()
                        .filter(|id| *id != 0)
                        .map(GuildId::new)
                        .ok_or_else(|| ConfigError::InvalidEnv {
                            key: "GUILD_IDS",
                            reason: format!("`{s}` is not a guild id"),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let default_contexts = match lookup("DEFAULT_CONTEXTS") {
            Some(raw) => Some(
                split_list(&raw)
                    .map(|s| {
                        s.parse::<InvocationContext>()
                            .map_err(|reason| ConfigError::InvalidEnv {
                                key: "DEFAULT_CONTEXTS",
                                reason,
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => None,
        };

        let payload_ttl_minutes =
            parse_or(&lookup, "PAYLOAD_TTL_MINUTES", DEFAULT_PAYLOAD_TTL_MINUTES)?;
        let sweep_secs = parse_or(&lookup, "PAYLOAD_SWEEP_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?;
        let grace_ms = parse_or(&lookup, "GRACE_PERIOD_MS", DEFAULT_GRACE_PERIOD_MS)?;

        Ok(Self {
            discord_token,
            guild_ids,
            default_contexts,
            payload_ttl_minutes,
            sweep_interval: Duration::from_secs(sweep_secs),
            grace_period: Duration::from_millis(grace_ms),
            database_url: lookup("DATABASE_URL").filter(|u| !u.trim().is_empty()),
        })
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
                key,
                reason: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}
