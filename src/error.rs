//! Error types shared across routing, registry sync and payload storage.

use thiserror::Error;

/// Fatal setup mistakes. These abort startup or the registration call that caused them.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("route `{path}` is too deep ({depth} segments, max {max})")]
    RouteTooDeep {
        path: String,
        depth: usize,
        max: usize,
    },
    #[error("route path is empty")]
    EmptyRoute,
    #[error("route `{0}` has an empty segment")]
    EmptySegment(String),
    #[error("component id `{0}` is registered twice in the same family")]
    DuplicateComponent(String),
    #[error("component base id `{0}` is empty or contains the wire separator")]
    InvalidBaseId(String),
    #[error("component id for `{base_id}` would be {len} chars (max {max})")]
    IdentifierTooLong {
        base_id: String,
        len: usize,
        max: usize,
    },
    #[error("component `{0}` is not registered")]
    UnknownComponent(String),
    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),
    #[error("invalid value for {key}: {reason}")]
    InvalidEnv { key: &'static str, reason: String },
}

/// Failures reported by a remote command registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The scope or command no longer exists remotely (e.g. the bot left the guild).
    #[error("registry resource not found")]
    NotFound,
    #[error("registry request failed: {0}")]
    Http(#[from] serenity::Error),
    #[error("registry rejected request: {0}")]
    Rejected(String),
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound)
    }
}

#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("payload store error: {0}")]
    Store(#[from] sqlx::Error),
    #[error("payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("discord error: {0}")]
    Discord(#[from] serenity::Error),
}

pub type BotResult<T> = Result<T, BotError>;
