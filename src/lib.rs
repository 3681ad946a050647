// Library entry so integration tests and the binary share the same modules.
pub mod commands;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod handler;
pub mod interactions;
pub mod model;
pub mod registry;
pub mod routes;
pub mod services;
pub mod util;

pub use error::{BotError, BotResult, ConfigError, RegistryError};
pub use model::AppState;
