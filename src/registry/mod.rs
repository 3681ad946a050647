//! The remote command registry seen through a small async trait, plus scopes and the synchronizer.

pub mod http;
pub mod sync;

use crate::error::RegistryError;
use crate::routes::CompiledCommand;
use async_trait::async_trait;
use serenity::model::id::{CommandId, GuildId};
use std::fmt;

pub use http::HttpRegistry;
pub use sync::Synchronizer;

/// A namespace of remote commands: the global set, or one guild's set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryScope {
    Global,
    Guild(GuildId),
}

impl RegistryScope {
    /// Guild scopes when any guild ids are configured, otherwise the single global scope.
    pub fn from_guilds(guilds: &[GuildId]) -> Vec<RegistryScope> {
        if guilds.is_empty() {
            vec![RegistryScope::Global]
        } else {
            guilds.iter().copied().map(RegistryScope::Guild).collect()
        }
    }
}

impl fmt::Display for RegistryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryScope::Global => f.write_str("global"),
            RegistryScope::Guild(id) => write!(f, "guild:{}", id.get()),
        }
    }
}

/// The authoritative `(name, id)` pair the registry returns for a stored command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredCommand {
    pub name: String,
    pub id: CommandId,
}

#[async_trait]
pub trait RemoteRegistry: Send + Sync {
    async fn fetch(&self, scope: RegistryScope) -> Result<Vec<RegisteredCommand>, RegistryError>;

    async fn create(
        &self,
        command: &CompiledCommand,
        scope: RegistryScope,
    ) -> Result<RegisteredCommand, RegistryError>;

    async fn edit(
        &self,
        id: CommandId,
        command: &CompiledCommand,
        scope: RegistryScope,
    ) -> Result<RegisteredCommand, RegistryError>;

    async fn delete(&self, id: CommandId, scope: RegistryScope) -> Result<(), RegistryError>;

    /// Replace the whole command set of `scope` in one call.
    async fn set_all(
        &self,
        commands: &[CompiledCommand],
        scope: RegistryScope,
    ) -> Result<Vec<RegisteredCommand>, RegistryError>;
}
