//! Keeps the remote registry in step with the route table.
//!
//! Each scope owns a `name -> CommandId` cache. It is filled by one full fetch the first time
//! the scope is touched, then kept current from the responses of create/edit/delete. Each
//! scope's cache sits behind its own mutex that is held for the whole read-modify-write, so a
//! failed remote call leaves the scope exactly as it was.
//!
//! A not-found from `fetch`, `create` or `set_all` means the scope itself is gone (e.g. the bot
//! left the guild) and the scope is skipped. A not-found on `edit` only means the cached id is
//! stale; the command is recreated.

use super::{RegisteredCommand, RegistryScope, RemoteRegistry};
use crate::error::{BotResult, RegistryError};
use crate::routes::compiler::{compile_all, compile_root};
use crate::routes::{CompileOptions, CompiledCommand, RouteTable};
use ahash::AHashMap;
use serenity::model::id::CommandId;
use std::sync::Arc;
use tokio::sync::Mutex;

type ScopeCache = AHashMap<String, CommandId>;

pub struct Synchronizer {
    registry: Arc<dyn RemoteRegistry>,
    options: CompileOptions,
    scopes: Vec<RegistryScope>,
    // `None` until the scope has been fetched or bulk-set.
    caches: AHashMap<RegistryScope, Arc<Mutex<Option<ScopeCache>>>>,
}

impl Synchronizer {
    /// An empty `scopes` list means the global scope.
    pub fn new(
        registry: Arc<dyn RemoteRegistry>,
        scopes: Vec<RegistryScope>,
        options: CompileOptions,
    ) -> Self {
        let mut unique: Vec<RegistryScope> = Vec::new();
        for scope in scopes {
            if !unique.contains(&scope) {
                unique.push(scope);
            }
        }
        if unique.is_empty() {
            unique.push(RegistryScope::Global);
        }
        let caches = unique
            .iter()
            .map(|s| (*s, Arc::new(Mutex::new(None))))
            .collect();
        Self {
            registry,
            options,
            scopes: unique,
            caches,
        }
    }

    pub fn scopes(&self) -> &[RegistryScope] {
        &self.scopes
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// The cached remote id for `name` in `scope`, without touching the remote.
    pub async fn cached_id(&self, scope: RegistryScope, name: &str) -> Option<CommandId> {
        let cache = self.caches.get(&scope)?;
        cache.lock().await.as_ref()?.get(name).copied()
    }

    pub async fn is_warm(&self, scope: RegistryScope) -> bool {
        match self.caches.get(&scope) {
            Some(cache) => cache.lock().await.is_some(),
            None => false,
        }
    }

    /// Full deployment: compile every root and replace each scope's command set wholesale.
    pub async fn deploy(&self, table: &RouteTable) -> BotResult<()> {
        let commands = compile_all(table, &self.options)?;
        self.set_all(&commands).await?;
        Ok(())
    }

    /// Bulk-set `commands` in every scope and reseed the caches from the responses.
    pub async fn set_all(&self, commands: &[CompiledCommand]) -> Result<(), RegistryError> {
        for scope in &self.scopes {
            let Some(cache) = self.caches.get(scope) else {
                continue;
            };
            let mut guard = cache.lock().await;
            match self.registry.set_all(commands, *scope).await {
                Ok(registered) => {
                    tracing::info!(
                        target = "registry.sync",
                        scope = %scope,
                        count = registered.len(),
                        "registered commands"
                    );
                    *guard = Some(seed(registered));
                }
                Err(e) if e.is_not_found() => {
                    tracing::warn!(
                        target = "registry.sync",
                        scope = %scope,
                        "scope not found; skipping"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Recompile `root` from the table and push only that command to every scope.
    /// A root with no remaining routes is deleted remotely.
    pub async fn apply_root(&self, table: &RouteTable, root: &str) -> BotResult<()> {
        let compiled = compile_root(table, root, &self.options)?;
        self.upsert(root, compiled.as_ref()).await?;
        Ok(())
    }

    /// Create, edit or delete the single command `root` in every scope. Other roots are untouched.
    pub async fn upsert(
        &self,
        root: &str,
        compiled: Option<&CompiledCommand>,
    ) -> Result<(), RegistryError> {
        for scope in &self.scopes {
            match self.upsert_in_scope(*scope, root, compiled).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    tracing::warn!(
                        target = "registry.sync",
                        scope = %scope,
                        root = %root,
                        "scope not found; skipping"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        target = "registry.sync",
                        scope = %scope,
                        root = %root,
                        error = ?e,
                        "sync failed"
                    );
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    async fn upsert_in_scope(
        &self,
        scope: RegistryScope,
        root: &str,
        compiled: Option<&CompiledCommand>,
    ) -> Result<(), RegistryError> {
        let Some(cache) = self.caches.get(&scope) else {
            return Ok(());
        };
        let mut guard = cache.lock().await;
        if guard.is_none() {
            let fetched = self.registry.fetch(scope).await?;
            tracing::debug!(
                target = "registry.sync",
                scope = %scope,
                count = fetched.len(),
                "scope cache warmed"
            );
            *guard = Some(seed(fetched));
        }
        let Some(entries) = guard.as_mut() else {
            return Ok(());
        };
        let remote_id = entries.get(root).copied();

        match (compiled, remote_id) {
            (None, None) => {}
            (None, Some(id)) => {
                match self.registry.delete(id, scope).await {
                    Ok(()) => {}
                    // Already removed remotely.
                    Err(e) if e.is_not_found() => {
                        tracing::debug!(
                            target = "registry.sync",
                            scope = %scope,
                            root = %root,
                            "command already deleted remotely"
                        );
                    }
                    Err(e) => return Err(e),
                }
                entries.remove(root);
                tracing::debug!(
                    target = "registry.sync",
                    scope = %scope,
                    root = %root,
                    "deleted command"
                );
            }
            (Some(cmd), Some(id)) => {
                let updated = match self.registry.edit(id, cmd, scope).await {
                    Ok(updated) => updated,
                    Err(e) if e.is_not_found() => {
                        // Stale id: the command was removed remotely, so create it again.
                        entries.remove(root);
                        tracing::warn!(
                            target = "registry.sync",
                            scope = %scope,
                            root = %root,
                            "cached command id is stale; recreating"
                        );
                        let created = self.registry.create(cmd, scope).await?;
                        entries.insert(created.name, created.id);
                        return Ok(());
                    }
                    Err(e) => return Err(e),
                };
                if updated.name != root {
                    entries.remove(root);
                }
                tracing::debug!(
                    target = "registry.sync",
                    scope = %scope,
                    name = %updated.name,
                    "edited command"
                );
                entries.insert(updated.name, updated.id);
            }
            (Some(cmd), None) => {
                let created = self.registry.create(cmd, scope).await?;
                tracing::debug!(
                    target = "registry.sync",
                    scope = %scope,
                    name = %created.name,
                    "created command"
                );
                entries.insert(created.name, created.id);
            }
        }
        Ok(())
    }
}

fn seed(registered: Vec<RegisteredCommand>) -> ScopeCache {
    registered.into_iter().map(|c| (c.name, c.id)).collect()
}
