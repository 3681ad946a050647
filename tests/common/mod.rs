//! In-memory fakes shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use serenity::model::id::CommandId;
use slashkit::BotResult;
use slashkit::error::RegistryError;
use slashkit::interactions::{Reply, Responder};
use slashkit::registry::{RegisteredCommand, RegistryScope, RemoteRegistry};
use slashkit::routes::CompiledCommand;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Remote registry that keeps commands in memory and logs every call.
pub struct FakeRegistry {
    next_id: AtomicU64,
    remote: Mutex<HashMap<RegistryScope, Vec<RegisteredCommand>>>,
    calls: Mutex<Vec<String>>,
    missing: Mutex<HashSet<RegistryScope>>,
    failing: Mutex<HashSet<RegistryScope>>,
    rename_on_edit: Mutex<Option<String>>,
    // Subcommand names of the last schema pushed for each command.
    schemas: Mutex<HashMap<(RegistryScope, String), Vec<String>>>,
}

impl Default for FakeRegistry {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(100),
            remote: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            missing: Mutex::new(HashSet::new()),
            failing: Mutex::new(HashSet::new()),
            rename_on_edit: Mutex::new(None),
            schemas: Mutex::new(HashMap::new()),
        }
    }
}

impl FakeRegistry {
    fn new_id(&self) -> CommandId {
        CommandId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Put a command directly into the remote side (as if registered earlier).
    pub fn seed(&self, scope: RegistryScope, name: &str) -> CommandId {
        let id = self.new_id();
        self.remote
            .lock()
            .unwrap()
            .entry(scope)
            .or_default()
            .push(RegisteredCommand {
                name: name.to_string(),
                id,
            });
        id
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn remote_names(&self, scope: RegistryScope) -> Vec<String> {
        self.remote
            .lock()
            .unwrap()
            .get(&scope)
            .map(|v| v.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Remove a command remotely without going through the registry API.
    pub fn drop_remote(&self, scope: RegistryScope, name: &str) {
        if let Some(list) = self.remote.lock().unwrap().get_mut(&scope) {
            list.retain(|c| c.name != name);
        }
    }

    pub fn mark_missing(&self, scope: RegistryScope) {
        self.missing.lock().unwrap().insert(scope);
    }

    pub fn mark_failing(&self, scope: RegistryScope) {
        self.failing.lock().unwrap().insert(scope);
    }

    pub fn rename_next_edit(&self, name: &str) {
        *self.rename_on_edit.lock().unwrap() = Some(name.to_string());
    }

    /// Subcommands of the schema last pushed for `name`, or `None` if never pushed.
    pub fn subcommands(&self, scope: RegistryScope, name: &str) -> Option<Vec<String>> {
        self.schemas
            .lock()
            .unwrap()
            .get(&(scope, name.to_string()))
            .cloned()
    }

    fn remember(&self, scope: RegistryScope, command: &CompiledCommand) {
        self.schemas.lock().unwrap().insert(
            (scope, command.name.clone()),
            command.subcommands.keys().cloned().collect(),
        );
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, scope: RegistryScope) -> Result<(), RegistryError> {
        if self.missing.lock().unwrap().contains(&scope) {
            return Err(RegistryError::NotFound);
        }
        if self.failing.lock().unwrap().contains(&scope) {
            return Err(RegistryError::Rejected("boom".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteRegistry for FakeRegistry {
    async fn fetch(&self, scope: RegistryScope) -> Result<Vec<RegisteredCommand>, RegistryError> {
        self.record(format!("fetch {scope}"));
        tokio::task::yield_now().await;
        self.check(scope)?;
        Ok(self
            .remote
            .lock()
            .unwrap()
            .get(&scope)
            .cloned()
            .unwrap_or_default())
    }

    async fn create(
        &self,
        command: &CompiledCommand,
        scope: RegistryScope,
    ) -> Result<RegisteredCommand, RegistryError> {
        self.record(format!("create {scope} {}", command.name));
        tokio::task::yield_now().await;
        self.check(scope)?;
        self.remember(scope, command);
        let registered = RegisteredCommand {
            name: command.name.clone(),
            id: self.new_id(),
        };
        self.remote
            .lock()
            .unwrap()
            .entry(scope)
            .or_default()
            .push(registered.clone());
        Ok(registered)
    }

    async fn edit(
        &self,
        id: CommandId,
        command: &CompiledCommand,
        scope: RegistryScope,
    ) -> Result<RegisteredCommand, RegistryError> {
        self.record(format!("edit {scope} {}", command.name));
        self.check(scope)?;
        tokio::task::yield_now().await;
        let rename = self.rename_on_edit.lock().unwrap().take();
        let mut remote = self.remote.lock().unwrap();
        let entry = remote
            .get_mut(&scope)
            .and_then(|v| v.iter_mut().find(|c| c.id == id))
            .ok_or(RegistryError::NotFound)?;
        entry.name = rename.unwrap_or_else(|| command.name.clone());
        let updated = entry.clone();
        drop(remote);
        self.remember(scope, command);
        Ok(updated)
    }

    async fn delete(&self, id: CommandId, scope: RegistryScope) -> Result<(), RegistryError> {
        self.record(format!("delete {scope} {id}"));
        self.check(scope)?;
        let mut remote = self.remote.lock().unwrap();
        let list = remote.get_mut(&scope).ok_or(RegistryError::NotFound)?;
        let before = list.len();
        list.retain(|c| c.id != id);
        if list.len() == before {
            return Err(RegistryError::NotFound);
        }
        Ok(())
    }

    async fn set_all(
        &self,
        commands: &[CompiledCommand],
        scope: RegistryScope,
    ) -> Result<Vec<RegisteredCommand>, RegistryError> {
        self.record(format!("set_all {scope} {}", commands.len()));
        tokio::task::yield_now().await;
        self.check(scope)?;
        for command in commands {
            self.remember(scope, command);
        }
        let registered: Vec<RegisteredCommand> = commands
            .iter()
            .map(|c| RegisteredCommand {
                name: c.name.clone(),
                id: self.new_id(),
            })
            .collect();
        self.remote
            .lock()
            .unwrap()
            .insert(scope, registered.clone());
        Ok(registered)
    }
}

/// Responder that records what would have been sent.
#[derive(Default)]
pub struct RecordingResponder {
    acked: AtomicBool,
    log: Mutex<Vec<String>>,
}

impl RecordingResponder {
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn push(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl Responder for RecordingResponder {
    fn is_acknowledged(&self) -> bool {
        self.acked.load(Ordering::SeqCst)
    }

    async fn reply(&self, reply: Reply) -> BotResult<()> {
        if self.acked.swap(true, Ordering::SeqCst) {
            self.push(format!("follow_up:{}", reply.content));
        } else {
            self.push(format!("reply:{}", reply.content));
        }
        Ok(())
    }

    async fn update(&self, reply: Reply) -> BotResult<()> {
        if self.acked.swap(true, Ordering::SeqCst) {
            self.push(format!("follow_up:{}", reply.content));
        } else {
            self.push(format!("update:{}", reply.content));
        }
        Ok(())
    }

    async fn defer(&self, _ephemeral: bool) -> BotResult<()> {
        if !self.acked.swap(true, Ordering::SeqCst) {
            self.push("defer".to_string());
        }
        Ok(())
    }

    async fn follow_up(&self, reply: Reply) -> BotResult<()> {
        self.push(format!("follow_up:{}", reply.content));
        Ok(())
    }
}
