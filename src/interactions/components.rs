//! Registration of buttons, select menus and modals by base id.
//!
//! All component kinds share one implementation. Buttons and the five select kinds arrive as
//! message-component interactions and therefore share a namespace; modals have their own.

use super::InteractionHandler;
use super::ids::ComponentCodec;
use crate::error::{BotResult, ConfigError};
use ahash::AHashMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Button,
    StringSelect,
    UserSelect,
    RoleSelect,
    MentionableSelect,
    ChannelSelect,
    Modal,
}

/// The custom id namespace a component kind lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentFamily {
    Message,
    Modal,
}

impl ComponentKind {
    pub fn family(self) -> ComponentFamily {
        match self {
            ComponentKind::Modal => ComponentFamily::Modal,
            _ => ComponentFamily::Message,
        }
    }
}

#[derive(Clone)]
pub struct ComponentDef {
    pub kind: ComponentKind,
    pub base_id: String,
    pub handler: Arc<dyn InteractionHandler>,
}

impl ComponentDef {
    pub fn new(
        kind: ComponentKind,
        base_id: impl Into<String>,
        handler: Arc<dyn InteractionHandler>,
    ) -> Self {
        Self {
            kind,
            base_id: base_id.into(),
            handler,
        }
    }

    pub fn button(base_id: impl Into<String>, handler: Arc<dyn InteractionHandler>) -> Self {
        Self::new(ComponentKind::Button, base_id, handler)
    }

    pub fn modal(base_id: impl Into<String>, handler: Arc<dyn InteractionHandler>) -> Self {
        Self::new(ComponentKind::Modal, base_id, handler)
    }
}

impl fmt::Debug for ComponentDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDef")
            .field("kind", &self.kind)
            .field("base_id", &self.base_id)
            .finish_non_exhaustive()
    }
}

pub struct ComponentRegistry {
    codec: Arc<ComponentCodec>,
    entries: AHashMap<(ComponentFamily, String), ComponentDef>,
}

impl ComponentRegistry {
    pub fn new(codec: Arc<ComponentCodec>) -> Self {
        Self {
            codec,
            entries: AHashMap::new(),
        }
    }

    pub fn codec(&self) -> &Arc<ComponentCodec> {
        &self.codec
    }

    pub fn register(&mut self, def: ComponentDef) -> Result<(), ConfigError> {
        self.codec.validate_base_id(&def.base_id)?;
        let key = (def.kind.family(), def.base_id.clone());
        if self.entries.contains_key(&key) {
            return Err(ConfigError::DuplicateComponent(def.base_id));
        }
        self.entries.insert(key, def);
        Ok(())
    }

    pub fn register_all(
        &mut self,
        defs: impl IntoIterator<Item = ComponentDef>,
    ) -> Result<(), ConfigError> {
        for def in defs {
            self.register(def)?;
        }
        Ok(())
    }

    pub fn resolve(&self, family: ComponentFamily, base_id: &str) -> Option<&ComponentDef> {
        self.entries.get(&(family, base_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Custom id for a registered component carrying `payload`.
    pub async fn wire_id<T: Serialize + ?Sized>(
        &self,
        kind: ComponentKind,
        base_id: &str,
        payload: &T,
        ttl_minutes: Option<u32>,
    ) -> BotResult<String> {
        self.ensure_registered(kind, base_id)?;
        self.codec.attach(base_id, payload, ttl_minutes).await
    }

    /// Custom id for a registered component without data.
    pub fn plain_id(&self, kind: ComponentKind, base_id: &str) -> Result<String, ConfigError> {
        self.ensure_registered(kind, base_id)?;
        Ok(base_id.to_string())
    }

    /// The base id must be registered with exactly this kind, not just in the same family.
    fn ensure_registered(&self, kind: ComponentKind, base_id: &str) -> Result<(), ConfigError> {
        match self.resolve(kind.family(), base_id) {
            Some(def) if def.kind == kind => Ok(()),
            _ => Err(ConfigError::UnknownComponent(base_id.to_string())),
        }
    }
}
