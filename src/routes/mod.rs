//! The route table: dot-path keys (`shop`, `shop.buy`, `admin.cache.stats`) mapped to handlers.
//!
//! Routes arrive pre-parsed from whatever discovers them (file layout, a hand-written list).
//! The table only stores them; `compiler` turns the routes sharing a root into one command schema.

pub mod compiler;

use crate::constants::{MAX_ROUTE_DEPTH, ROUTE_SEPARATOR};
use crate::error::ConfigError;
use crate::interactions::InteractionHandler;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub use compiler::{CompileOptions, CompiledCommand, GroupSchema, LeafSchema};

/// A validated route path: one or more non-empty segments.
///
/// Depth is not capped here so that an over-deep route can still be named in the error
/// the table or compiler raises for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutePath {
    segments: Vec<String>,
}

impl RoutePath {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ConfigError::EmptyRoute);
        }
        let segments: Vec<String> = raw
            .split(ROUTE_SEPARATOR)
            .map(|s| s.trim().to_string())
            .collect();
        if segments.iter().any(String::is_empty) {
            return Err(ConfigError::EmptySegment(raw.to_string()));
        }
        Ok(Self { segments })
    }

    pub fn root(&self) -> &str {
        &self.segments[0]
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The dispatch lookup key, identical to the dotted path.
    pub fn key(&self) -> String {
        self.segments.join(&ROUTE_SEPARATOR.to_string())
    }

    pub fn ensure_depth(&self) -> Result<(), ConfigError> {
        if self.depth() > MAX_ROUTE_DEPTH {
            return Err(ConfigError::RouteTooDeep {
                path: self.key(),
                depth: self.depth(),
                max: MAX_ROUTE_DEPTH,
            });
        }
        Ok(())
    }
}

impl FromStr for RoutePath {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Where a command may be invoked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationContext {
    Guild,
    BotDm,
    PrivateChannel,
}

impl FromStr for InvocationContext {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guild" => Ok(Self::Guild),
            "bot_dm" | "dm" => Ok(Self::BotDm),
            "private_channel" => Ok(Self::PrivateChannel),
            other => Err(format!("unknown invocation context `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    String,
    Integer,
    Number,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Attachment,
}

/// A single typed argument of a leaf command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionSpec {
    pub kind: OptionKind,
    pub name: String,
    pub description: String,
    pub required: bool,
    pub autocomplete: bool,
}

impl OptionSpec {
    pub fn new(kind: OptionKind, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            description: description.into(),
            required: false,
            autocomplete: false,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn autocomplete(mut self, autocomplete: bool) -> Self {
        self.autocomplete = autocomplete;
        self
    }
}

/// Everything the registry needs to know about one route besides its path.
/// Built once with [`CommandMeta::builder`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandMeta {
    pub description: String,
    pub options: Vec<OptionSpec>,
    pub contexts: Option<Vec<InvocationContext>>,
    pub nsfw: bool,
    pub default_member_permissions: Option<u64>,
}

impl CommandMeta {
    pub fn builder(description: impl Into<String>) -> CommandMetaBuilder {
        CommandMetaBuilder {
            meta: CommandMeta {
                description: description.into(),
                options: Vec::new(),
                contexts: None,
                nsfw: false,
                default_member_permissions: None,
            },
        }
    }
}

pub struct CommandMetaBuilder {
    meta: CommandMeta,
}

impl CommandMetaBuilder {
    pub fn option(mut self, option: OptionSpec) -> Self {
        self.meta.options.push(option);
        self
    }

    pub fn contexts(mut self, contexts: impl IntoIterator<Item = InvocationContext>) -> Self {
        self.meta.contexts = Some(contexts.into_iter().collect());
        self
    }

    pub fn nsfw(mut self, nsfw: bool) -> Self {
        self.meta.nsfw = nsfw;
        self
    }

    /// Raw permission bits, as in `serenity::model::Permissions::bits()`.
    pub fn default_member_permissions(mut self, bits: u64) -> Self {
        self.meta.default_member_permissions = Some(bits);
        self
    }

    pub fn build(self) -> CommandMeta {
        self.meta
    }
}

#[derive(Clone)]
pub struct Route {
    pub path: RoutePath,
    pub meta: CommandMeta,
    pub handler: Arc<dyn InteractionHandler>,
}

impl Route {
    pub fn new(path: RoutePath, meta: CommandMeta, handler: Arc<dyn InteractionHandler>) -> Self {
        Self {
            path,
            meta,
            handler,
        }
    }

    /// Parse `path` and build a route in one step.
    pub fn parse(
        path: &str,
        meta: CommandMeta,
        handler: Arc<dyn InteractionHandler>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(RoutePath::parse(path)?, meta, handler))
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// Ordered `(path, handler)` pairs. Insertion order is kept so compiled output is stable.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a batch of routes, failing on the first invalid one.
    pub fn from_routes(routes: impl IntoIterator<Item = Route>) -> Result<Self, ConfigError> {
        let mut table = Self::new();
        for route in routes {
            table.upsert(route)?;
        }
        Ok(table)
    }

    /// Insert or replace the route at `route.path`. Returns the replaced route, if any.
    pub fn upsert(&mut self, route: Route) -> Result<Option<Route>, ConfigError> {
        route.path.ensure_depth()?;
        if let Some(slot) = self.routes.iter_mut().find(|r| r.path == route.path) {
            return Ok(Some(std::mem::replace(slot, route)));
        }
        self.routes.push(route);
        Ok(None)
    }

    pub fn remove(&mut self, path: &RoutePath) -> Option<Route> {
        let idx = self.routes.iter().position(|r| &r.path == path)?;
        Some(self.routes.remove(idx))
    }

    /// Look up a route by its dotted dispatch key.
    pub fn get(&self, key: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.path.key() == key)
    }

    /// Distinct root names in first-seen order.
    pub fn roots(&self) -> Vec<String> {
        let mut roots: Vec<String> = Vec::new();
        for route in &self.routes {
            if !roots.iter().any(|r| r == route.path.root()) {
                roots.push(route.path.root().to_string());
            }
        }
        roots
    }

    pub fn routes_for_root<'a>(&'a self, root: &'a str) -> impl Iterator<Item = &'a Route> + 'a {
        self.routes.iter().filter(move |r| r.path.root() == root)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
