//! Compiles the flat route table into the hierarchical command schema the registry expects.
//!
//! Routes are grouped by root, then by depth:
//! - depth 1 (`shop`) is the root's own executable leaf;
//! - depth 2 (`shop.buy`) becomes a subcommand;
//! - depth 3 (`admin.cache.stats`) becomes a subcommand inside a group.
//!
//! A root that has children cannot also be executable, so its depth-1 route is dropped
//! (with a warning) and the tree still compiles. Compilation is always wholesale per root.

use super::{InvocationContext, OptionSpec, Route, RouteTable};
use crate::constants::{PLACEHOLDER_DESCRIPTION, ROUTE_SEPARATOR};
use crate::error::ConfigError;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeafSchema {
    pub description: String,
    pub options: Vec<OptionSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSchema {
    pub description: String,
    pub subcommands: BTreeMap<String, LeafSchema>,
}

/// One root command, ready to be sent to the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledCommand {
    pub name: String,
    pub description: String,
    /// Options of the root itself; only non-empty for an executable root.
    pub options: Vec<OptionSpec>,
    pub contexts: Option<Vec<InvocationContext>>,
    pub nsfw: bool,
    pub default_member_permissions: Option<u64>,
    pub subcommands: BTreeMap<String, LeafSchema>,
    pub groups: BTreeMap<String, GroupSchema>,
}

impl CompiledCommand {
    /// True when the root is invoked directly rather than through a subcommand.
    pub fn is_executable(&self) -> bool {
        self.subcommands.is_empty() && self.groups.is_empty()
    }
}

/// Knobs shared by every compilation run.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    default_contexts: Option<Vec<InvocationContext>>,
    /// Descriptions for roots and groups keyed by dotted prefix (`admin`, `admin.cache`).
    descriptions: HashMap<String, String>,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contexts applied to roots whose routes never name any. An empty list is a no-op.
    pub fn with_default_contexts(mut self, contexts: Vec<InvocationContext>) -> Self {
        if contexts.is_empty() {
            tracing::warn!(
                target = "routes.compile",
                "default invocation contexts configured but empty; ignoring"
            );
            self.default_contexts = None;
        } else {
            self.default_contexts = Some(contexts);
        }
        self
    }

    pub fn with_description(
        mut self,
        prefix: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.descriptions.insert(prefix.into(), description.into());
        self
    }

    pub fn default_contexts(&self) -> Option<&[InvocationContext]> {
        self.default_contexts.as_deref()
    }

    fn description_for(&self, prefix: &str) -> String {
        self.descriptions
            .get(prefix)
            .cloned()
            .unwrap_or_else(|| PLACEHOLDER_DESCRIPTION.to_string())
    }
}

/// Compile every root in the table, in first-seen root order.
pub fn compile_all(
    table: &RouteTable,
    opts: &CompileOptions,
) -> Result<Vec<CompiledCommand>, ConfigError> {
    let mut out = Vec::new();
    for root in table.roots() {
        if let Some(cmd) = compile_root(table, &root, opts)? {
            out.push(cmd);
        }
    }
    Ok(out)
}

/// Compile the routes under `root`. `None` means the root no longer has any routes.
pub fn compile_root(
    table: &RouteTable,
    root: &str,
    opts: &CompileOptions,
) -> Result<Option<CompiledCommand>, ConfigError> {
    compile_routes(root, table.routes_for_root(root), opts)
}

/// Compile an arbitrary set of routes sharing `root`. Routes with another root are ignored.
pub fn compile_routes<'a>(
    root: &str,
    routes: impl IntoIterator<Item = &'a Route>,
    opts: &CompileOptions,
) -> Result<Option<CompiledCommand>, ConfigError> {
    let routes: Vec<&Route> = routes
        .into_iter()
        .filter(|r| r.path.root() == root)
        .collect();
    for route in &routes {
        route.path.ensure_depth()?;
    }
    if routes.is_empty() {
        return Ok(None);
    }

    let has_children = routes.iter().any(|r| r.path.depth() > 1);
    let leaf = routes.iter().find(|r| r.path.depth() == 1).copied();
    if has_children && let Some(dropped) = leaf {
        tracing::warn!(
            target = "routes.compile",
            root = %root,
            route = %dropped.path,
            "root has subcommands; its own executable route is not registered"
        );
    }
    let included: Vec<&Route> = routes
        .iter()
        .copied()
        .filter(|r| !(has_children && r.path.depth() == 1))
        .collect();

    let mut cmd = CompiledCommand {
        name: root.to_string(),
        description: opts.description_for(root),
        options: Vec::new(),
        contexts: None,
        nsfw: false,
        default_member_permissions: None,
        subcommands: BTreeMap::new(),
        groups: BTreeMap::new(),
    };

    for route in &included {
        let seg = route.path.segments();
        let schema = LeafSchema {
            description: route.meta.description.clone(),
            options: route.meta.options.clone(),
        };
        match seg.len() {
            1 => {
                cmd.description = schema.description;
                cmd.options = schema.options;
            }
            2 => {
                cmd.subcommands.insert(seg[1].clone(), schema);
            }
            _ => {
                let prefix = format!("{}{}{}", seg[0], ROUTE_SEPARATOR, seg[1]);
                cmd.groups
                    .entry(seg[1].clone())
                    .or_insert_with(|| GroupSchema {
                        description: opts.description_for(&prefix),
                        subcommands: BTreeMap::new(),
                    })
                    .subcommands
                    .insert(seg[2].clone(), schema);
            }
        }
        cmd.nsfw |= route.meta.nsfw;
        if cmd.default_member_permissions.is_none() {
            cmd.default_member_permissions = route.meta.default_member_permissions;
        }
    }

    let mut explicit: Vec<InvocationContext> = Vec::new();
    let mut any_explicit = false;
    for route in &included {
        if let Some(contexts) = &route.meta.contexts {
            any_explicit = true;
            for c in contexts {
                if !explicit.contains(c) {
                    explicit.push(*c);
                }
            }
        }
    }
    cmd.contexts = if any_explicit {
        Some(explicit)
    } else {
        opts.default_contexts().map(<[InvocationContext]>::to_vec)
    };

    Ok(Some(cmd))
}
