//! Routes and components shipped with the demo binary.
//! Each module exposes `routes()` / `components()` so `main.rs` can assemble the tables.

pub mod admin;
pub mod ping;
pub mod shop;

use crate::error::ConfigError;
use crate::interactions::{ComponentCodec, ComponentDef};
use crate::routes::{CompileOptions, Route};
use crate::services::cache::PayloadStore;
use std::sync::Arc;

pub fn routes(
    codec: &Arc<ComponentCodec>,
    store: &Arc<PayloadStore>,
) -> Result<Vec<Route>, ConfigError> {
    let mut routes = vec![ping::route()?];
    routes.extend(shop::routes(codec)?);
    routes.extend(admin::routes(store)?);
    Ok(routes)
}

pub fn components() -> Vec<ComponentDef> {
    shop::components()
}

/// Descriptions for roots and groups that have no executable route of their own.
pub fn compile_options(base: CompileOptions) -> CompileOptions {
    base.with_description("shop", "Browse and buy items.")
        .with_description("admin", "Maintenance utilities (admin only).")
        .with_description("admin.cache", "Component payload cache.")
}
