//! Shared state for one bot instance.
//! `Arc<AppState>` is stored in serenity's `TypeMap` so the event handler and commands can
//! reach it.

use crate::error::BotResult;
use crate::interactions::{ComponentRegistry, Dispatcher};
use crate::registry::Synchronizer;
use crate::routes::{Route, RoutePath, RouteTable};
use crate::services::cache::PayloadStore;
use serenity::gateway::ShardManager;
use serenity::prelude::TypeMapKey;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// A container for the ShardManager, allowing it to be stored in the global context.
pub struct ShardManagerContainer;

impl TypeMapKey for ShardManagerContainer {
    type Value = Arc<ShardManager>;
}

pub struct AppState {
    /// Live routes. The dispatcher reads them on every command.
    pub routes: Arc<RwLock<RouteTable>>,
    pub components: Arc<ComponentRegistry>,
    pub payloads: Arc<PayloadStore>,
    pub dispatcher: Arc<Dispatcher>,
    pub synchronizer: Arc<Synchronizer>,
    // Serializes route changes and deploys so their syncs cannot interleave.
    route_changes: Mutex<()>,
}

impl AppState {
    pub fn new(
        routes: RouteTable,
        components: ComponentRegistry,
        synchronizer: Synchronizer,
        grace_period: Duration,
    ) -> Self {
        let routes = Arc::new(RwLock::new(routes));
        let components = Arc::new(components);
        let payloads = components.codec().store().clone();
        let dispatcher = Arc::new(
            Dispatcher::new(routes.clone(), components.clone()).with_grace_period(grace_period),
        );
        Self {
            routes,
            components,
            payloads,
            dispatcher,
            synchronizer: Arc::new(synchronizer),
            route_changes: Mutex::new(()),
        }
    }

    pub async fn from_ctx(ctx: &serenity::prelude::Context) -> Option<Arc<Self>> {
        ctx.data.read().await.get::<AppState>().cloned()
    }

    /// Push the whole route table to every scope. Waits for any route change in flight.
    pub async fn deploy(&self) -> BotResult<()> {
        let _serial = self.route_changes.lock().await;
        let table = self.routes.read().await.clone();
        self.synchronizer.deploy(&table).await
    }

    /// Add or replace one route. The table only changes once the registry accepted it.
    pub async fn upsert_route(&self, route: Route) -> BotResult<()> {
        let _serial = self.route_changes.lock().await;
        let root = route.path.root().to_string();
        let mut candidate = self.routes.read().await.clone();
        candidate.upsert(route)?;
        self.synchronizer.apply_root(&candidate, &root).await?;
        *self.routes.write().await = candidate;
        tracing::info!(target = "routes", root = %root, "route change applied");
        Ok(())
    }

    /// Remove one route, deleting or shrinking its root command remotely. Returns false if absent.
    pub async fn remove_route(&self, path: &RoutePath) -> BotResult<bool> {
        let _serial = self.route_changes.lock().await;
        let mut candidate = self.routes.read().await.clone();
        if candidate.remove(path).is_none() {
            return Ok(false);
        }
        self.synchronizer.apply_root(&candidate, path.root()).await?;
        *self.routes.write().await = candidate;
        tracing::info!(target = "routes", route = %path, "route removed");
        Ok(true)
    }
}

impl TypeMapKey for AppState {
    type Value = Arc<AppState>;
}
