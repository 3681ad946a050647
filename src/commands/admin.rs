// `/admin cache stats` and `/admin cache sweep`: inspect and prune the component payload store.
use crate::error::ConfigError;
use crate::interactions::{InteractionHandler, Invocation};
use crate::routes::{CommandMeta, InvocationContext, Route};
use crate::services::cache::PayloadStore;
use async_trait::async_trait;
use serenity::model::permissions::Permissions;
use std::sync::Arc;

pub fn routes(store: &Arc<PayloadStore>) -> Result<Vec<Route>, ConfigError> {
    let meta = |description: &str| {
        CommandMeta::builder(description)
            .contexts([InvocationContext::Guild])
            .default_member_permissions(Permissions::ADMINISTRATOR.bits())
            .build()
    };
    Ok(vec![
        Route::parse(
            "admin.cache.stats",
            meta("Show payload cache hit/miss counters"),
            Arc::new(CacheStatsCmd {
                store: store.clone(),
            }),
        )?,
        Route::parse(
            "admin.cache.sweep",
            meta("Remove expired component payloads now"),
            Arc::new(CacheSweepCmd {
                store: store.clone(),
            }),
        )?,
    ])
}

struct CacheStatsCmd {
    store: Arc<PayloadStore>,
}

#[async_trait]
impl InteractionHandler for CacheStatsCmd {
    async fn run(&self, inv: Invocation) -> anyhow::Result<()> {
        let stats = self.store.stats();
        inv.reply_ephemeral(format!(
            "Payload cache: {} hits, {} misses ({} expired). Default TTL {} min.",
            stats.hits,
            stats.misses,
            stats.expired,
            self.store.default_ttl_minutes()
        ))
        .await?;
        Ok(())
    }
}

struct CacheSweepCmd {
    store: Arc<PayloadStore>,
}

#[async_trait]
impl InteractionHandler for CacheSweepCmd {
    async fn run(&self, inv: Invocation) -> anyhow::Result<()> {
        // Sweeping a database-backed store can be slow.
        inv.responder.defer(true).await?;
        let removed = self.store.sweep().await?;
        inv.reply_ephemeral(format!("Removed {removed} expired payload(s)."))
            .await?;
        Ok(())
    }
}
