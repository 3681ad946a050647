use std::sync::Arc;

use serenity::model::gateway::GatewayIntents;
use serenity::prelude::*;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use slashkit::config::BotConfig;
use slashkit::database::payloads::{PgPayloadBackend, ensure_schema};
use slashkit::handler::Handler;
use slashkit::interactions::{ComponentCodec, ComponentRegistry};
use slashkit::model::{AppState, ShardManagerContainer};
use slashkit::registry::{HttpRegistry, RegistryScope, Synchronizer};
use slashkit::routes::{CompileOptions, RouteTable};
use slashkit::services::cache::{PayloadBackend, PayloadStore, spawn_sweeper};
use slashkit::{commands, services::cache::MemoryBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = BotConfig::from_env()?;

    let backend: Arc<dyn PayloadBackend> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
            ensure_schema(&pool).await?;
            tracing::info!(target = "startup", "using postgres payload store");
            Arc::new(PgPayloadBackend::new(pool))
        }
        None => {
            tracing::info!(target = "startup", "using in-memory payload store");
            Arc::new(MemoryBackend::new())
        }
    };
    let payloads =
        Arc::new(PayloadStore::new(backend).with_default_ttl(config.payload_ttl_minutes));
    let codec = Arc::new(ComponentCodec::new(payloads.clone()));

    let mut components = ComponentRegistry::new(codec.clone());
    components.register_all(commands::components())?;
    let routes = RouteTable::from_routes(commands::routes(&codec, &payloads)?)?;

    let mut compile = CompileOptions::new();
    if let Some(contexts) = config.default_contexts.clone() {
        compile = compile.with_default_contexts(contexts);
    }
    let compile = commands::compile_options(compile);

    // GUILDS is enough to receive interactions.
    let intents = GatewayIntents::GUILDS;
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(Handler)
        .await?;

    let synchronizer = Synchronizer::new(
        Arc::new(HttpRegistry::new(client.http.clone())),
        RegistryScope::from_guilds(&config.guild_ids),
        compile,
    );
    let app_state = Arc::new(AppState::new(
        routes,
        components,
        synchronizer,
        config.grace_period,
    ));

    if !config.sweep_interval.is_zero() {
        spawn_sweeper(payloads.clone(), config.sweep_interval);
    }

    {
        let mut data = client.data.write().await;
        data.insert::<ShardManagerContainer>(client.shard_manager.clone());
        data.insert::<AppState>(app_state);
    }

    if let Err(why) = client.start().await {
        tracing::error!(target = "startup", error = ?why, "client error");
    }
    Ok(())
}
