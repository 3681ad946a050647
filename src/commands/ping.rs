use crate::error::ConfigError;
use crate::interactions::{Invocation, handler_fn};
use crate::model::ShardManagerContainer;
use crate::routes::{CommandMeta, Route};
use serenity::prelude::Context;

pub fn route() -> Result<Route, ConfigError> {
    Route::parse(
        "ping",
        CommandMeta::builder("Check the bot's heartbeat latency.").build(),
        handler_fn(run),
    )
}

async fn run(inv: Invocation) -> anyhow::Result<()> {
    let latency = match inv.context() {
        Some(ctx) => heartbeat_latency(ctx).await,
        None => None,
    };
    let response = format!(
        "Pong! Heartbeat Latency: `{}`",
        latency.unwrap_or_else(|| "N/A".to_string())
    );
    inv.reply(response).await?;
    Ok(())
}

async fn heartbeat_latency(ctx: &Context) -> Option<String> {
    let data = ctx.data.read().await;
    let shard_manager = data.get::<ShardManagerContainer>()?;
    let runners = shard_manager.runners.lock().await;
    let runner = runners.get(&ctx.shard_id)?;
    runner.latency.map(|l| format!("{} ms", l.as_millis()))
}
