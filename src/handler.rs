use crate::AppState;
use serenity::async_trait;
use serenity::client::Context;
use serenity::model::application::Interaction;
use serenity::model::gateway::Ready;
use serenity::prelude::EventHandler;

pub struct Handler;

#[async_trait]
impl EventHandler for Handler {
    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Some(app_state) = AppState::from_ctx(&ctx).await else {
            tracing::error!(target = "handler", "missing AppState in TypeMap");
            return;
        };
        let outcome = app_state.dispatcher.handle(ctx, interaction).await;
        tracing::debug!(target = "handler", ?outcome, "interaction dispatched");
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!(target = "handler", user = %ready.user.name, "connected and ready");
        let Some(app_state) = AppState::from_ctx(&ctx).await else {
            tracing::error!(target = "handler", "missing AppState in TypeMap");
            return;
        };
        match app_state.deploy().await {
            Ok(()) => tracing::info!(target = "handler", "registered application commands"),
            Err(e) => {
                tracing::error!(
                    target = "handler",
                    error = ?e,
                    "failed to register commands"
                );
            }
        }
    }
}
