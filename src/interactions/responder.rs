//! Response helpers that remember whether the interaction has been acknowledged.
//!
//! The platform accepts exactly one primary response per interaction. Everything after that
//! must be a follow-up, so the responder routes late replies there instead of failing.
use crate::error::BotResult;
use async_trait::async_trait;
use serenity::builder::{
    CreateActionRow, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage,
};
use serenity::http::Http;
use serenity::model::application::{
    CommandInteraction, ComponentInteraction, Interaction, ModalInteraction,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Default)]
pub struct Reply {
    pub content: String,
    pub ephemeral: bool,
    pub components: Vec<CreateActionRow>,
}

impl Reply {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
            components: Vec::new(),
        }
    }

    pub fn components(mut self, rows: Vec<CreateActionRow>) -> Self {
        self.components = rows;
        self
    }

    fn message(&self) -> CreateInteractionResponseMessage {
        CreateInteractionResponseMessage::new()
            .content(&self.content)
            .ephemeral(self.ephemeral)
            .components(self.components.clone())
    }

    fn followup(&self) -> CreateInteractionResponseFollowup {
        CreateInteractionResponseFollowup::new()
            .content(&self.content)
            .ephemeral(self.ephemeral)
            .components(self.components.clone())
    }
}

#[async_trait]
pub trait Responder: Send + Sync {
    fn is_acknowledged(&self) -> bool;

    /// Primary response. Falls back to a follow-up when already acknowledged.
    async fn reply(&self, reply: Reply) -> BotResult<()>;

    /// Replace the message a component is attached to. Behaves like `reply` for commands.
    async fn update(&self, reply: Reply) -> BotResult<()>;

    /// Acknowledge without content yet. No-op when already acknowledged.
    async fn defer(&self, ephemeral: bool) -> BotResult<()>;

    async fn follow_up(&self, reply: Reply) -> BotResult<()>;

    /// Ephemeral notice through whichever channel is still open.
    async fn notice(&self, content: &str) -> BotResult<()> {
        if self.is_acknowledged() {
            self.follow_up(Reply::ephemeral(content)).await
        } else {
            self.reply(Reply::ephemeral(content)).await
        }
    }
}

enum Target {
    Command(CommandInteraction),
    Component(ComponentInteraction),
    Modal(ModalInteraction),
}

/// [`Responder`] backed by a live serenity interaction.
pub struct InteractionResponder {
    http: Arc<Http>,
    target: Target,
    acknowledged: AtomicBool,
}

impl InteractionResponder {
    /// `None` for interaction kinds that take no message response (ping, autocomplete).
    pub fn for_interaction(http: Arc<Http>, interaction: &Interaction) -> Option<Self> {
        let target = match interaction {
            Interaction::Command(c) => Target::Command(c.clone()),
            Interaction::Component(c) => Target::Component(c.clone()),
            Interaction::Modal(m) => Target::Modal(m.clone()),
            _ => return None,
        };
        Some(Self {
            http,
            target,
            acknowledged: AtomicBool::new(false),
        })
    }

    /// Claim the single primary response. Returns false when it is already taken.
    fn claim(&self) -> bool {
        self.acknowledged
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    async fn respond(&self, builder: CreateInteractionResponse) -> BotResult<()> {
        let http = &*self.http;
        let res = match &self.target {
            Target::Command(c) => c.create_response(http, builder).await,
            Target::Component(c) => c.create_response(http, builder).await,
            Target::Modal(m) => m.create_response(http, builder).await,
        };
        if let Err(e) = res {
            self.acknowledged.store(false, Ordering::SeqCst);
            tracing::error!(target = "ui.respond", error = ?e, "create_response failed");
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl Responder for InteractionResponder {
    fn is_acknowledged(&self) -> bool {
        self.acknowledged.load(Ordering::SeqCst)
    }

    async fn reply(&self, reply: Reply) -> BotResult<()> {
        if !self.claim() {
            return self.follow_up(reply).await;
        }
        self.respond(CreateInteractionResponse::Message(reply.message()))
            .await
    }

    async fn update(&self, reply: Reply) -> BotResult<()> {
        if !matches!(self.target, Target::Component(_)) {
            return self.reply(reply).await;
        }
        if !self.claim() {
            return self.follow_up(reply).await;
        }
        self.respond(CreateInteractionResponse::UpdateMessage(reply.message()))
            .await
    }

    async fn defer(&self, ephemeral: bool) -> BotResult<()> {
        if !self.claim() {
            return Ok(());
        }
        let builder = match self.target {
            Target::Component(_) => CreateInteractionResponse::Acknowledge,
            _ => CreateInteractionResponse::Defer(
                CreateInteractionResponseMessage::new().ephemeral(ephemeral),
            ),
        };
        self.respond(builder).await
    }

    async fn follow_up(&self, reply: Reply) -> BotResult<()> {
        let http = &*self.http;
        let builder = reply.followup();
        let res = match &self.target {
            Target::Command(c) => c.create_followup(http, builder).await,
            Target::Component(c) => c.create_followup(http, builder).await,
            Target::Modal(m) => m.create_followup(http, builder).await,
        };
        if let Err(e) = res {
            tracing::error!(target = "ui.respond", error = ?e, "create_followup failed");
            return Err(e.into());
        }
        Ok(())
    }
}
