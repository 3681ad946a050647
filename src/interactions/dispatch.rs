//! Resolves inbound interactions to handlers.
//!
//! Commands are looked up by `root`, `root.sub` or `root.group.sub`; components and modals by
//! the base id decoded from their custom id. Each handler runs in its own task. If it has not
//! acknowledged the interaction when the grace period ends, the dispatcher logs it and defers on
//! its behalf so the user is not left with a dangling interaction.

use super::components::{ComponentFamily, ComponentRegistry};
use super::ids::PayloadState;
use super::responder::{InteractionResponder, Reply, Responder};
use super::InteractionHandler;
use crate::constants::{
    DEFAULT_GRACE_PERIOD_MS, NOTICE_EXPIRED, NOTICE_FAILED, NOTICE_UNAVAILABLE, ROUTE_SEPARATOR,
};
use crate::error::BotResult;
use crate::routes::RouteTable;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serenity::model::application::{
    CommandDataOption, CommandDataOptionValue, CommandInteraction, ComponentInteraction,
    Interaction, ModalInteraction,
};
use serenity::prelude::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// The routing-relevant part of an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionRoute {
    Command {
        name: String,
        group: Option<String>,
        subcommand: Option<String>,
    },
    Autocomplete {
        name: String,
        group: Option<String>,
        subcommand: Option<String>,
    },
    Component {
        custom_id: String,
    },
    Modal {
        custom_id: String,
    },
}

impl InteractionRoute {
    pub fn command(name: &str, group: Option<&str>, subcommand: Option<&str>) -> Self {
        Self::Command {
            name: name.to_string(),
            group: group.map(str::to_string),
            subcommand: subcommand.map(str::to_string),
        }
    }

    pub fn from_interaction(interaction: &Interaction) -> Option<Self> {
        match interaction {
            Interaction::Command(c) => {
                let (group, subcommand) = subcommand_path(&c.data.options);
                Some(Self::Command {
                    name: c.data.name.clone(),
                    group,
                    subcommand,
                })
            }
            Interaction::Autocomplete(c) => {
                let (group, subcommand) = subcommand_path(&c.data.options);
                Some(Self::Autocomplete {
                    name: c.data.name.clone(),
                    group,
                    subcommand,
                })
            }
            Interaction::Component(c) => Some(Self::Component {
                custom_id: c.data.custom_id.clone(),
            }),
            Interaction::Modal(m) => Some(Self::Modal {
                custom_id: m.data.custom_id.clone(),
            }),
            _ => None,
        }
    }
}

/// `root`, `root.sub` or `root.group.sub`, matching the route path of the handler.
pub fn lookup_key(root: &str, group: Option<&str>, subcommand: Option<&str>) -> String {
    let mut key = root.to_string();
    for part in [group, subcommand].into_iter().flatten() {
        key.push(ROUTE_SEPARATOR);
        key.push_str(part);
    }
    key
}

fn subcommand_path(options: &[CommandDataOption]) -> (Option<String>, Option<String>) {
    match options.first() {
        Some(opt) => match &opt.value {
            CommandDataOptionValue::SubCommandGroup(inner) => {
                (Some(opt.name.clone()), inner.first().map(|o| o.name.clone()))
            }
            CommandDataOptionValue::SubCommand(_) => (None, Some(opt.name.clone())),
            _ => (None, None),
        },
        None => (None, None),
    }
}

/// The serenity context and interaction behind an invocation. Absent when driven from tests.
#[derive(Clone)]
pub struct RawInteraction {
    pub ctx: Context,
    pub interaction: Interaction,
}

/// Everything a handler receives for one interaction.
#[derive(Clone)]
pub struct Invocation {
    /// Route key for commands, base id for components.
    pub key: String,
    pub payload: Option<serde_json::Value>,
    pub responder: Arc<dyn Responder>,
    pub raw: Option<RawInteraction>,
}

impl Invocation {
    pub fn new(key: impl Into<String>, responder: Arc<dyn Responder>) -> Self {
        Self {
            key: key.into(),
            payload: None,
            responder,
            raw: None,
        }
    }

    /// Deserialize the component payload; errors when none was attached.
    pub fn payload_as<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let value = self
            .payload
            .clone()
            .ok_or_else(|| anyhow::anyhow!("interaction `{}` carries no payload", self.key))?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn reply(&self, content: impl Into<String>) -> BotResult<()> {
        self.responder.reply(Reply::new(content)).await
    }

    pub async fn reply_ephemeral(&self, content: impl Into<String>) -> BotResult<()> {
        self.responder.reply(Reply::ephemeral(content)).await
    }

    pub async fn defer(&self) -> BotResult<()> {
        self.responder.defer(false).await
    }

    pub fn context(&self) -> Option<&Context> {
        self.raw.as_ref().map(|r| &r.ctx)
    }

    pub fn command(&self) -> Option<&CommandInteraction> {
        match self.raw.as_ref().map(|r| &r.interaction) {
            Some(Interaction::Command(c)) | Some(Interaction::Autocomplete(c)) => Some(c),
            _ => None,
        }
    }

    pub fn component(&self) -> Option<&ComponentInteraction> {
        match self.raw.as_ref().map(|r| &r.interaction) {
            Some(Interaction::Component(c)) => Some(c),
            _ => None,
        }
    }

    pub fn modal(&self) -> Option<&ModalInteraction> {
        match self.raw.as_ref().map(|r| &r.interaction) {
            Some(Interaction::Modal(m)) => Some(m),
            _ => None,
        }
    }

    /// A string (or partially typed autocomplete) option of the invoked leaf command.
    pub fn option_str(&self, name: &str) -> Option<&str> {
        let cmd = self.command()?;
        leaf_options(&cmd.data.options)
            .iter()
            .find(|o| o.name == name)
            .and_then(|o| match &o.value {
                CommandDataOptionValue::String(s) => Some(s.as_str()),
                CommandDataOptionValue::Autocomplete { value, .. } => Some(value.as_str()),
                _ => None,
            })
    }
}

fn leaf_options(options: &[CommandDataOption]) -> &[CommandDataOption] {
    match options.first().map(|o| &o.value) {
        Some(CommandDataOptionValue::SubCommand(inner)) => inner,
        Some(CommandDataOptionValue::SubCommandGroup(inner)) => leaf_options(inner),
        _ => options,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handler acknowledged in time (or is still running after acknowledging).
    Handled,
    /// Handler did not acknowledge within the grace period; a fallback defer was sent.
    Deferred,
    /// No route or component for the key.
    Unknown,
    /// The component's payload token no longer resolves.
    Expired,
    Failed,
    /// Interaction kind the dispatcher does not route (e.g. ping).
    Ignored,
}

pub struct Dispatcher {
    routes: Arc<RwLock<RouteTable>>,
    components: Arc<ComponentRegistry>,
    grace: Duration,
}

impl Dispatcher {
    pub fn new(routes: Arc<RwLock<RouteTable>>, components: Arc<ComponentRegistry>) -> Self {
        Self {
            routes,
            components,
            grace: Duration::from_millis(DEFAULT_GRACE_PERIOD_MS),
        }
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn grace_period(&self) -> Duration {
        self.grace
    }

    /// Entry point from the serenity event handler.
    pub async fn handle(&self, ctx: Context, interaction: Interaction) -> DispatchOutcome {
        let Some(route) = InteractionRoute::from_interaction(&interaction) else {
            return DispatchOutcome::Ignored;
        };
        let responder: Arc<dyn Responder> =
            match InteractionResponder::for_interaction(ctx.http.clone(), &interaction) {
                Some(r) => Arc::new(r),
                None => Arc::new(Silent),
            };
        let raw = RawInteraction { ctx, interaction };
        self.dispatch(route, responder, Some(raw)).await
    }

    pub async fn dispatch(
        &self,
        route: InteractionRoute,
        responder: Arc<dyn Responder>,
        raw: Option<RawInteraction>,
    ) -> DispatchOutcome {
        match route {
            InteractionRoute::Command {
                name,
                group,
                subcommand,
            } => {
                let key = lookup_key(&name, group.as_deref(), subcommand.as_deref());
                let Some(handler) = self.route_handler(&key).await else {
                    tracing::warn!(target = "dispatch", key = %key, "unknown command");
                    notify(&*responder, NOTICE_UNAVAILABLE).await;
                    return DispatchOutcome::Unknown;
                };
                let inv = Invocation {
                    key,
                    payload: None,
                    responder,
                    raw,
                };
                self.invoke(handler, inv).await
            }
            InteractionRoute::Autocomplete {
                name,
                group,
                subcommand,
            } => {
                let key = lookup_key(&name, group.as_deref(), subcommand.as_deref());
                let Some(handler) = self.route_handler(&key).await else {
                    tracing::debug!(
                        target = "dispatch",
                        key = %key,
                        "autocomplete for unknown command"
                    );
                    return DispatchOutcome::Unknown;
                };
                let inv = Invocation {
                    key: key.clone(),
                    payload: None,
                    responder,
                    raw,
                };
                match handler.autocomplete(inv).await {
                    Ok(()) => DispatchOutcome::Handled,
                    Err(e) => {
                        tracing::error!(
                            target = "dispatch",
                            key = %key,
                            error = ?e,
                            "autocomplete failed"
                        );
                        DispatchOutcome::Failed
                    }
                }
            }
            InteractionRoute::Component { custom_id } => {
                self.dispatch_component(ComponentFamily::Message, &custom_id, responder, raw)
                    .await
            }
            InteractionRoute::Modal { custom_id } => {
                self.dispatch_component(ComponentFamily::Modal, &custom_id, responder, raw)
                    .await
            }
        }
    }

    async fn route_handler(&self, key: &str) -> Option<Arc<dyn InteractionHandler>> {
        self.routes.read().await.get(key).map(|r| r.handler.clone())
    }

    async fn dispatch_component(
        &self,
        family: ComponentFamily,
        custom_id: &str,
        responder: Arc<dyn Responder>,
        raw: Option<RawInteraction>,
    ) -> DispatchOutcome {
        let decoded = match self.components.codec().decode(custom_id).await {
            Ok(d) => d,
            Err(e) => {
                tracing::error!(
                    target = "dispatch",
                    cid = %custom_id,
                    error = ?e,
                    "payload lookup failed"
                );
                notify(&*responder, NOTICE_FAILED).await;
                return DispatchOutcome::Failed;
            }
        };
        let payload = match decoded.payload {
            PayloadState::Expired => {
                tracing::info!(
                    target = "dispatch",
                    base_id = %decoded.base_id,
                    "component payload expired"
                );
                notify(&*responder, NOTICE_EXPIRED).await;
                return DispatchOutcome::Expired;
            }
            PayloadState::Absent => None,
            PayloadState::Present(value) => Some(value),
        };
        let Some(def) = self.components.resolve(family, &decoded.base_id) else {
            tracing::warn!(target = "dispatch", base_id = %decoded.base_id, "unknown component");
            notify(&*responder, NOTICE_UNAVAILABLE).await;
            return DispatchOutcome::Unknown;
        };
        let handler = def.handler.clone();
        let inv = Invocation {
            key: decoded.base_id,
            payload,
            responder,
            raw,
        };
        self.invoke(handler, inv).await
    }

    async fn invoke(
        &self,
        handler: Arc<dyn InteractionHandler>,
        inv: Invocation,
    ) -> DispatchOutcome {
        let responder = inv.responder.clone();
        let key = inv.key.clone();

        let task_responder = responder.clone();
        let task_key = key.clone();
        let mut task = tokio::spawn(async move {
            match handler.run(inv).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(
                        target = "dispatch",
                        key = %task_key,
                        error = ?e,
                        "handler failed"
                    );
                    notify(&*task_responder, NOTICE_FAILED).await;
                    false
                }
            }
        });

        let outcome = match tokio::time::timeout(self.grace, &mut task).await {
            Ok(Ok(true)) => DispatchOutcome::Handled,
            Ok(Ok(false)) => return DispatchOutcome::Failed,
            Ok(Err(join)) => {
                tracing::error!(target = "dispatch", key = %key, error = ?join, "handler panicked");
                notify(&*responder, NOTICE_FAILED).await;
                return DispatchOutcome::Failed;
            }
            // Still running: leave it be.
            Err(_) => DispatchOutcome::Handled,
        };

        if responder.is_acknowledged() {
            return outcome;
        }
        tracing::warn!(
            target = "dispatch",
            key = %key,
            grace = ?self.grace,
            "interaction not acknowledged within grace period; deferring"
        );
        if let Err(e) = responder.defer(true).await {
            tracing::warn!(target = "dispatch", key = %key, error = ?e, "fallback defer failed");
        }
        DispatchOutcome::Deferred
    }
}

async fn notify(responder: &dyn Responder, content: &str) {
    if let Err(e) = responder.notice(content).await {
        tracing::warn!(target = "dispatch", error = ?e, "failed to send notice");
    }
}

/// Responder for interactions that take no message response (autocomplete).
struct Silent;

#[async_trait]
impl Responder for Silent {
    fn is_acknowledged(&self) -> bool {
        true
    }
    async fn reply(&self, _reply: Reply) -> BotResult<()> {
        Ok(())
    }
    async fn update(&self, _reply: Reply) -> BotResult<()> {
        Ok(())
    }
    async fn defer(&self, _ephemeral: bool) -> BotResult<()> {
        Ok(())
    }
    async fn follow_up(&self, _reply: Reply) -> BotResult<()> {
        Ok(())
    }
}
