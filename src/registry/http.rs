//! `RemoteRegistry` over serenity's HTTP client, and compiled-schema to `CreateCommand` conversion.

use super::{RegisteredCommand, RegistryScope, RemoteRegistry};
use crate::error::RegistryError;
use crate::routes::{CompiledCommand, InvocationContext, LeafSchema, OptionKind, OptionSpec};
use async_trait::async_trait;
use serenity::builder::{CreateCommand, CreateCommandOption};
use serenity::http::{Http, HttpError};
use serenity::model::application::{Command, CommandOptionType, InteractionContext};
use serenity::model::id::CommandId;
use serenity::model::permissions::Permissions;
use std::sync::Arc;

pub struct HttpRegistry {
    http: Arc<Http>,
}

impl HttpRegistry {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

/// 404s (unknown guild, unknown command) are the only errors sync tolerates.
fn classify(err: serenity::Error) -> RegistryError {
    if let serenity::Error::Http(HttpError::UnsuccessfulRequest(resp)) = &err
        && resp.status_code.as_u16() == 404
    {
        return RegistryError::NotFound;
    }
    RegistryError::Http(err)
}

fn registered(cmd: Command) -> RegisteredCommand {
    RegisteredCommand {
        name: cmd.name,
        id: cmd.id,
    }
}

#[async_trait]
impl RemoteRegistry for HttpRegistry {
    async fn fetch(&self, scope: RegistryScope) -> Result<Vec<RegisteredCommand>, RegistryError> {
        let commands = match scope {
            RegistryScope::Global => Command::get_global_commands(&*self.http).await,
            RegistryScope::Guild(guild) => guild.get_commands(&*self.http).await,
        }
        .map_err(classify)?;
        Ok(commands.into_iter().map(registered).collect())
    }

    async fn create(
        &self,
        command: &CompiledCommand,
        scope: RegistryScope,
    ) -> Result<RegisteredCommand, RegistryError> {
        let builder = to_create_command(command);
        let created = match scope {
            RegistryScope::Global => Command::create_global_command(&*self.http, builder).await,
            RegistryScope::Guild(guild) => guild.create_command(&*self.http, builder).await,
        }
        .map_err(classify)?;
        Ok(registered(created))
    }

    async fn edit(
        &self,
        id: CommandId,
        command: &CompiledCommand,
        scope: RegistryScope,
    ) -> Result<RegisteredCommand, RegistryError> {
        let builder = to_create_command(command);
        let edited = match scope {
            RegistryScope::Global => Command::edit_global_command(&*self.http, id, builder).await,
            RegistryScope::Guild(guild) => guild.edit_command(&*self.http, id, builder).await,
        }
        .map_err(classify)?;
        Ok(registered(edited))
    }

    async fn delete(&self, id: CommandId, scope: RegistryScope) -> Result<(), RegistryError> {
        match scope {
            RegistryScope::Global => Command::delete_global_command(&*self.http, id).await,
            RegistryScope::Guild(guild) => guild.delete_command(&*self.http, id).await,
        }
        .map_err(classify)
    }

    async fn set_all(
        &self,
        commands: &[CompiledCommand],
        scope: RegistryScope,
    ) -> Result<Vec<RegisteredCommand>, RegistryError> {
        let builders: Vec<CreateCommand> = commands.iter().map(to_create_command).collect();
        let stored = match scope {
            RegistryScope::Global => Command::set_global_commands(&*self.http, builders).await,
            RegistryScope::Guild(guild) => guild.set_commands(&*self.http, builders).await,
        }
        .map_err(classify)?;
        Ok(stored.into_iter().map(registered).collect())
    }
}

pub fn to_create_command(cmd: &CompiledCommand) -> CreateCommand {
    let mut builder = CreateCommand::new(&cmd.name).description(&cmd.description);
    for option in &cmd.options {
        builder = builder.add_option(to_option(option));
    }
    for (name, leaf) in &cmd.subcommands {
        builder = builder.add_option(to_subcommand(name, leaf));
    }
    for (name, group) in &cmd.groups {
        let mut opt = CreateCommandOption::new(
            CommandOptionType::SubCommandGroup,
            name,
            &group.description,
        );
        for (sub, leaf) in &group.subcommands {
            opt = opt.add_sub_option(to_subcommand(sub, leaf));
        }
        builder = builder.add_option(opt);
    }
    if let Some(contexts) = &cmd.contexts {
        builder = builder.contexts(contexts.iter().map(|c| to_context(*c)).collect());
    }
    if cmd.nsfw {
        builder = builder.nsfw(true);
    }
    if let Some(bits) = cmd.default_member_permissions {
        builder = builder.default_member_permissions(Permissions::from_bits_truncate(bits));
    }
    builder
}

fn to_subcommand(name: &str, leaf: &LeafSchema) -> CreateCommandOption {
    let mut opt = CreateCommandOption::new(CommandOptionType::SubCommand, name, &leaf.description);
    for option in &leaf.options {
        opt = opt.add_sub_option(to_option(option));
    }
    opt
}

fn to_option(option: &OptionSpec) -> CreateCommandOption {
    let kind = match option.kind {
        OptionKind::String => CommandOptionType::String,
        OptionKind::Integer => CommandOptionType::Integer,
        OptionKind::Number => CommandOptionType::Number,
        OptionKind::Boolean => CommandOptionType::Boolean,
        OptionKind::User => CommandOptionType::User,
        OptionKind::Channel => CommandOptionType::Channel,
        OptionKind::Role => CommandOptionType::Role,
        OptionKind::Mentionable => CommandOptionType::Mentionable,
        OptionKind::Attachment => CommandOptionType::Attachment,
    };
    CreateCommandOption::new(kind, &option.name, &option.description)
        .required(option.required)
        .set_autocomplete(option.autocomplete)
}

fn to_context(context: InvocationContext) -> InteractionContext {
    match context {
        InvocationContext::Guild => InteractionContext::Guild,
        InvocationContext::BotDm => InteractionContext::BotDm,
        InvocationContext::PrivateChannel => InteractionContext::PrivateChannel,
    }
}
