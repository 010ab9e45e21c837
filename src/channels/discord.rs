//! Discord Channel Implementation
//!
//! Gateway client via serenity. Converts serenity events into
//! `ChannelMessage`/`CommandInvocation`, hands them to the `Dispatcher`, and
//! renders `ChannelResponse`s back into interaction responses.
//!
//! # Configuration
//!
//! Environment variables:
//! - `DISCORD_BOT_TOKEN`: Discord bot token
//!
//! The bot needs the privileged Message Content intent enabled in the
//! developer portal.

use super::traits::*;
use crate::config::Config;
use crate::dispatch::{BotCommand, CommandReply, Dispatcher};
use crate::news::TOPICS;
use async_trait::async_trait;
use serenity::all::{
    ChannelId, Command, CommandInteraction, CommandOptionType, Context, CreateCommand,
    CreateCommandOption, CreateEmbed, CreateEmbedFooter, CreateInteractionResponse,
    CreateInteractionResponseFollowup, CreateInteractionResponseMessage, CreateMessage,
    EventHandler, GatewayIntents, Http, Interaction, Message, MessageId, Ready, Timestamp,
};
use serenity::Client;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Outbound sender backed by serenity's HTTP client
pub struct DiscordChannel {
    http: Arc<Http>,
}

impl DiscordChannel {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

/// Discord snowflakes are non-zero u64s
fn parse_snowflake(id: &str) -> Result<u64, ChannelError> {
    match id.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(ChannelError::InvalidRecipient(id.to_string())),
        Ok(value) => Ok(value),
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    async fn send_reply(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<String, ChannelError> {
        let channel = ChannelId::new(parse_snowflake(channel_id)?);
        let message = MessageId::new(parse_snowflake(message_id)?);

        let builder = CreateMessage::new()
            .content(content)
            .reference_message((channel, message));

        channel
            .send_message(&self.http, builder)
            .await
            .map(|m| m.id.to_string())
            .map_err(|e| ChannelError::SendFailed(e.to_string()))
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<String, ChannelError> {
        let channel = ChannelId::new(parse_snowflake(channel_id)?);

        channel
            .say(&self.http, content)
            .await
            .map(|m| m.id.to_string())
            .map_err(|e| ChannelError::SendFailed(e.to_string()))
    }
}

/// Slash command registrations
pub fn command_definitions() -> Vec<CreateCommand> {
    BotCommand::ALL
        .into_iter()
        .map(|command| {
            let base = CreateCommand::new(command.name()).description(command.description());
            match command {
                BotCommand::Reply => base
                    .add_option(
                        CreateCommandOption::new(
                            CommandOptionType::String,
                            "trigger",
                            "The message that will trigger the auto-reply",
                        )
                        .required(true),
                    )
                    .add_option(CreateCommandOption::new(
                        CommandOptionType::String,
                        "response",
                        "The message the bot will reply with",
                    ))
                    .add_option(
                        CreateCommandOption::new(
                            CommandOptionType::String,
                            "mode",
                            "Add or remove the auto-reply (default: add)",
                        )
                        .add_string_choice("add", "add")
                        .add_string_choice("remove", "remove"),
                    ),
                BotCommand::Analisis => {
                    let topic = TOPICS.iter().fold(
                        CreateCommandOption::new(
                            CommandOptionType::String,
                            "topic",
                            "News topic to fetch",
                        )
                        .required(true),
                        |option, t| option.add_string_choice(t.label, t.key),
                    );
                    base.add_option(topic)
                }
                BotCommand::Convert => base.add_option(
                    CreateCommandOption::new(
                        CommandOptionType::String,
                        "amount_and_currencies",
                        "Amount with source currency and target (e.g., '$500 idr')",
                    )
                    .required(true),
                ),
                BotCommand::ListReplies | BotCommand::HelpReply | BotCommand::Commands => base,
            }
        })
        .collect()
}

/// Render an `Embed` into serenity's builder
fn render_embed(embed: &Embed) -> CreateEmbed {
    let mut builder = CreateEmbed::new().title(&embed.title).colour(embed.color);

    if let Some(description) = &embed.description {
        builder = builder.description(description);
    }
    for field in &embed.fields {
        builder = builder.field(&field.name, &field.value, field.inline);
    }
    if let Some(footer) = &embed.footer {
        builder = builder.footer(CreateEmbedFooter::new(footer));
    }
    if let Some(ts) = embed
        .timestamp
        .and_then(|t| Timestamp::from_unix_timestamp(t.timestamp()).ok())
    {
        builder = builder.timestamp(ts);
    }

    builder
}

fn response_message(response: &ChannelResponse) -> CreateInteractionResponseMessage {
    let mut message = CreateInteractionResponseMessage::new().ephemeral(response.is_ephemeral());
    if let Some(content) = &response.content {
        message = message.content(content);
    }
    if let Some(embed) = &response.embed {
        message = message.embed(render_embed(embed));
    }
    message
}

fn followup_message(response: &ChannelResponse) -> CreateInteractionResponseFollowup {
    let mut message = CreateInteractionResponseFollowup::new().ephemeral(response.is_ephemeral());
    if let Some(content) = &response.content {
        message = message.content(content);
    }
    if let Some(embed) = &response.embed {
        message = message.embed(render_embed(embed));
    }
    message
}

fn to_channel_message(msg: &Message) -> ChannelMessage {
    ChannelMessage {
        id: msg.id.to_string(),
        channel_id: msg.channel_id.to_string(),
        guild_id: msg.guild_id.map(|g| g.to_string()),
        author_id: msg.author.id.to_string(),
        author_is_bot: msg.author.bot,
        content: msg.content.clone(),
    }
}

fn to_invocation(command: &CommandInteraction) -> CommandInvocation {
    let mut invocation = CommandInvocation {
        name: command.data.name.clone(),
        user_id: command.user.id.to_string(),
        guild_id: command.guild_id.map(|g| g.to_string()),
        channel_id: command.channel_id.to_string(),
        ..Default::default()
    };
    for option in &command.data.options {
        if let Some(value) = option.value.as_str() {
            invocation.options.insert(option.name.clone(), value.to_string());
        }
    }
    invocation
}

/// Serenity event handler
pub struct AutoReplyHandler {
    dispatcher: Arc<Dispatcher>,
}

impl AutoReplyHandler {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    async fn answer(&self, ctx: &Context, command: &CommandInteraction, reply: CommandReply) {
        match reply {
            CommandReply::Immediate(response) => {
                if let Err(e) = command
                    .create_response(
                        &ctx.http,
                        CreateInteractionResponse::Message(response_message(&response)),
                    )
                    .await
                {
                    error!("Failed to respond to /{}: {}", command.data.name, e);
                }
            }
            CommandReply::Deferred(pending) => {
                if let Err(e) = command.defer(&ctx.http).await {
                    error!("Failed to defer /{}: {}", command.data.name, e);
                    return;
                }

                let response = self.dispatcher.complete(&pending).await;
                if let Err(e) = command
                    .create_followup(&ctx.http, followup_message(&response))
                    .await
                {
                    error!("Failed to send follow-up for /{}: {}", command.data.name, e);
                }
            }
        }
    }
}

#[async_trait]
impl EventHandler for AutoReplyHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} has connected to Discord!", ready.user.name);
        info!("Bot is in {} guilds", ready.guilds.len());

        match Command::set_global_commands(&ctx.http, command_definitions()).await {
            Ok(commands) => info!("Synced {} command(s)", commands.len()),
            Err(e) => error!("Failed to sync commands: {}", e),
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let message = to_channel_message(&msg);
        let channel = DiscordChannel::new(ctx.http.clone());
        match self.dispatcher.deliver_auto_reply(&channel, &message).await {
            Ok(Some(id)) => debug!("Auto-reply {} sent in {}", id, message.channel_id),
            Ok(None) => {}
            Err(e) => error!("Failed to send auto-reply: {}", e),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };

        let invocation = to_invocation(&command);
        match self.dispatcher.handle_command(&invocation) {
            Some(reply) => self.answer(&ctx, &command, reply).await,
            None => warn!("Unknown command: {}", command.data.name),
        }
    }
}

/// Connect to the gateway and run until the client stops
pub async fn run(config: &Config, dispatcher: Arc<Dispatcher>) -> anyhow::Result<()> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(AutoReplyHandler::new(dispatcher))
        .await?;

    info!("Starting Discord gateway client");
    client.start().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_snowflake() {
        assert_eq!(parse_snowflake("910866740567748628").unwrap(), 910866740567748628);
        assert!(matches!(parse_snowflake("0"), Err(ChannelError::InvalidRecipient(_))));
        assert!(parse_snowflake("general").is_err());
        assert!(parse_snowflake("").is_err());
    }

    #[test]
    fn test_command_definitions_cover_all_commands() {
        assert_eq!(command_definitions().len(), BotCommand::ALL.len());
    }
}
