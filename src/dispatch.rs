//! Event dispatch
//!
//! Turns inbound messages and slash-command invocations into rule manager,
//! news and currency calls, and builds platform-neutral responses. Commands
//! that hit the network validate first and return `CommandReply::Deferred`
//! so the adapter can acknowledge the interaction before the slow part.

use crate::channels::{
    Channel, ChannelError, ChannelMessage, ChannelResponse, CommandInvocation, Embed, Visibility,
};
use crate::config::Config;
use crate::currency::{ConversionQuery, ExchangeRateClient, CONVERT_EXAMPLES};
use crate::news::{self, NewsClient, Topic, TOPICS};
use crate::replies::{OutcomeKind, RuleManager, RuleOutcome, MAX_TRIGGER_CHARS};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const COLOR_SUCCESS: u32 = 0x00ff00;
const COLOR_LIST: u32 = 0x3498db;
const COLOR_HELP: u32 = 0x9b59b6;
const COLOR_NEWS: u32 = 0x1f8b4c;
const COLOR_CURRENCY: u32 = 0x2ecc71;

/// Discord caps embeds at 25 fields
const MAX_EMBED_FIELDS: usize = 25;

/// Per-rule text shown by `/list_replies`; 25 full fields must stay under
/// Discord's 6000-character embed total
const LIST_TRIGGER_CHARS: usize = 64;
const LIST_RESPONSE_CHARS: usize = 100;

/// Discord caps embed descriptions at 4096 characters
const CONFIRM_TRIGGER_CHARS: usize = MAX_TRIGGER_CHARS;
const CONFIRM_RESPONSE_CHARS: usize = 3000;

const DM_ONLY_ERROR: &str = "Auto-reply commands only work in servers, not in DMs!";

/// Slash commands the bot answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Reply,
    ListReplies,
    HelpReply,
    Commands,
    Analisis,
    Convert,
}

impl BotCommand {
    pub const ALL: [BotCommand; 6] = [
        BotCommand::Reply,
        BotCommand::ListReplies,
        BotCommand::HelpReply,
        BotCommand::Analisis,
        BotCommand::Commands,
        BotCommand::Convert,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Reply => "reply",
            Self::ListReplies => "list_replies",
            Self::HelpReply => "help_reply",
            Self::Commands => "commands",
            Self::Analisis => "analisis",
            Self::Convert => "convert",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Reply => "Set up auto-reply for specific messages",
            Self::ListReplies => "List the auto-reply rules of this server",
            Self::HelpReply => "Show help information for the auto-reply bot",
            Self::Commands => "Show all available bot commands",
            Self::Analisis => "Fetch latest news and analysis from Investing.com",
            Self::Convert => "Convert currency amounts between different currencies",
        }
    }
}

/// `/reply` mode option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMode {
    Add,
    Remove,
}

impl ReplyMode {
    /// Absent means `Add`; unknown values are rejected
    pub fn parse(value: Option<&str>) -> Option<Self> {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            None | Some("") | Some("add") => Some(Self::Add),
            Some("remove") => Some(Self::Remove),
            Some(_) => None,
        }
    }
}

/// Network work left after validation
#[derive(Debug, Clone, PartialEq)]
pub enum PendingCommand {
    News(&'static Topic),
    Convert(ConversionQuery),
}

/// How the adapter should answer an invocation
#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    Immediate(ChannelResponse),
    /// Acknowledge now, then send `Dispatcher::complete`'s result
    Deferred(PendingCommand),
}

/// Where `/analisis` may be used
#[derive(Debug, Clone, Default)]
pub struct NewsRestriction {
    pub guild_id: Option<String>,
    pub channel_id: Option<String>,
}

/// Routes platform events to the bot's features
pub struct Dispatcher {
    rules: Arc<RuleManager>,
    news: NewsClient,
    currency: ExchangeRateClient,
    restriction: NewsRestriction,
}

impl Dispatcher {
    pub fn new(
        rules: Arc<RuleManager>,
        news: NewsClient,
        currency: ExchangeRateClient,
        restriction: NewsRestriction,
    ) -> Self {
        Self {
            rules,
            news,
            currency,
            restriction,
        }
    }

    /// Build clients from configuration
    pub fn from_config(config: &Config, rules: Arc<RuleManager>) -> Self {
        let timeout = Duration::from_secs(config.http_timeout_secs);
        let currency = ExchangeRateClient::new(
            &config.exchange_base_url,
            config.exchange_api_key.as_deref(),
            timeout,
        );
        if !currency.is_available() {
            warn!("EXCHANGERATE_API_KEY not set - /convert will fail");
        }

        Self::new(
            rules,
            NewsClient::new(&config.news_base_url, timeout),
            currency,
            NewsRestriction {
                guild_id: config.analisis_guild_id.clone(),
                channel_id: config.analisis_channel_id.clone(),
            },
        )
    }

    pub fn rules(&self) -> &Arc<RuleManager> {
        &self.rules
    }

    /// Response text for `message`, if any rule fires
    pub fn auto_reply(&self, message: &ChannelMessage) -> Option<String> {
        if message.author_is_bot {
            return None;
        }
        let guild_id = message.guild_id.as_deref()?;
        self.rules.reply_for(guild_id, &message.content)
    }

    /// Send the auto-reply for `message`, falling back to a plain message
    /// when the threaded reply fails. Returns the sent message ID.
    pub async fn deliver_auto_reply(
        &self,
        channel: &dyn Channel,
        message: &ChannelMessage,
    ) -> Result<Option<String>, ChannelError> {
        let Some(response) = self.auto_reply(message) else {
            return Ok(None);
        };

        debug!(
            "Auto-reply triggered in {} channel {}",
            channel.name(),
            message.channel_id
        );
        match channel
            .send_reply(&message.channel_id, &message.id, &response)
            .await
        {
            Ok(id) => Ok(Some(id)),
            Err(e) => {
                warn!("Error sending auto-reply: {} (falling back to plain message)", e);
                channel
                    .send_message(&message.channel_id, &response)
                    .await
                    .map(Some)
            }
        }
    }

    /// Handle an invocation; `None` for commands this bot doesn't know
    pub fn handle_command(&self, invocation: &CommandInvocation) -> Option<CommandReply> {
        let command = BotCommand::from_name(&invocation.name)?;
        info!(
            "Command /{} from user {} in {:?}",
            command.name(),
            invocation.user_id,
            invocation.guild_id
        );

        let reply = match command {
            BotCommand::Reply => CommandReply::Immediate(self.reply_command(invocation)),
            BotCommand::ListReplies => CommandReply::Immediate(self.list_command(invocation)),
            BotCommand::HelpReply => CommandReply::Immediate(help_response()),
            BotCommand::Commands => CommandReply::Immediate(commands_response()),
            BotCommand::Analisis => self.analisis_command(invocation),
            BotCommand::Convert => convert_command(invocation),
        };
        Some(reply)
    }

    /// Run the network part of a deferred command.
    ///
    /// The adapter sends this as a follow-up to a public defer, so the
    /// platform shows it publicly whatever `visibility` says.
    pub async fn complete(&self, pending: &PendingCommand) -> ChannelResponse {
        match pending {
            PendingCommand::News(topic) => self.news_response(topic).await,
            PendingCommand::Convert(query) => self.convert_response(query).await,
        }
    }

    /// Convenience for callers that don't defer
    pub async fn respond(&self, invocation: &CommandInvocation) -> Option<ChannelResponse> {
        match self.handle_command(invocation)? {
            CommandReply::Immediate(response) => Some(response),
            CommandReply::Deferred(pending) => Some(self.complete(&pending).await),
        }
    }

    fn reply_command(&self, invocation: &CommandInvocation) -> ChannelResponse {
        let Some(guild_id) = invocation.guild_id.as_deref() else {
            return ChannelResponse::error(DM_ONLY_ERROR);
        };
        let Some(trigger) = invocation.option("trigger") else {
            return ChannelResponse::error("Please provide a trigger!");
        };
        let Some(mode) = ReplyMode::parse(invocation.option("mode")) else {
            return ChannelResponse::error("Mode must be either 'add' or 'remove'.");
        };

        match mode {
            ReplyMode::Remove => {
                let outcome = self.rules.remove(guild_id, trigger, &invocation.user_id);
                render_outcome(&outcome)
            }
            ReplyMode::Add => {
                let Some(response) = invocation.option("response") else {
                    return ChannelResponse::error("Please provide a response message!");
                };

                let outcome =
                    self.rules
                        .add_or_update(guild_id, trigger, response, &invocation.user_id);
                if !outcome.ok() {
                    return render_outcome(&outcome);
                }

                let embed = Embed::new("✅ Auto-Reply Set Up Successfully!", COLOR_SUCCESS)
                    .description(&format!(
                        "**Trigger:** {}\n**Response:** {}",
                        news::truncate_chars(trigger.trim(), CONFIRM_TRIGGER_CHARS),
                        news::truncate_chars(response, CONFIRM_RESPONSE_CHARS)
                    ))
                    .footer(
                        "The bot will now automatically reply when someone sends the trigger \
                         message. Only you can modify this auto-reply.",
                    );
                ChannelResponse::embed(embed, Visibility::Private)
            }
        }
    }

    fn list_command(&self, invocation: &CommandInvocation) -> ChannelResponse {
        let Some(guild_id) = invocation.guild_id.as_deref() else {
            return ChannelResponse::error(DM_ONLY_ERROR);
        };

        let rules = self.rules.rules(guild_id);
        if rules.is_empty() {
            return ChannelResponse::text(
                "📝 No auto-reply rules set up for this server.",
                Visibility::Private,
            );
        }

        let mut embed = Embed::new("📋 Server Auto-Reply Rules", COLOR_LIST)
            .description("Active rules for this server")
            .footer(&format!("Total rules: {}", rules.len()));

        for rule in rules.iter().take(MAX_EMBED_FIELDS) {
            let author = if rule.author_id.is_empty() {
                String::new()
            } else {
                format!(" (by <@{}>)", rule.author_id)
            };
            embed = embed.field(
                &format!(
                    "Trigger: {}",
                    news::truncate_chars(&rule.trigger, LIST_TRIGGER_CHARS)
                ),
                &format!(
                    "Response: {}{}",
                    news::truncate_chars(&rule.response, LIST_RESPONSE_CHARS),
                    author
                ),
                false,
            );
        }

        ChannelResponse::embed(embed, Visibility::Private)
    }

    fn analisis_command(&self, invocation: &CommandInvocation) -> CommandReply {
        if let Some(allowed) = &self.restriction.guild_id {
            if invocation.guild_id.as_ref() != Some(allowed) {
                return CommandReply::Immediate(ChannelResponse::error(
                    "The `/analisis` command is only available in specific servers. \
                     This command is restricted to authorized servers only.",
                ));
            }
        }
        if let Some(allowed) = &self.restriction.channel_id {
            if &invocation.channel_id != allowed {
                return CommandReply::Immediate(ChannelResponse::error(
                    "The `/analisis` command can only be used in the designated channel. \
                     Please use it in the correct channel.",
                ));
            }
        }

        let Some(requested) = invocation.option("topic") else {
            return CommandReply::Immediate(ChannelResponse::error(
                "Please provide a topic! Example: `/analisis ringkasan pasar`",
            ));
        };

        match news::find_topic(requested) {
            Some(topic) => CommandReply::Deferred(PendingCommand::News(topic)),
            None => {
                let available: Vec<&str> = TOPICS.iter().map(|t| t.key).collect();
                CommandReply::Immediate(ChannelResponse::error(&format!(
                    "Topic not found! Available topics:\n• {}",
                    available.join("\n• ")
                )))
            }
        }
    }

    async fn news_response(&self, topic: &Topic) -> ChannelResponse {
        let channel = match self.news.fetch_topic(topic).await {
            Ok(channel) => channel,
            Err(e) => {
                warn!("RSS fetch for '{}' failed: {}", topic.key, e);
                return ChannelResponse::error(&format!("Failed to load news: {}", e));
            }
        };

        if channel.items.is_empty() {
            return ChannelResponse::text(
                "📰 No news articles found for this topic.",
                Visibility::Private,
            );
        }

        let mut embed = Embed::new(&format!("📰 {} - {}", topic.label, channel.title), COLOR_NEWS)
            .description("Latest news from Investing.com")
            .footer("Source: Investing.com")
            .timestamp_now();

        for item in channel.items.iter().take(news::MAX_ITEMS) {
            let title = if item.title.trim().is_empty() {
                "Untitled".to_string()
            } else {
                news::truncate_chars(item.title.trim(), 250)
            };
            embed = embed.field(
                &title,
                &format!(
                    "{}\n\n[Read More]({})",
                    news::clean_description(&item.description),
                    item.link.trim()
                ),
                false,
            );
        }

        ChannelResponse::embed(embed, Visibility::Public)
    }

    async fn convert_response(&self, query: &ConversionQuery) -> ChannelResponse {
        let conversion = match self.currency.convert(query).await {
            Ok(conversion) => conversion,
            Err(e) => {
                if !e.is_input_error() {
                    warn!("Currency conversion failed: {}", e);
                }
                return ChannelResponse::error(&format!("Failed to convert currency: {}", e));
            }
        };

        let embed = Embed::new("💱 Currency Conversion", COLOR_CURRENCY)
            .field("From", &format!("{:.2} {}", conversion.amount, conversion.from), true)
            .field("To", &format!("{:.2} {}", conversion.result, conversion.to), true)
            .field(
                "Exchange Rate",
                &format!("1 {} = {:.4} {}", conversion.from, conversion.rate, conversion.to),
                false,
            )
            .footer("Exchange rates provided by exchangerate-api.com")
            .timestamp_now();

        ChannelResponse::embed(embed, Visibility::Public)
    }
}

/// Map a rule outcome to its response; denials go out publicly
pub fn render_outcome(outcome: &RuleOutcome) -> ChannelResponse {
    match outcome.kind {
        OutcomeKind::Success => {
            ChannelResponse::text(&format!("✅ {}", outcome.message), outcome.visibility())
        }
        OutcomeKind::OwnershipConflict => {
            ChannelResponse::text(&outcome.message, outcome.visibility())
        }
        OutcomeKind::ValidationError | OutcomeKind::NotFound => {
            ChannelResponse::error(&outcome.message)
        }
    }
}

fn convert_command(invocation: &CommandInvocation) -> CommandReply {
    let Some(input) = invocation.option("amount_and_currencies") else {
        return CommandReply::Immediate(ChannelResponse::error(&format!(
            "Please provide the conversion details.\n\n{}",
            CONVERT_EXAMPLES
        )));
    };

    match ConversionQuery::parse(input) {
        Ok(query) => CommandReply::Deferred(PendingCommand::Convert(query)),
        Err(e) => CommandReply::Immediate(ChannelResponse::error(&format!(
            "{}\n\n{}",
            e, CONVERT_EXAMPLES
        ))),
    }
}

fn help_response() -> ChannelResponse {
    let embed = Embed::new("🤖 Auto-Reply Bot Help", COLOR_HELP)
        .description("Smart auto-reply system for Discord servers")
        .field(
            "📝 `/reply [trigger] [response]`",
            "Set up a new auto-reply rule for this server. When someone sends a message \
             containing the trigger word, the bot will automatically respond.",
            false,
        )
        .field(
            "🗑️ `/reply [trigger] mode:remove`",
            "Remove an existing auto-reply rule for the specified trigger in this server.",
            false,
        )
        .field(
            "📋 `/list_replies`",
            "Show all active auto-reply rules for this server.",
            false,
        )
        .field(
            "ℹ️ How it works:",
            "• Triggers are case-insensitive and match whole words only\n\
             • Only the first matching rule replies to a message\n\
             • Anyone can create new rules\n\
             • Only the original author can modify/delete their rules\n\
             • Rules are server-specific",
            false,
        )
        .field(
            "⚠️ Note:",
            "• Commands only work in servers, not in DMs\n\
             • The bot needs 'Send Messages' permission in channels where you want \
             auto-replies to work",
            false,
        )
        .footer("Use /reply to set up smart auto-replies for this server! Only you can modify rules you create.");

    ChannelResponse::embed(embed, Visibility::Private)
}

fn commands_response() -> ChannelResponse {
    let embed = Embed::new("🎛️ Bot Commands", COLOR_LIST)
        .description("All available commands for this bot")
        .field(
            "🤖 **Auto-Reply Commands**",
            "`/reply` - Set up auto-reply rules\n\
             `/list_replies` - Show server's auto-reply rules\n\
             `/help_reply` - Help for auto-reply system",
            false,
        )
        .field(
            "📰 **News & Analysis Commands**",
            "`/analisis` - Get latest financial news",
            false,
        )
        .field(
            "💱 **Currency Commands**",
            "`/convert` - Convert currency amounts (e.g., `/convert $500 idr`)",
            false,
        )
        .field(
            "ℹ️ **Information Commands**",
            "`/commands` - Show this list of all commands",
            false,
        )
        .field(
            "📖 **Quick Usage Examples:**",
            "• `/reply kerja working hard!` - Create auto-reply\n\
             • `/analisis ringkasan pasar` - Get market news\n\
             • `/convert $500 idr` - Convert $500 to Indonesian Rupiah\n\
             • `/convert 1000jpy usd` - Convert 1000 Japanese Yen to USD\n\
             • `/list_replies` - See all server replies\n\
             • `/help_reply` - Detailed auto-reply help",
            false,
        )
        .footer("💡 Tip: Use /help_reply for detailed auto-reply instructions")
        .timestamp_now();

    ChannelResponse::embed(embed, Visibility::Private)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names_round_trip() {
        for command in BotCommand::ALL {
            assert_eq!(BotCommand::from_name(command.name()), Some(command));
        }
        assert_eq!(BotCommand::from_name("trendingx"), None);
    }

    #[test]
    fn test_reply_mode_parse() {
        assert_eq!(ReplyMode::parse(None), Some(ReplyMode::Add));
        assert_eq!(ReplyMode::parse(Some("ADD")), Some(ReplyMode::Add));
        assert_eq!(ReplyMode::parse(Some("Remove")), Some(ReplyMode::Remove));
        assert_eq!(ReplyMode::parse(Some("delete")), None);
    }

    #[test]
    fn test_render_outcome_visibility() {
        let conflict = render_outcome(&RuleOutcome::ownership_conflict("U2"));
        assert_eq!(conflict.visibility, Visibility::Public);
        assert!(!conflict.content.unwrap().starts_with('❌'));

        let missing = render_outcome(&RuleOutcome::not_found());
        assert_eq!(missing.visibility, Visibility::Private);
        assert!(missing.content.unwrap().starts_with('❌'));

        let done = render_outcome(&RuleOutcome::success("Auto-reply removed successfully!"));
        assert_eq!(done.content.as_deref(), Some("✅ Auto-reply removed successfully!"));
        assert!(done.is_ephemeral());
    }

    #[test]
    fn test_convert_validation_is_immediate() {
        let invocation = CommandInvocation::new("convert", "U1", Some("G1"), "C1")
            .with_option("amount_and_currencies", "500 idr");
        match convert_command(&invocation) {
            CommandReply::Immediate(response) => {
                assert!(response.is_ephemeral());
                assert!(response.content.unwrap().contains("source currency not specified"));
            }
            other => panic!("expected immediate reply, got {:?}", other),
        }

        let invocation = CommandInvocation::new("convert", "U1", Some("G1"), "C1")
            .with_option("amount_and_currencies", "$500 idr");
        assert!(matches!(
            convert_command(&invocation),
            CommandReply::Deferred(PendingCommand::Convert(_))
        ));
    }
}
