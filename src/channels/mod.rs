//! Chat Platform Adapters
//!
//! Platform-neutral message, command and response types live in `traits`;
//! each platform converts its events into them and renders responses back.
//! Discord is the only platform wired up.

pub mod discord;
pub mod traits;

pub use discord::{AutoReplyHandler, DiscordChannel};
pub use traits::{
    Channel, ChannelError, ChannelMessage, ChannelResponse, CommandInvocation, Embed, EmbedField,
    Visibility,
};
