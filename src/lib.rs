//! Auto-Reply Bot
//!
//! Discord bot that answers guild messages from per-server trigger/response
//! rules, with slash commands to manage the rules plus news and currency
//! lookups.
//!
//! # Features
//!
//! - **Auto-replies**: case-insensitive whole-word triggers, first rule wins
//! - **Ownership**: only a rule's creator may change or remove it
//! - **Persistence**: rules survive restarts in a single JSON document
//! - **News**: `/analisis` pulls Investing.com RSS feeds
//! - **Currency**: `/convert` uses exchangerate-api.com
//!
//! # Architecture
//!
//! ```text
//! Discord Gateway ──► AutoReplyHandler ──► Dispatcher ──► RuleManager ──► RuleStore
//!   (serenity)          (channels)            │             (RwLock)      (JSON file)
//!                                             ├── NewsClient (RSS)
//!                                             └── ExchangeRateClient (HTTP)
//! ```

pub mod channels;
pub mod config;
pub mod currency;
pub mod dispatch;
pub mod news;
pub mod replies;

pub use channels::{Channel, ChannelError, ChannelMessage, ChannelResponse, CommandInvocation};
pub use config::Config;
pub use currency::{Conversion, ConversionQuery, CurrencyError, ExchangeRateClient};
pub use dispatch::{BotCommand, CommandReply, Dispatcher, NewsRestriction, PendingCommand};
pub use news::{NewsClient, NewsError, Topic, TOPICS};
pub use replies::{OutcomeKind, Rule, RuleManager, RuleOutcome, RuleStore, Visibility};
