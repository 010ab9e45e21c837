//! Auto-reply rules
//!
//! - `types`: rule, rule book and mutation outcomes
//! - `store`: JSON persistence of the rule book
//! - `matcher`: whole-word trigger matching
//! - `manager`: ownership-checked add/update/remove over a shared book

pub mod manager;
pub mod matcher;
pub mod store;
pub mod types;

pub use manager::{RuleManager, RuleStats};
pub use matcher::{first_match, matches};
pub use store::{RuleStore, StoreError};
pub use types::{
    normalize_trigger, OutcomeKind, Rule, RuleBook, RuleOutcome, Visibility, MAX_RESPONSE_CHARS,
    MAX_TRIGGER_CHARS,
};
