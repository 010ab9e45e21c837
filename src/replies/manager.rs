//! Rule Manager
//!
//! Sole owner of the in-memory rule book. Mutations hold the write lock
//! across check, mutate and persist so two commands racing on one trigger
//! cannot lose an update.

use super::matcher;
use super::store::RuleStore;
use super::types::{
    normalize_trigger, Rule, RuleBook, RuleOutcome, MAX_RESPONSE_CHARS, MAX_TRIGGER_CHARS,
};
use parking_lot::RwLock;
use tracing::{debug, error, info};

/// Rule counts across the book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleStats {
    pub rules: usize,
    pub scopes: usize,
}

/// Per-guild auto-reply rules with ownership checks
pub struct RuleManager {
    store: RuleStore,
    book: RwLock<RuleBook>,
}

impl RuleManager {
    /// Load the book from `store`, falling back to empty on bad data
    pub fn open(store: RuleStore) -> Self {
        let book = store.load_or_default();
        Self::with_book(store, book)
    }

    pub fn with_book(store: RuleStore, book: RuleBook) -> Self {
        Self {
            store,
            book: RwLock::new(book),
        }
    }

    /// Create a rule, or update it when the caller may edit it
    pub fn add_or_update(
        &self,
        scope: &str,
        trigger: &str,
        response: &str,
        author_id: &str,
    ) -> RuleOutcome {
        let trigger = normalize_trigger(trigger);
        if trigger.is_empty() {
            return RuleOutcome::validation("Please provide a trigger!");
        }
        if response.trim().is_empty() {
            return RuleOutcome::validation("Please provide a response message!");
        }
        if trigger.chars().count() > MAX_TRIGGER_CHARS {
            return RuleOutcome::validation(format!(
                "Trigger is too long (max {} characters).",
                MAX_TRIGGER_CHARS
            ));
        }
        if response.chars().count() > MAX_RESPONSE_CHARS {
            return RuleOutcome::validation(format!(
                "Response is too long (max {} characters).",
                MAX_RESPONSE_CHARS
            ));
        }

        let mut book = self.book.write();
        let rules = book.entry(scope.to_string()).or_default();

        let existing = rules
            .iter_mut()
            .find(|r| normalize_trigger(&r.trigger) == trigger);

        let outcome = match existing {
            Some(existing) => {
                if !existing.editable_by(author_id) {
                    debug!(
                        "User {} denied edit of '{}' owned by {} in {}",
                        author_id, trigger, existing.author_id, scope
                    );
                    return RuleOutcome::ownership_conflict(author_id);
                }
                existing.response = response.to_string();
                existing.author_id = author_id.to_string();
                info!("Auto-reply '{}' updated in {}", trigger, scope);
                RuleOutcome::success("Auto-reply updated successfully!")
            }
            None => {
                rules.push(Rule {
                    trigger: trigger.clone(),
                    response: response.to_string(),
                    author_id: author_id.to_string(),
                });
                info!("Auto-reply '{}' created in {}", trigger, scope);
                RuleOutcome::success("Auto-reply created successfully!")
            }
        };

        self.persist(&book);
        outcome
    }

    /// Remove a rule the caller may edit
    pub fn remove(&self, scope: &str, trigger: &str, author_id: &str) -> RuleOutcome {
        let trigger = normalize_trigger(trigger);

        let mut book = self.book.write();
        let Some(rules) = book.get_mut(scope) else {
            return RuleOutcome::not_found();
        };
        let position = rules
            .iter()
            .position(|r| normalize_trigger(&r.trigger) == trigger);
        let Some(index) = position else {
            return RuleOutcome::not_found();
        };

        if !rules[index].editable_by(author_id) {
            debug!(
                "User {} denied removal of '{}' owned by {} in {}",
                author_id, trigger, rules[index].author_id, scope
            );
            return RuleOutcome::ownership_conflict(author_id);
        }

        rules.remove(index);
        if rules.is_empty() {
            book.remove(scope);
        }
        info!("Auto-reply '{}' removed from {}", trigger, scope);

        self.persist(&book);
        RuleOutcome::success("Auto-reply removed successfully!")
    }

    /// Snapshot of a guild's rules in match order
    pub fn rules(&self, scope: &str) -> Vec<Rule> {
        self.book.read().get(scope).cloned().unwrap_or_default()
    }

    /// Response of the first rule matching `text` in `scope`
    pub fn reply_for(&self, scope: &str, text: &str) -> Option<String> {
        let book = self.book.read();
        let rules = book.get(scope)?;
        matcher::first_match(text, rules).map(|rule| rule.response.clone())
    }

    pub fn stats(&self) -> RuleStats {
        let book = self.book.read();
        RuleStats {
            rules: book.values().map(Vec::len).sum(),
            scopes: book.len(),
        }
    }

    /// Write the book; failures are logged and the in-memory change stands
    fn persist(&self, book: &RuleBook) {
        if let Err(e) = self.store.save(book) {
            error!("Failed to save auto-replies: {}", e);
        }
    }
}
