//! Whole-word trigger matching
//!
//! Message text is trimmed, lower-cased and split on whitespace. Each token
//! loses leading/trailing punctuation and is compared to the trigger as a
//! whole, so `go` never matches `going`.

use super::types::Rule;

/// Characters stripped from both ends of every token
const TOKEN_PUNCTUATION: &[char] = &[
    '.', ',', '!', '?', ';', ':', '"', '\'', '(', ')', '[', ']', '{', '}', '*',
];

/// Case-folded, punctuation-stripped tokens of `text`
fn clean_tokens(text: &str) -> Vec<String> {
    text.trim()
        .to_lowercase()
        .split_whitespace()
        .map(|word| word.trim_matches(TOKEN_PUNCTUATION).to_string())
        .collect()
}

/// Whether `trigger` occurs in `tokens` as whole words.
///
/// Multi-word triggers must appear as a contiguous run of tokens.
fn tokens_contain(tokens: &[String], trigger: &str) -> bool {
    let words: Vec<&str> = trigger.split_whitespace().collect();
    if words.is_empty() || words.len() > tokens.len() {
        return false;
    }

    tokens
        .windows(words.len())
        .any(|window| window.iter().zip(&words).all(|(token, word)| token.as_str() == *word))
}

/// Whether `text` contains `trigger` as a whole word
pub fn matches(text: &str, trigger: &str) -> bool {
    let tokens = clean_tokens(text);
    tokens_contain(&tokens, &trigger.to_lowercase())
}

/// First rule, in iteration order, whose trigger matches `text`
pub fn first_match<'a>(text: &str, rules: &'a [Rule]) -> Option<&'a Rule> {
    let tokens = clean_tokens(text);
    if tokens.is_empty() {
        // Nothing usable, e.g. content hidden by missing intents
        return None;
    }

    rules
        .iter()
        .find(|rule| tokens_contain(&tokens, &rule.trigger.to_lowercase()))
}
