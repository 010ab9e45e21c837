//! Currency Conversion
//!
//! Parses free-form input such as `$500 idr` or `1000jpy usd` and converts
//! through the exchangerate-api.com v6 `latest` endpoint.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// `<amount><currency code>`, e.g. `1000jpy`
static AMOUNT_WITH_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)?)(.*?)$").expect("valid regex"));

/// Symbol or code prefixes accepted in front of the amount
const PREFIXES: &[(&str, &str)] = &[
    ("$", "usd"),
    ("€", "eur"),
    ("eur", "eur"),
    ("£", "gbp"),
    ("gbp", "gbp"),
    ("¥", "jpy"),
    ("jpy", "jpy"),
];

/// Usage examples shown with parse errors
pub const CONVERT_EXAMPLES: &str =
    "**Examples:**\n• `/convert $500 idr`\n• `/convert 1000jpy usd`\n• `/convert 100eur gbp`";

/// Currency errors
#[derive(Error, Debug)]
pub enum CurrencyError {
    #[error("invalid format. Use format like '$500 idr' or '500jpy idr'")]
    InvalidFormat,
    #[error("invalid amount format")]
    InvalidAmountFormat,
    #[error("source currency not specified")]
    MissingSource,
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("amount must be positive")]
    NonPositive,
    #[error("exchange rate API key not configured")]
    MissingApiKey,
    #[error("failed to fetch exchange rates: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP error: {0}")]
    Status(u16),
    #[error("API request failed: {0}")]
    ApiFailure(String),
    #[error("currency {0} not found")]
    UnknownCurrency(String),
}

impl CurrencyError {
    /// Errors caused by the user's input rather than the API
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidFormat
                | Self::InvalidAmountFormat
                | Self::MissingSource
                | Self::InvalidAmount(_)
                | Self::NonPositive
        )
    }
}

/// Parsed conversion request (lower-case codes)
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionQuery {
    pub amount: f64,
    pub from: String,
    pub to: String,
}

impl ConversionQuery {
    /// Parse `"<amount+source> <target>"`
    pub fn parse(input: &str) -> Result<Self, CurrencyError> {
        let input = input.trim().to_lowercase();
        let parts: Vec<&str> = input.split_whitespace().collect();
        let [source, target] = parts.as_slice() else {
            return Err(CurrencyError::InvalidFormat);
        };

        let (from, amount_str) = match PREFIXES
            .iter()
            .find(|(prefix, _)| source.starts_with(prefix))
        {
            Some((prefix, code)) => (code.to_string(), &source[prefix.len()..]),
            None => {
                let caps = AMOUNT_WITH_CODE
                    .captures(source)
                    .ok_or(CurrencyError::InvalidAmountFormat)?;
                let amount = caps.get(1).map_or("", |m| m.as_str());
                let code = caps.get(2).map_or("", |m| m.as_str().trim());
                if code.is_empty() {
                    return Err(CurrencyError::MissingSource);
                }
                (code.to_string(), amount)
            }
        };

        let amount: f64 = amount_str
            .parse()
            .map_err(|_| CurrencyError::InvalidAmount(amount_str.to_string()))?;
        if amount <= 0.0 || !amount.is_finite() {
            return Err(CurrencyError::NonPositive);
        }

        Ok(Self {
            amount,
            from,
            to: target.to_string(),
        })
    }
}

/// Result of a conversion (upper-case codes)
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub from: String,
    pub to: String,
    pub amount: f64,
    pub rate: f64,
    pub result: f64,
}

/// `latest` endpoint response
#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    #[serde(default)]
    result: String,
    #[serde(rename = "error-type", default)]
    error_type: Option<String>,
    #[serde(default)]
    conversion_rates: HashMap<String, f64>,
}

/// exchangerate-api.com client
#[derive(Clone)]
pub struct ExchangeRateClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ExchangeRateClient {
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string),
        }
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    /// Convert `query.amount` from `query.from` into `query.to`
    pub async fn convert(&self, query: &ConversionQuery) -> Result<Conversion, CurrencyError> {
        let api_key = self.api_key.as_deref().ok_or(CurrencyError::MissingApiKey)?;
        let from = query.from.to_uppercase();
        let to = query.to.to_uppercase();

        let url = format!("{}/v6/{}/latest/{}", self.base_url, api_key, from);
        debug!("Fetching exchange rates for {}", from);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(CurrencyError::Status(response.status().as_u16()));
        }

        let body: LatestRatesResponse = response.json().await?;
        if body.result != "success" {
            return Err(CurrencyError::ApiFailure(
                body.error_type.unwrap_or(body.result),
            ));
        }

        let rate = *body
            .conversion_rates
            .get(&to)
            .ok_or_else(|| CurrencyError::UnknownCurrency(to.clone()))?;

        Ok(Conversion {
            from,
            to,
            amount: query.amount,
            rate,
            result: query.amount * rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> ConversionQuery {
        ConversionQuery::parse(input).unwrap()
    }

    #[test]
    fn test_symbol_prefixes() {
        assert_eq!(
            parse("$500 idr"),
            ConversionQuery { amount: 500.0, from: "usd".into(), to: "idr".into() }
        );
        assert_eq!(parse("€20 usd").from, "eur");
        assert_eq!(parse("£7.5 usd").amount, 7.5);
        assert_eq!(parse("¥1000 usd").from, "jpy");
    }

    #[test]
    fn test_code_prefix_and_suffix() {
        assert_eq!(parse("eur100 gbp").amount, 100.0);
        assert_eq!(parse("1000JPY USD").from, "jpy");
        assert_eq!(parse("  100eur   gbp ").to, "gbp");
        assert_eq!(parse("250.5chf idr").from, "chf");
    }

    #[test]
    fn test_errors() {
        assert!(matches!(ConversionQuery::parse("500"), Err(CurrencyError::InvalidFormat)));
        assert!(matches!(ConversionQuery::parse("a b c"), Err(CurrencyError::InvalidFormat)));
        assert!(matches!(
            ConversionQuery::parse("abc idr"),
            Err(CurrencyError::InvalidAmountFormat)
        ));
        assert!(matches!(ConversionQuery::parse("500 idr"), Err(CurrencyError::MissingSource)));
        assert!(matches!(
            ConversionQuery::parse("$abc idr"),
            Err(CurrencyError::InvalidAmount(_))
        ));
        assert!(matches!(ConversionQuery::parse("$0 idr"), Err(CurrencyError::NonPositive)));
    }

    #[test]
    fn test_input_error_classification() {
        assert!(CurrencyError::InvalidFormat.is_input_error());
        assert!(!CurrencyError::MissingApiKey.is_input_error());
        assert!(!CurrencyError::Status(500).is_input_error());
    }

    #[tokio::test]
    async fn test_convert_without_key() {
        let client = ExchangeRateClient::new("http://localhost:1", None, Duration::from_secs(1));
        let err = client.convert(&parse("$1 idr")).await.unwrap_err();
        assert!(matches!(err, CurrencyError::MissingApiKey));
    }
}
