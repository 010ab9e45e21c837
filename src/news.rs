//! News Feeds
//!
//! Topic catalogue for Investing.com Indonesia RSS feeds, plus fetching,
//! parsing and description cleanup for the `/analisis` command.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Items rendered per request
pub const MAX_ITEMS: usize = 5;

/// Description length before truncation
const MAX_DESCRIPTION_CHARS: usize = 200;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static LINE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));

/// A selectable news topic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topic {
    /// Lower-case key, also the slash-command choice value
    pub key: &'static str,
    /// Display label
    pub label: &'static str,
    /// Feed path below the news host
    pub path: &'static str,
}

pub const TOPICS: &[Topic] = &[
    Topic { key: "ringkasan pasar", label: "Ringkasan Pasar", path: "/rss/news_25.rss" },
    Topic { key: "analisis teknikal", label: "Analisis Teknikal", path: "/rss/news_25.rss" },
    Topic { key: "analisis fundamental", label: "Analisis Fundamental", path: "/rss/news_25.rss" },
    Topic { key: "opini", label: "Opini", path: "/rss/news_25.rss" },
    Topic { key: "ide investasi", label: "Ide Investasi", path: "/rss/news_25.rss" },
    Topic { key: "mata uang kripto", label: "Mata Uang Kripto", path: "/rss/news_301.rss" },
    Topic { key: "forex", label: "Forex", path: "/rss/news_1.rss" },
    Topic { key: "saham", label: "Saham", path: "/rss/news_25.rss" },
    Topic { key: "komoditas", label: "Komoditas", path: "/rss/news_49.rss" },
    Topic { key: "berita", label: "Berita", path: "/rss/news.rss" },
    Topic { key: "breaking news", label: "Breaking News", path: "/rss/news.rss" },
];

/// Resolve a requested topic: exact key first, then the first key the
/// request contains.
pub fn find_topic(requested: &str) -> Option<&'static Topic> {
    let requested = requested.trim().to_lowercase();
    if requested.is_empty() {
        return None;
    }

    TOPICS
        .iter()
        .find(|t| t.key == requested)
        .or_else(|| TOPICS.iter().find(|t| requested.contains(t.key)))
}

/// News errors
#[derive(Error, Debug)]
pub enum NewsError {
    #[error("failed to fetch RSS feed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP error: {0}")]
    Status(u16),
    #[error("failed to parse XML: {0}")]
    Parse(#[from] quick_xml::DeError),
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: FeedChannel,
}

/// Parsed `<channel>`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedChannel {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "item", default)]
    pub items: Vec<FeedItem>,
}

/// Parsed `<item>`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "pubDate", default)]
    pub pub_date: String,
}

/// Parse an RSS 2.0 document
pub fn parse_feed(xml: &str) -> Result<FeedChannel, NewsError> {
    let rss: Rss = quick_xml::de::from_str(xml)?;
    Ok(rss.channel)
}

/// Strip CDATA markers and HTML, then truncate
pub fn clean_description(raw: &str) -> String {
    let text = raw.replace("<![CDATA[", "").replace("]]>", "");
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = HTML_TAG.replace_all(&text, "");
    truncate_chars(text.trim(), MAX_DESCRIPTION_CHARS)
}

/// Cut to `max` characters, appending "..." when shortened
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// RSS fetcher
#[derive(Clone)]
pub struct NewsClient {
    client: Client,
    base_url: String,
}

impl NewsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn topic_url(&self, topic: &Topic) -> String {
        format!("{}{}", self.base_url, topic.path)
    }

    /// Fetch the feed behind `topic`
    pub async fn fetch_topic(&self, topic: &Topic) -> Result<FeedChannel, NewsError> {
        self.fetch_feed(&self.topic_url(topic)).await
    }

    /// GET and parse the feed at `url`
    pub async fn fetch_feed(&self, url: &str) -> Result<FeedChannel, NewsError> {
        debug!("Fetching RSS feed {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(NewsError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        parse_feed(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Berita Forex</title>
    <description>Forex news</description>
    <item>
      <title>Rupiah menguat</title>
      <link>https://id.investing.com/news/1</link>
      <description><![CDATA[<p>Rupiah naik<br/>hari ini</p>]]></description>
      <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Dolar melemah</title>
      <link>https://id.investing.com/news/2</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_find_topic() {
        assert_eq!(find_topic("Forex").unwrap().key, "forex");
        assert_eq!(find_topic("berita").unwrap().key, "berita");
        assert_eq!(find_topic("berita saham hari ini").unwrap().key, "saham");
        assert!(find_topic("cuaca").is_none());
        assert!(find_topic("  ").is_none());
    }

    #[test]
    fn test_topic_url() {
        let client = NewsClient::new("https://id.investing.com/", Duration::from_secs(1));
        let forex = find_topic("forex").unwrap();
        assert_eq!(client.topic_url(forex), "https://id.investing.com/rss/news_1.rss");
    }

    #[test]
    fn test_parse_feed() {
        let channel = parse_feed(SAMPLE).unwrap();
        assert_eq!(channel.title, "Berita Forex");
        assert_eq!(channel.items.len(), 2);
        assert_eq!(channel.items[0].link, "https://id.investing.com/news/1");
        assert!(channel.items[1].description.is_empty());
    }

    #[test]
    fn test_parse_feed_rejects_garbage() {
        assert!(parse_feed("not xml at all").is_err());
    }

    #[test]
    fn test_clean_description() {
        assert_eq!(
            clean_description("<![CDATA[<p>Rupiah naik<br/>hari ini</p>]]>"),
            "Rupiah naik\nhari ini"
        );
        assert_eq!(clean_description("a<BR>b"), "a\nb");

        let long = "x".repeat(250);
        let cleaned = clean_description(&long);
        assert_eq!(cleaned.len(), 203);
        assert!(cleaned.ends_with("..."));
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate_chars("ééé", 2), "éé...");
        assert_eq!(truncate_chars("ab", 2), "ab");
    }
}
