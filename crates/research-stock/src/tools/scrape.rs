//! Generic web page reader

use super::parse_params;
use async_trait::async_trait;
use regex::Regex;
use research_core::{Error, Result as CoreResult};
use research_llm::tools::schema;
use research_tools::Tool;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

const NAME: &str = "scrape_website";
const MAX_CHARS: usize = 8_000;

struct TextPatterns {
    blocks: Regex,
    tags: Regex,
    spaces: Regex,
}

static TEXT_PATTERNS: LazyLock<Result<TextPatterns, regex::Error>> = LazyLock::new(|| {
    Ok(TextPatterns {
        blocks: Regex::new(
            r"(?is)<(script|style|noscript|head)\b.*?</(script|style|noscript|head)>",
        )?,
        tags: Regex::new(r"(?s)<[^>]*>")?,
        spaces: Regex::new(r"\s+")?,
    })
});

/// Fetch a page and return its visible text
pub struct ScrapeWebsiteTool {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ScrapeParams {
    url: String,
}

impl ScrapeWebsiteTool {
    pub fn new(timeout: Duration) -> crate::error::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (compatible; stock-research/0.1)")
            .build()?;
        Ok(Self { client })
    }

    async fn scrape(&self, url: &str) -> CoreResult<Value> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::invalid_input(NAME, format!("not an http(s) URL: {url}")));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::tool_failed(NAME, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::tool_failed(NAME, format!("HTTP {status} from {url}")));
        }

        let html = response
            .text()
            .await
            .map_err(|e| Error::tool_failed(NAME, e))?;
        let text = html_to_text(&html).map_err(|e| Error::tool_failed(NAME, e))?;
        let (text, truncated) = truncate(&text, MAX_CHARS);
        debug!(url, chars = text.len(), truncated, "page scraped");

        Ok(json!({"url": url, "content": text, "truncated": truncated}))
    }
}

/// Drop scripts, styles and tags; collapse whitespace
pub fn html_to_text(html: &str) -> Result<String, regex::Error> {
    let patterns = TEXT_PATTERNS.as_ref().map_err(Clone::clone)?;

    let text = patterns.blocks.replace_all(html, " ");
    let text = patterns.tags.replace_all(&text, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    Ok(patterns.spaces.replace_all(&text, " ").trim().to_string())
}

/// Cut `text` to at most `max` characters
fn truncate(text: &str, max: usize) -> (&str, bool) {
    match text.char_indices().nth(max) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}

#[async_trait]
impl Tool for ScrapeWebsiteTool {
    async fn execute(&self, params: Value) -> CoreResult<Value> {
        let params: ScrapeParams = parse_params(NAME, params)?;
        self.scrape(params.url.trim()).await
    }

    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Read the visible text of a web page, for example a news article \
         returned by stock_news. Long pages are truncated."
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({"url": schema::string("Absolute http(s) URL of the page")}),
            &["url"],
        )
    }
}
