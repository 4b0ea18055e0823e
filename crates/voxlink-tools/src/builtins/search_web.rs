use super::format_usd;
use crate::args::ToolArgs;
use crate::context::ToolContext;
use crate::router::{AgentKind, ToolDescriptor, ToolHandler};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};
use voxlink_core::{VoxlinkError, VoxlinkResult};

/// General web search over the Wikipedia search API, with a fast path
/// for bitcoin spot-price questions that goes to a ticker instead.
pub struct SearchWebTool {
    descriptor: ToolDescriptor,
    client: reqwest::Client,
    wikipedia_base: String,
    ticker_base: String,
    bitcoin_query: Option<Regex>,
    html_tag: Option<Regex>,
}

impl SearchWebTool {
    pub fn new(client: reqwest::Client, wikipedia_base: String, ticker_base: String) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "search_web".to_string(),
                agent: AgentKind::Analyst,
                description: "Search the web for general, factual information.".to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The search query"
                        }
                    },
                    "required": ["query"]
                }),
            },
            client,
            wikipedia_base,
            ticker_base,
            bitcoin_query: Regex::new(
                r"(?i)(?:price of|current price of|what's the price of|price for)\s+(bitcoin|btc)",
            )
            .ok(),
            html_tag: Regex::new(r"<[^>]*>").ok(),
        }
    }

    async fn bitcoin_price(&self) -> Option<String> {
        let url = format!("{}/ticker", self.ticker_base);
        let response = self.client.get(&url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let data: Value = response.json().await.ok()?;
        let price = data["USD"]["last"].as_f64()?;
        Some(format!(
            "The current price of Bitcoin is {}.",
            format_usd(price)
        ))
    }

    async fn wikipedia_search(&self, query: &str) -> VoxlinkResult<String> {
        let url = format!("{}/w/api.php", self.wikipedia_base);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("format", "json"),
                ("origin", "*"),
            ])
            .send()
            .await
            .map_err(|e| VoxlinkError::Tool(format!("web search request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(VoxlinkError::Tool(format!(
                "web search request failed with status {}",
                response.status()
            )));
        }
        let data: Value = response
            .json()
            .await
            .map_err(|e| VoxlinkError::Tool(format!("web search returned invalid JSON: {e}")))?;
        Ok(self.summarize(&data))
    }

    fn summarize(&self, data: &Value) -> String {
        let Some(first) = data["query"]["search"].as_array().and_then(|s| s.first()) else {
            return "I couldn't find a relevant summary for that query.".to_string();
        };
        let title = first["title"].as_str().unwrap_or("(untitled)");
        let raw_snippet = first["snippet"].as_str().unwrap_or("");
        let snippet = match &self.html_tag {
            Some(re) => re.replace_all(raw_snippet, "").into_owned(),
            None => raw_snippet.to_string(),
        };
        format!("According to the article \"{title}\", {snippet}...")
    }
}

#[async_trait]
impl ToolHandler for SearchWebTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn run(&self, args: ToolArgs, ctx: &ToolContext) -> VoxlinkResult<String> {
        let ToolArgs::SearchWeb { query } = args else {
            return Err(VoxlinkError::Tool("expected search_web arguments".into()));
        };
        if !ctx.status.is_online {
            return Ok(
                "I can't perform a web search right now as I appear to be offline.".to_string(),
            );
        }
        debug!(query = %query, "web search");

        if self
            .bitcoin_query
            .as_ref()
            .is_some_and(|re| re.is_match(&query))
        {
            match self.bitcoin_price().await {
                Some(answer) => return Ok(answer),
                None => warn!("bitcoin ticker unavailable, falling back to search"),
            }
        }

        self.wikipedia_search(&query).await
    }
}
