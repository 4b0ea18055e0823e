use super::format_usd;
use crate::args::ToolArgs;
use crate::context::ToolContext;
use crate::router::{AgentKind, ToolDescriptor, ToolHandler};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Write as _;
use tracing::debug;
use voxlink_core::{VoxlinkError, VoxlinkResult};

/// Technical analysis for a cryptocurrency: current price, 24h change
/// and volume, and 7/30-day simple moving averages with a plain-english
/// interpretation.
pub struct CryptoAnalysisTool {
    descriptor: ToolDescriptor,
    client: reqwest::Client,
    market_base: String,
}

impl CryptoAnalysisTool {
    pub fn new(client: reqwest::Client, market_base: String) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "crypto_technical_analysis".to_string(),
                agent: AgentKind::Trader,
                description:
                    "Fetch price, volume and moving averages for a cryptocurrency and interpret them."
                        .to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "cryptocurrency": {
                            "type": "string",
                            "description": "Name or ticker of the cryptocurrency, e.g. 'bitcoin' or 'ETH'"
                        }
                    },
                    "required": ["cryptocurrency"]
                }),
            },
            client,
            market_base,
        }
    }

    async fn fetch_json(&self, url: &str) -> VoxlinkResult<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| VoxlinkError::Tool(format!("market data request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(VoxlinkError::Tool(format!(
                "market data request failed with status {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| VoxlinkError::Tool(format!("market data was not valid JSON: {e}")))
    }

    async fn closing_prices(&self, symbol: &str) -> VoxlinkResult<Vec<f64>> {
        let url = format!(
            "{}/data/v2/histoday?fsym={symbol}&tsym=USD&limit=30",
            self.market_base
        );
        let data = self.fetch_json(&url).await?;
        if data["Response"].as_str() == Some("Error") {
            let message = data["Message"].as_str().unwrap_or("unknown market error");
            return Err(VoxlinkError::Tool(message.to_string()));
        }
        let days = data["Data"]["Data"]
            .as_array()
            .ok_or_else(|| VoxlinkError::Tool("missing historical price data".to_string()))?;
        Ok(days
            .iter()
            .filter_map(|d| d["close"].as_f64())
            .collect())
    }
}

/// Simple moving average over the trailing `period` samples; `None`
/// when there is not enough history.
fn sma(data: &[f64], period: usize) -> Option<f64> {
    if period == 0 || data.len() < period {
        return None;
    }
    let tail = &data[data.len() - period..];
    Some(tail.iter().sum::<f64>() / period as f64)
}

#[async_trait]
impl ToolHandler for CryptoAnalysisTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn run(&self, args: ToolArgs, _ctx: &ToolContext) -> VoxlinkResult<String> {
        let ToolArgs::CryptoTechnicalAnalysis { symbol } = args else {
            return Err(VoxlinkError::Tool(
                "expected crypto_technical_analysis arguments".into(),
            ));
        };
        let ticker = symbol.to_uppercase();
        debug!(symbol = %ticker, "crypto technical analysis");

        let closes = self.closing_prices(&ticker).await?;
        let sma7 = sma(&closes, 7);
        let sma30 = sma(&closes, 30);

        let url = format!(
            "{}/data/pricemultifull?fsyms={ticker}&tsyms=USD",
            self.market_base
        );
        let current = self.fetch_json(&url).await?;
        let raw = &current["RAW"][&ticker]["USD"];
        let price = raw["PRICE"].as_f64().ok_or_else(|| {
            VoxlinkError::Tool(format!(
                "no market data found for {ticker}; check the symbol"
            ))
        })?;
        let change_pct = raw["CHANGEPCT24HOUR"].as_f64().unwrap_or(0.0);
        let volume = raw["VOLUME24HOUR"].as_f64().unwrap_or(0.0);

        let mut out = format!("Here is a summary of technical indicators for {ticker}:\n");
        let _ = writeln!(out, "- Current Price: {}", format_usd(price));
        let _ = writeln!(out, "- 24-Hour Change: {change_pct:.2}%");
        let _ = writeln!(out, "- 24-Hour Volume: {}", format_usd(volume));
        if let Some(v) = sma7 {
            let _ = writeln!(out, "- 7-Day SMA: {}", format_usd(v));
        }
        if let Some(v) = sma30 {
            let _ = writeln!(out, "- 30-Day SMA: {}", format_usd(v));
        }

        if let (Some(short), Some(long)) = (sma7, sma30) {
            out.push_str("\nData interpretation:\n");
            if price > short {
                out.push_str(
                    "- The current price is trading above its 7-day average, a short-term bullish signal.\n",
                );
            } else {
                out.push_str(
                    "- The current price is trading below its 7-day average, a short-term bearish signal.\n",
                );
            }
            if price > long {
                out.push_str(
                    "- The price is also above its 30-day average, suggesting a positive medium-term trend.",
                );
            } else {
                out.push_str(
                    "- The price is also below its 30-day average, suggesting a negative medium-term trend.",
                );
            }
        }

        Ok(out)
    }
}
