//! Built-in tool handlers, grouped by owning agent.

mod device;
mod document;
mod market;
mod ops;
mod project;
mod search_web;

pub use device::{
    CaptureScreenTool, CopyToClipboardTool, OfferCoachingTipTool, RefreshWalletTool,
    ScanVisualCodesTool,
};
pub use document::QueryDocumentTool;
pub use market::CryptoAnalysisTool;
pub use ops::{CheckInventoryTool, GenerateAlertTool, GenerateChartTool, ScheduleMeetingTool};
pub use project::{ListDirectoryTool, ReadProjectFileTool};
pub use search_web::SearchWebTool;

use crate::router::ToolRouter;
use std::sync::Arc;
use std::time::Duration;

/// Base URLs for the network-backed tools. Overridable so tests can
/// point them at a local mock server.
#[derive(Debug, Clone)]
pub struct BuiltinEndpoints {
    /// Wikipedia search API host.
    pub wikipedia_base: String,
    /// Bitcoin spot-price ticker host.
    pub ticker_base: String,
    /// Crypto market-data host.
    pub market_base: String,
}

impl Default for BuiltinEndpoints {
    fn default() -> Self {
        Self {
            wikipedia_base: "https://en.wikipedia.org".to_string(),
            ticker_base: "https://blockchain.info".to_string(),
            market_base: "https://min-api.cryptocompare.com".to_string(),
        }
    }
}

/// US-dollar formatting with thousands separators, e.g. `$64,250.50`.
pub(crate) fn format_usd(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let dollars = cents / 100;
    let rem = (cents % 100).abs();
    let mut whole = dollars.abs().to_string();
    let mut grouped = String::new();
    while whole.len() > 3 {
        let split = whole.len() - 3;
        grouped = format!(",{}{}", &whole[split..], grouped);
        whole.truncate(split);
    }
    let sign = if dollars < 0 { "-" } else { "" };
    format!("{sign}${whole}{grouped}.{rem:02}")
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Installs the standard handler set into a router.
pub fn register_defaults(router: &mut ToolRouter, endpoints: BuiltinEndpoints) {
    let client = http_client();

    router.register(Arc::new(SearchWebTool::new(
        client.clone(),
        endpoints.wikipedia_base,
        endpoints.ticker_base,
    )));
    router.register(Arc::new(CryptoAnalysisTool::new(
        client,
        endpoints.market_base,
    )));
    router.register(Arc::new(QueryDocumentTool::new()));
    router.register(Arc::new(ListDirectoryTool::new()));
    router.register(Arc::new(ReadProjectFileTool::new()));
    router.register(Arc::new(CheckInventoryTool::new()));
    router.register(Arc::new(GenerateAlertTool::new()));
    router.register(Arc::new(ScheduleMeetingTool::new()));
    router.register(Arc::new(GenerateChartTool::new()));
    router.register(Arc::new(CaptureScreenTool::new()));
    router.register(Arc::new(CopyToClipboardTool::new()));
    router.register(Arc::new(ScanVisualCodesTool::new()));
    router.register(Arc::new(OfferCoachingTipTool::new()));
    router.register(Arc::new(RefreshWalletTool::new()));
}
