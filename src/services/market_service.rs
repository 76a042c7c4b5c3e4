//! Market intelligence: grounded news lookups and the AI price-trend
//! dataset behind the chart.

use serde_json::{json, Value};
use tracing::warn;

use crate::api::gemini::GeminiClient;
use crate::models::{ChartDataset, MarketUpdates};
use crate::services::chart_service;

const UPDATES_FALLBACK: &str = "Unable to fetch real-time updates.";

/// Prompt for the grounded market news query
pub fn market_updates_prompt(crop: &str) -> String {
    format!(
        "What are the current market prices and trends for {} in India? \
         Include major market yard prices if available.",
        crop
    )
}

/// Prompt for the structured price-trend dataset
pub fn chart_prompt(crop: &str) -> String {
    format!(
        "Generate a realistic price trend dataset for {} for the last 6 months \
         and a forecast for the next 2 months. Use realistic values in INR per \
         Quintal. Return JSON.",
        crop
    )
}

/// Response schema constraining the chart payload to
/// crop/currency/history/forecast with `YYYY-MM-DD` dates
pub fn chart_schema() -> Value {
    let point = json!({
        "type": "OBJECT",
        "properties": {
            "date": {"type": "STRING", "description": "Format YYYY-MM-DD"},
            "price": {"type": "NUMBER"}
        }
    });

    json!({
        "type": "OBJECT",
        "properties": {
            "crop": {"type": "STRING"},
            "currency": {"type": "STRING"},
            "history": {"type": "ARRAY", "items": point},
            "forecast": {"type": "ARRAY", "items": point}
        }
    })
}

/// Fetch grounded market news for a crop. Provider failures degrade to a
/// static fallback message with no links.
pub async fn fetch_market_updates(client: &GeminiClient, crop: &str) -> MarketUpdates {
    match client.get_market_updates(&market_updates_prompt(crop)).await {
        Ok(updates) => updates,
        Err(e) => {
            warn!("Market updates fetch failed: {}", e);
            MarketUpdates {
                text: UPDATES_FALLBACK.to_string(),
                links: Vec::new(),
            }
        }
    }
}

/// Fetch and normalize the price-trend dataset for a crop.
///
/// The provider payload is untrusted; normalization drops malformed points
/// and may legitimately yield an empty dataset.
pub async fn fetch_chart_dataset(client: &GeminiClient, crop: &str) -> Result<ChartDataset, String> {
    let raw = client
        .generate_json(&chart_prompt(crop), chart_schema())
        .await
        .map_err(|e| format!("Market data error: {}", e))?;

    Ok(chart_service::normalize_dataset(&raw))
}
