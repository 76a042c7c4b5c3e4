//! Advisory tools: weather advice, crop suggestion, fertilizer schedule
//! and government scheme lookup. All of them are prompt glue over the
//! provider client.

use tracing::warn;

use crate::api::gemini::GeminiClient;
use crate::models::MarketUpdates;
use crate::services::GENERATION_FALLBACK;

const SCHEMES_FALLBACK: &str = "Unable to fetch real-time updates.";

pub fn weather_prompt(location: &str) -> String {
    format!(
        "I am a farmer in {}. Provide a detailed farming advisory based on \
         typical weather in this region right now. Include precautions for \
         current crops.",
        location
    )
}

pub fn crop_suggestion_prompt(soil: &str, season: &str) -> String {
    format!(
        "Suggest profitable and suitable crops for {} during {} season in \
         India. Provide estimated duration, potential yield, and market value \
         for each.",
        soil, season
    )
}

/// Empty acres defaults to "1", empty stage to "General"
pub fn fertilizer_prompt(crop: &str, acres: &str, stage: &str) -> String {
    let acres = if acres.is_empty() { "1" } else { acres };
    let stage = if stage.is_empty() { "General" } else { stage };
    format!(
        "Recommend a detailed fertilizer schedule for {} (Area: {} acres, \
         Stage: {}). Include both organic (FYM, Vermicompost) and chemical \
         (NPK) options with dosages.",
        crop, acres, stage
    )
}

pub fn schemes_prompt(region: &str) -> String {
    format!(
        "List current agricultural schemes, subsidies, and financial aid \
         available for farmers in {}, India. Include eligibility and how to \
         apply.",
        region
    )
}

/// Weather advisory for a farm location
pub async fn get_weather_advice(client: &GeminiClient, location: &str) -> String {
    generate_or_fallback(client, &weather_prompt(location)).await
}

/// Crop recommendation for a soil type and season
pub async fn get_crop_suggestion(client: &GeminiClient, soil: &str, season: &str) -> String {
    generate_or_fallback(client, &crop_suggestion_prompt(soil, season)).await
}

/// Fertilizer schedule for a crop, land area and growth stage
pub async fn get_fertilizer_schedule(
    client: &GeminiClient,
    crop: &str,
    acres: &str,
    stage: &str,
) -> String {
    generate_or_fallback(client, &fertilizer_prompt(crop, acres, stage)).await
}

/// Government schemes for a region, grounded in web search results
pub async fn get_schemes(client: &GeminiClient, region: &str) -> MarketUpdates {
    match client.get_market_updates(&schemes_prompt(region)).await {
        Ok(updates) => updates,
        Err(e) => {
            warn!("Scheme lookup failed: {}", e);
            MarketUpdates {
                text: SCHEMES_FALLBACK.to_string(),
                links: Vec::new(),
            }
        }
    }
}

async fn generate_or_fallback(client: &GeminiClient, prompt: &str) -> String {
    client.generate_text(prompt, None).await.unwrap_or_else(|e| {
        warn!("Advisory generation failed: {}", e);
        GENERATION_FALLBACK.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_carry_the_form_inputs() {
        assert!(weather_prompt("Madurai, Tamil Nadu").contains("Madurai, Tamil Nadu"));
        let crop = crop_suggestion_prompt("Black Soil", "June (Kharif)");
        assert!(crop.contains("Black Soil"));
        assert!(crop.contains("June (Kharif)"));
        assert!(schemes_prompt("Karnataka").contains("Karnataka, India"));
    }

    #[test]
    fn test_fertilizer_prompt_defaults() {
        let prompt = fertilizer_prompt("Rice", "", "");
        assert!(prompt.contains("Area: 1 acres"));
        assert!(prompt.contains("Stage: General"));

        let prompt = fertilizer_prompt("Rice", "2.5", "Flowering");
        assert!(prompt.contains("Area: 2.5 acres"));
        assert!(prompt.contains("Stage: Flowering"));
    }
}
