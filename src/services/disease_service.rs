//! Crop Doctor: photo-based disease diagnosis through the vision endpoint

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::warn;

use crate::api::gemini::GeminiClient;

const DIAGNOSIS_PROMPT: &str = "Analyze this image of a crop. 1. Identify the crop. \
    2. DETECT DISEASE/PEST: If healthy, explicitly state it. If diseased, identify \
    the specific disease/pest. 3. SYMPTOMS: List visual symptoms. 4. TREATMENT: \
    Suggest organic and chemical control methods. Format with Markdown headings.";

const DIAGNOSIS_FALLBACK: &str = "Error analyzing image. Please try again.";

/// Strip the `data:image/...;base64,` prefix from a data URL.
/// Input without a prefix is returned unchanged.
pub fn strip_data_url(input: &str) -> &str {
    input.split_once(',').map(|(_, rest)| rest).unwrap_or(input)
}

/// Base64-encode raw image bytes for the vision endpoint
pub fn encode_image(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Diagnose a crop photo. Provider failures degrade to a static
/// fallback message.
pub async fn diagnose(client: &GeminiClient, base64_image: &str) -> String {
    match client.analyze_image(base64_image, DIAGNOSIS_PROMPT).await {
        Ok(report) => report,
        Err(e) => {
            warn!("Image analysis failed: {}", e);
            DIAGNOSIS_FALLBACK.to_string()
        }
    }
}
