use reqwest::Client as HttpClient;
use tracing::warn;

use super::models::{
    ApiError, Content, ErrorResponse, GenerateContentRequest, GenerateContentResponse,
    GenerationConfig, InlineData, Part, Tool,
};
use crate::models::MarketUpdates;

/// Gemini API client handling all AgriBoost AI interactions
pub struct GeminiClient {
    http_client: HttpClient,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";
    const DEFAULT_MODEL: &'static str = "gemini-2.5-flash";

    /// Create a new client using the default endpoint and model
    pub fn new(api_key: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
        }
    }

    /// Create a new client with a custom base URL (for testing)
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            base_url,
            model: Self::DEFAULT_MODEL.to_string(),
        }
    }

    /// POST /models/{model}:generateContent
    async fn generate(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ApiError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::RequestError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Self::handle_error_response(status, response).await);
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| ApiError::DeserializationError(format!("Failed to parse response: {}", e)))
    }

    /// Parse error response based on HTTP status code
    async fn handle_error_response(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> ApiError {
        let body_text = response.text().await.unwrap_or_default();
        Self::error_from_status(status.as_u16(), body_text)
    }

    /// Map an HTTP status and response body to a typed error. The API wraps
    /// its message in an `error` object when it can; fall back to the raw
    /// body otherwise.
    fn error_from_status(status_code: u16, body_text: String) -> ApiError {
        let message = serde_json::from_str::<ErrorResponse>(&body_text)
            .ok()
            .and_then(|e| e.error)
            .and_then(|detail| detail.message)
            .unwrap_or_else(|| body_text.clone());

        match status_code {
            400 => ApiError::BadRequest(message),
            401 => ApiError::Unauthorized(message),
            403 => ApiError::Forbidden(message),
            404 => ApiError::NotFound(message),
            429 => {
                warn!("Rate limited by provider: {}", message);
                ApiError::RateLimited(message)
            }
            500..=599 => {
                warn!("Server error {}: {}", status_code, message);
                ApiError::ServerError(status_code, message)
            }
            _ => ApiError::HttpError(status_code, message),
        }
    }

    /// Plain text generation, optionally steered by a system instruction
    ///
    /// # Returns
    /// * `Ok(String)` - The model's text answer
    /// * `Err(ApiError)` - Error with detailed error type
    pub async fn generate_text(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> Result<String, ApiError> {
        let request = GenerateContentRequest {
            contents: vec![Content::from_text(prompt)],
            system_instruction: system_instruction.map(Content::from_text),
            ..Default::default()
        };

        let response = self.generate(&request).await?;
        response.text().ok_or(ApiError::EmptyResponse)
    }

    /// Structured generation: constrain the response to JSON matching
    /// `schema` and parse it.
    ///
    /// The returned value is untrusted; callers normalize it before use.
    pub async fn generate_json(
        &self,
        prompt: &str,
        schema: serde_json::Value,
    ) -> Result<serde_json::Value, ApiError> {
        let request = GenerateContentRequest {
            contents: vec![Content::from_text(prompt)],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(schema),
            }),
            ..Default::default()
        };

        let response = self.generate(&request).await?;
        let text = response.text().ok_or(ApiError::EmptyResponse)?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::DeserializationError(format!("Model returned invalid JSON: {}", e)))
    }

    /// Vision analysis of a base64-encoded JPEG image
    pub async fn analyze_image(
        &self,
        base64_image: &str,
        prompt: &str,
    ) -> Result<String, ApiError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: "image/jpeg".to_string(),
                            data: base64_image.to_string(),
                        }),
                    },
                    Part {
                        text: Some(prompt.to_string()),
                        inline_data: None,
                    },
                ],
            }],
            ..Default::default()
        };

        let response = self.generate(&request).await?;
        response.text().ok_or(ApiError::EmptyResponse)
    }

    /// Search-grounded answer: free text plus the web sources it cites
    pub async fn get_market_updates(&self, query: &str) -> Result<MarketUpdates, ApiError> {
        let request = GenerateContentRequest {
            contents: vec![Content::from_text(query)],
            tools: Some(vec![Tool::google_search()]),
            ..Default::default()
        };

        let response = self.generate(&request).await?;
        let text = response.text().ok_or(ApiError::EmptyResponse)?;
        let links = response.grounding_links();

        Ok(MarketUpdates { text, links })
    }
}
