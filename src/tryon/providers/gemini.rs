//! Gemini (Google) content generation client.

use crate::config::ApiKey;
use crate::error::{parse_retry_after, sanitize_error_message, Result, TryOnError};
use crate::tryon::content::{Blob, Candidate, ContentRequest, ContentResponse, Part};
use crate::tryon::provider::ContentGenerator;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Public Gemini API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiModel {
    /// Nano Banana - Gemini 2.5 Flash Image (fast, economical).
    NanoBanana,
    /// Nano Banana Pro - Gemini 3 Pro Image (highest quality).
    #[default]
    NanoBananaPro,
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NanoBanana => "gemini-2.5-flash-image",
            Self::NanoBananaPro => "gemini-3-pro-image-preview",
        }
    }
}

impl std::fmt::Display for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builder for [`GeminiClient`].
#[derive(Debug, Clone)]
pub struct GeminiClientBuilder {
    api_key: Option<String>,
    model: GeminiModel,
    base_url: String,
    timeout: Option<Duration>,
}

impl Default for GeminiClientBuilder {
    fn default() -> Self {
        Self {
            api_key: None,
            model: GeminiModel::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
        }
    }
}

impl GeminiClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `GEMINI_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the Gemini model variant.
    pub fn model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }

    /// Overrides the API root (used against local mock servers).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets a whole-request timeout. Without one the transport default applies.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the client, resolving the API key.
    pub fn build(mut self) -> Result<GeminiClient> {
        let api_key = ApiKey::resolve(self.api_key.take())?;
        self.build_with_key(api_key)
    }

    pub(crate) fn build_with_key(self, api_key: ApiKey) -> Result<GeminiClient> {
        let mut http = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }

        Ok(GeminiClient {
            client: http.build()?,
            api_key,
            model: self.model,
            base_url: self.base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Gemini `generateContent` client.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: ApiKey,
    model: GeminiModel,
    base_url: String,
}

impl GeminiClient {
    /// Creates a new `GeminiClientBuilder`.
    pub fn builder() -> GeminiClientBuilder {
        GeminiClientBuilder::new()
    }

    /// The configured model.
    pub fn model(&self) -> GeminiModel {
        self.model
    }

    fn model_url(&self) -> String {
        format!("{}/v1beta/models/{}", self.base_url, self.model.as_str())
    }

    async fn generate_impl(&self, request: &ContentRequest) -> Result<ContentResponse> {
        let start = Instant::now();
        let url = format!("{}:generateContent", self.model_url());
        let body = GeminiRequest::from_content_request(request);

        tracing::debug!(
            model = self.model.as_str(),
            parts = request.parts.len(),
            "sending Gemini generateContent request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }

        let gemini_response: GeminiResponse = response.json().await?;

        if let Some(ref feedback) = gemini_response.prompt_feedback {
            if let Some(ref reason) = feedback.block_reason {
                tracing::warn!(
                    reason = %reason,
                    detail = feedback.block_reason_message.as_deref().unwrap_or(""),
                    "Gemini blocked the prompt"
                );
            }
        }
        for candidate in &gemini_response.candidates {
            match candidate.finish_reason.as_deref() {
                None | Some("STOP") | Some("MAX_TOKENS") => {}
                Some(reason) => tracing::warn!(reason, "Gemini candidate finished abnormally"),
            }
        }

        let content = ContentResponse::try_from(gemini_response)?;

        tracing::debug!(
            candidates = content.candidates.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Gemini generateContent complete"
        );

        Ok(content)
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> TryOnError {
    let text = sanitize_error_message(text);
    if status == 404 {
        return TryOnError::InvalidRequest(
            "Model not found. Verify the model name is correct.".into(),
        );
    }
    if status == 429 {
        let retry_after = parse_retry_after(headers).map(Duration::from_secs);
        return TryOnError::RateLimited { retry_after };
    }
    if status == 401 || status == 403 {
        return TryOnError::Auth(text);
    }
    TryOnError::Api {
        status,
        message: text,
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate_content(&self, request: &ContentRequest) -> Result<ContentResponse> {
        self.generate_impl(request).await
    }

    fn model_id(&self) -> &str {
        self.model.as_str()
    }

    async fn health_check(&self) -> Result<()> {
        let response = self
            .client
            .get(self.model_url())
            .header("x-goog-api-key", self.api_key.expose())
            .send()
            .await?;

        match response.status().as_u16() {
            401 | 403 => Err(TryOnError::Auth("Invalid API key".into())),
            404 => Err(TryOnError::InvalidRequest(
                "Model not found. Verify the model name is correct.".into(),
            )),
            s if !(200..300).contains(&s) => Err(TryOnError::Api {
                status: s,
                message: "Health check failed".into(),
            }),
            _ => Ok(()),
        }
    }
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<&'static str>,
}

impl GeminiRequest {
    fn from_content_request(req: &ContentRequest) -> Self {
        let parts = req
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => GeminiRequestPart::Text { text: text.clone() },
                Part::InlineData(blob) => GeminiRequestPart::InlineData {
                    inline_data: InlineData {
                        mime_type: blob.mime_type.clone(),
                        data: base64::engine::general_purpose::STANDARD.encode(&blob.data),
                    },
                },
            })
            .collect();

        Self {
            contents: vec![GeminiContent { role: "user", parts }],
            generation_config: GeminiConfig {
                response_modalities: vec!["TEXT", "IMAGE"],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, alias = "inline_data")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(alias = "mime_type")]
    mime_type: String,
    data: String,
}

impl TryFrom<GeminiResponse> for ContentResponse {
    type Error = TryOnError;

    fn try_from(response: GeminiResponse) -> Result<Self> {
        let mut candidates = Vec::with_capacity(response.candidates.len());
        for candidate in response.candidates {
            let mut parts = Vec::new();
            for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
                if let Some(inline) = part.inline_data {
                    let data = base64::engine::general_purpose::STANDARD
                        .decode(inline.data.trim())
                        .map_err(|e| TryOnError::Decode(e.to_string()))?;
                    parts.push(Part::InlineData(Blob {
                        mime_type: inline.mime_type,
                        data,
                    }));
                } else if let Some(text) = part.text {
                    parts.push(Part::Text(text));
                }
            }
            candidates.push(Candidate {
                parts,
                finish_reason: candidate.finish_reason,
            });
        }

        Ok(ContentResponse {
            candidates,
            block_reason: response.prompt_feedback.and_then(|f| f.block_reason),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_gemini_model_as_str() {
        assert_eq!(GeminiModel::NanoBanana.as_str(), "gemini-2.5-flash-image");
        assert_eq!(
            GeminiModel::NanoBananaPro.as_str(),
            "gemini-3-pro-image-preview"
        );
    }

    #[test]
    fn test_gemini_model_default() {
        assert_eq!(GeminiModel::default(), GeminiModel::NanoBananaPro);
    }

    #[test]
    fn test_builder_with_explicit_key() {
        let client = GeminiClientBuilder::new()
            .api_key("test-key")
            .model(GeminiModel::NanoBanana)
            .base_url("http://localhost:9999/")
            .build()
            .unwrap();
        assert_eq!(client.model_id(), "gemini-2.5-flash-image");
        assert_eq!(
            client.model_url(),
            "http://localhost:9999/v1beta/models/gemini-2.5-flash-image"
        );
    }

    #[test]
    fn test_builder_keeps_settings_after_key_resolution() {
        let client = GeminiClient::builder()
            .api_key("  test-key  ")
            .base_url("http://127.0.0.1:8080//")
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(client.api_key.expose(), "test-key");
        assert_eq!(
            client.model_url(),
            "http://127.0.0.1:8080/v1beta/models/gemini-3-pro-image-preview"
        );
    }

    #[test]
    fn test_builder_rejects_placeholder_key() {
        let err = GeminiClientBuilder::new()
            .api_key("your_api_key_here")
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_request_serialization() {
        let req = ContentRequest::new()
            .with_part(Part::inline("image/png", vec![1, 2, 3]))
            .with_part(Part::text("Wear it"));
        let json = serde_json::to_value(GeminiRequest::from_content_request(&req)).unwrap();

        assert!(json.get("generationConfig").is_some());
        assert!(json.get("generation_config").is_none());
        assert_eq!(
            json["generationConfig"]["responseModalities"],
            serde_json::json!(["TEXT", "IMAGE"])
        );

        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "AQID");
        assert_eq!(parts[1]["text"], "Wear it");
    }

    #[test]
    fn test_response_conversion() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Here you go"},
                        {"inlineData": {"mimeType": "image/png", "data": "AQID"}}
                    ]
                },
                "finishReason": "STOP"
            }]
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let content = ContentResponse::try_from(resp).unwrap();

        assert_eq!(content.candidates.len(), 1);
        let candidate = &content.candidates[0];
        assert_eq!(candidate.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(candidate.parts[0], Part::text("Here you go"));
        assert_eq!(candidate.parts[1], Part::inline("image/png", vec![1, 2, 3]));
    }

    #[test]
    fn test_response_with_snake_case_inline_data() {
        let json = r#"{"candidates": [{"content": {"parts": [
            {"inline_data": {"mime_type": "image/jpeg", "data": "AQID"}}
        ]}}]}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let content = ContentResponse::try_from(resp).unwrap();
        assert_eq!(
            content.candidates[0].parts[0],
            Part::inline("image/jpeg", vec![1, 2, 3])
        );
    }

    #[test]
    fn test_response_bad_base64() {
        let json = r#"{"candidates": [{"content": {"parts": [
            {"inlineData": {"mimeType": "image/png", "data": "not base64!!"}}
        ]}}]}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let err = ContentResponse::try_from(resp).unwrap_err();
        assert!(matches!(err, TryOnError::Decode(_)));
    }

    #[test]
    fn test_response_with_prompt_feedback_block() {
        let json = r#"{
            "candidates": [],
            "promptFeedback": {
                "blockReason": "SAFETY",
                "blockReasonMessage": "Prompt was blocked due to safety"
            }
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let content = ContentResponse::try_from(resp).unwrap();
        assert!(content.candidates.is_empty());
        assert_eq!(content.block_reason.as_deref(), Some("SAFETY"));
    }

    #[test]
    fn test_response_candidate_without_content() {
        let json = r#"{"candidates": [{"finishReason": "IMAGE_SAFETY"}]}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let content = ContentResponse::try_from(resp).unwrap();
        assert!(content.candidates[0].parts.is_empty());
        assert!(content.into_first_inline_data().is_none());
    }

    #[test]
    fn test_parse_error_mapping() {
        let headers = reqwest::header::HeaderMap::new();
        let body = r#"{"error": {"code": 403, "message": "Permission denied"}}"#;
        assert!(matches!(
            parse_error(403, body, &headers),
            TryOnError::Auth(ref m) if m == "Permission denied"
        ));
        assert!(matches!(
            parse_error(404, "", &headers),
            TryOnError::InvalidRequest(_)
        ));
        assert!(matches!(
            parse_error(500, "boom", &headers),
            TryOnError::Api { status: 500, ref message } if message == "boom"
        ));

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::RETRY_AFTER, "12".parse().unwrap());
        assert!(matches!(
            parse_error(429, "", &headers),
            TryOnError::RateLimited { retry_after: Some(d) } if d == Duration::from_secs(12)
        ));
    }
}
