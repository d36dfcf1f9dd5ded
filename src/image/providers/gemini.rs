//! Gemini (Google) base image provider.

use crate::error::{parse_retry_after, sanitize_error_message, GenerationError};
use crate::image::provider::{to_canonical, ImageProvider};
use crate::image::types::{
    GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat, ImageProviderKind,
    CANONICAL_SIZE,
};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Instant;

type Result<T> = std::result::Result<T, GenerationError>;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini image model variants.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GeminiModel {
    /// Gemini 2.5 Flash Image (fast, economical).
    #[default]
    FlashImage,
    /// Gemini 3 Pro Image (highest quality).
    ProImage,
    /// Any other model id accepted by `generateContent`.
    Custom(String),
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &str {
        match self {
            Self::FlashImage => "gemini-2.5-flash-image",
            Self::ProImage => "gemini-3-pro-image-preview",
            Self::Custom(id) => id,
        }
    }

    /// Resolves a configured model id, falling back to a custom id.
    pub fn from_id(id: &str) -> Self {
        match id {
            "gemini-2.5-flash-image" | "flash" => Self::FlashImage,
            "gemini-3-pro-image-preview" | "pro" => Self::ProImage,
            other => Self::Custom(other.to_string()),
        }
    }
}

/// Builder for GeminiProvider.
#[derive(Debug, Clone, Default)]
pub struct GeminiProviderBuilder {
    api_key: Option<String>,
    model: GeminiModel,
}

impl GeminiProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `GEMINI_API_KEY`, then `GOOGLE_API_KEY`.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the Gemini model variant.
    pub fn model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }

    /// Builds the provider, resolving the API key.
    pub fn build(self) -> Result<GeminiProvider> {
        let api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .ok_or_else(|| {
                GenerationError::Auth(
                    "GEMINI_API_KEY not set and no API key provided".into(),
                )
            })?;

        Ok(GeminiProvider {
            client: reqwest::Client::new(),
            api_key,
            model: self.model,
        })
    }
}

/// Gemini base image provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: GeminiModel,
}

impl GeminiProvider {
    /// Creates a new `GeminiProviderBuilder`.
    pub fn builder() -> GeminiProviderBuilder {
        GeminiProviderBuilder::new()
    }

    async fn generate_impl(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        let start = Instant::now();

        let url = format!("{}/{}:generateContent", API_BASE, self.model.as_str());
        let body = GeminiRequest::from_generation_request(request);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
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
        let bytes = extract_image_bytes(gemini_response)?;
        tracing::debug!(
            bytes = bytes.len(),
            format = ?ImageFormat::from_magic_bytes(&bytes),
            "decoding inline image"
        );

        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| GenerationError::Decode(e.to_string()))?
            .to_rgb8();

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            model = self.model.as_str(),
            duration_ms,
            width = decoded.width(),
            height = decoded.height(),
            "Gemini generation complete"
        );

        Ok(GeneratedImage::new(
            to_canonical(decoded, CANONICAL_SIZE),
            ImageProviderKind::Gemini,
            GenerationMetadata {
                model: Some(self.model.as_str().to_string()),
                duration_ms: Some(duration_ms),
            },
        ))
    }
}

/// Pulls the first inline image out of a response, mapping blocks and
/// empty answers to errors.
fn extract_image_bytes(response: GeminiResponse) -> Result<Vec<u8>> {
    // Blocked prompts come back as HTTP 200
    if let Some(ref feedback) = response.prompt_feedback {
        if let Some(ref reason) = feedback.block_reason {
            let msg = feedback
                .block_reason_message
                .clone()
                .unwrap_or_else(|| format!("Prompt blocked: {}", reason));
            return Err(GenerationError::ContentBlocked(msg));
        }
    }

    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        GenerationError::UnexpectedResponse("No candidates in Gemini response".into())
    })?;

    if let Some(ref finish_reason) = candidate.finish_reason {
        match finish_reason.as_str() {
            "SAFETY" | "IMAGE_SAFETY" | "IMAGE_PROHIBITED_CONTENT" | "PROHIBITED_CONTENT"
            | "RECITATION" | "IMAGE_RECITATION" | "BLOCKLIST" => {
                return Err(GenerationError::ContentBlocked(format!(
                    "Content blocked by Gemini safety filter: {}",
                    finish_reason
                )));
            }
            "IMAGE_OTHER" | "NO_IMAGE" => {
                return Err(GenerationError::UnexpectedResponse(format!(
                    "Generation failed: {}",
                    finish_reason
                )));
            }
            _ => {}
        }
    }

    let inline_data = candidate
        .content
        .ok_or_else(|| GenerationError::UnexpectedResponse("No content in Gemini candidate".into()))?
        .parts
        .into_iter()
        .find_map(|p| p.inline_data)
        .ok_or_else(|| {
            GenerationError::UnexpectedResponse("No image data in Gemini response".into())
        })?;

    base64::engine::general_purpose::STANDARD
        .decode(&inline_data.data)
        .map_err(|e| GenerationError::Decode(e.to_string()))
}

fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> GenerationError {
    let text = sanitize_error_message(text);
    match status {
        401 | 403 => GenerationError::Auth(text),
        404 => GenerationError::InvalidRequest(
            "Model not found. Verify the model name is correct.".into(),
        ),
        429 => GenerationError::RateLimited {
            retry_after: parse_retry_after(headers).map(std::time::Duration::from_secs),
        },
        _ => {
            let lower = text.to_lowercase();
            if lower.contains("safety") || lower.contains("blocked") || lower.contains("prohibited")
            {
                GenerationError::ContentBlocked(text)
            } else {
                GenerationError::Api {
                    status,
                    message: text,
                }
            }
        }
    }
}

#[async_trait]
impl ImageProvider for GeminiProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        self.generate_impl(request).await
    }

    fn kind(&self) -> ImageProviderKind {
        ImageProviderKind::Gemini
    }

    async fn health_check(&self) -> Result<()> {
        let url = format!("{}/{}", API_BASE, self.model.as_str());

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        match response.status().as_u16() {
            401 | 403 => Err(GenerationError::Auth("Invalid API key".into())),
            404 => Err(GenerationError::InvalidRequest(
                "Model not found. Verify the model name is correct.".into(),
            )),
            s if !(200..300).contains(&s) => Err(GenerationError::Api {
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
    parts: Vec<GeminiTextPart>,
}

#[derive(Debug, Serialize)]
struct GeminiTextPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
}

impl GeminiRequest {
    fn from_generation_request(req: &GenerationRequest) -> Self {
        Self {
            contents: vec![GeminiContent {
                parts: vec![GeminiTextPart {
                    text: req.prompt.clone(),
                }],
            }],
            generation_config: GeminiConfig {
                response_modalities: vec!["IMAGE".to_string()],
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
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[allow(dead_code)]
    mime_type: String,
    data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_model_ids() {
        assert_eq!(GeminiModel::FlashImage.as_str(), "gemini-2.5-flash-image");
        assert_eq!(GeminiModel::default(), GeminiModel::FlashImage);
        assert_eq!(GeminiModel::from_id("pro"), GeminiModel::ProImage);
        assert_eq!(
            GeminiModel::from_id("imagen-4.0").as_str(),
            "imagen-4.0"
        );
    }

    #[test]
    fn test_builder_with_explicit_key() {
        let provider = GeminiProviderBuilder::new()
            .api_key("test-key")
            .model(GeminiModel::ProImage)
            .build();
        assert!(provider.is_ok());
    }

    #[test]
    fn test_request_construction() {
        let req = GenerationRequest::new("A puppy");
        let gemini_req = GeminiRequest::from_generation_request(&req);

        assert_eq!(gemini_req.contents.len(), 1);
        assert_eq!(gemini_req.contents[0].parts[0].text, "A puppy");
        assert_eq!(
            gemini_req.generation_config.response_modalities,
            vec!["IMAGE"]
        );
    }

    #[test]
    fn test_request_serialization_uses_camel_case() {
        let req = GenerationRequest::new("A puppy");
        let json = serde_json::to_value(GeminiRequest::from_generation_request(&req)).unwrap();

        assert!(json.get("generationConfig").is_some());
        assert!(json.get("generation_config").is_none());
        assert_eq!(json["generationConfig"]["responseModalities"][0], "IMAGE");
    }

    #[test]
    fn test_extract_image_bytes() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [{"text": "here you go"}, {
                        "inlineData": {
                            "mimeType": "image/png",
                            "data": "iVBORw0KGgo="
                        }
                    }]
                },
                "finishReason": "STOP"
            }]
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let bytes = extract_image_bytes(resp).unwrap();
        assert_eq!(bytes, vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_extract_image_bytes_without_image() {
        let json = r#"{"candidates": [{"content": {"parts": [{}]}}]}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            extract_image_bytes(resp),
            Err(GenerationError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_extract_image_bytes_prompt_blocked() {
        let json = r#"{
            "candidates": [],
            "promptFeedback": {
                "blockReason": "SAFETY",
                "blockReasonMessage": "Prompt was blocked due to safety"
            }
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        match extract_image_bytes(resp) {
            Err(GenerationError::ContentBlocked(msg)) => {
                assert_eq!(msg, "Prompt was blocked due to safety")
            }
            other => panic!("expected ContentBlocked, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_image_bytes_safety_finish_reason() {
        let json = r#"{"candidates": [{"finishReason": "IMAGE_SAFETY"}]}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            extract_image_bytes(resp),
            Err(GenerationError::ContentBlocked(_))
        ));
    }

    #[test]
    fn test_parse_error_status_mapping() {
        let headers = reqwest::header::HeaderMap::new();
        assert!(matches!(
            parse_error(401, "bad key", &headers),
            GenerationError::Auth(_)
        ));
        assert!(matches!(
            parse_error(429, "quota", &headers),
            GenerationError::RateLimited { retry_after: None }
        ));
        assert!(matches!(
            parse_error(400, "request blocked by policy", &headers),
            GenerationError::ContentBlocked(_)
        ));
        assert!(matches!(
            parse_error(500, "boom", &headers),
            GenerationError::Api { status: 500, .. }
        ));
    }
}
