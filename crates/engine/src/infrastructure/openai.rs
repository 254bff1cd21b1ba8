//! OpenAI vision client (Responses API)
//!
//! One HTTP attempt per call. Retries live in [`super::resilient_extraction`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::infrastructure::image_prep::{prepare_image, ImagePrepConfig};
use crate::infrastructure::ports::{
    ExtractionError, ImageExtractionPort, StructuredExtractionRequest,
};

/// Default OpenAI base URL.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default vision-capable model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1";

/// Per-attempt timeout for plain OCR.
pub const TEXT_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(45);

/// Per-attempt timeout for structured extraction.
pub const STRUCTURED_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(60);

const TEXT_PROMPT: &str = "Transcribe all text visible in this image exactly as written. \
Return only the transcribed text.";

// Phrases the model uses when it declines in the output text instead of an error.
const REFUSAL_PHRASES: &[&str] = &[
    "i'm sorry, but i can't",
    "i\u{2019}m sorry, but i can\u{2019}t",
    "i can't assist",
    "i cannot assist",
    "i can't help with",
    "content policy",
];

/// Client for the OpenAI Responses API
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    text_timeout: Duration,
    structured_timeout: Duration,
    image_config: ImagePrepConfig,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        // Timeouts are applied per request since they differ by operation.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            text_timeout: TEXT_EXTRACTION_TIMEOUT,
            structured_timeout: STRUCTURED_EXTRACTION_TIMEOUT,
            image_config: ImagePrepConfig::default(),
        }
    }

    /// Override both per-attempt timeouts (for testing).
    pub fn with_timeouts(mut self, text: Duration, structured: Duration) -> Self {
        self.text_timeout = text;
        self.structured_timeout = structured;
        self
    }

    pub fn with_image_config(mut self, config: ImagePrepConfig) -> Self {
        self.image_config = config;
        self
    }

    async fn send(
        &self,
        request: &ResponsesRequest,
        timeout: Duration,
    ) -> Result<String, ExtractionError> {
        let response = self
            .client
            .post(format!("{}/responses", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .map_err(|e| transport_error(e, timeout))?;
            let message = serde_json::from_str::<ApiErrorEnvelope>(&error_text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(error_text);
            return Err(ExtractionError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let api_response: ResponsesResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::InvalidResponse(e.to_string()))?;

        convert_response(api_response)
    }
}

#[async_trait]
impl ImageExtractionPort for OpenAiClient {
    async fn extract_text(&self, image: &[u8]) -> Result<String, ExtractionError> {
        let prepared = prepare_image(image, &self.image_config)?;
        let request = ResponsesRequest {
            model: self.model.clone(),
            input: vec![InputMessage {
                role: "user",
                content: vec![
                    InputContent::InputText {
                        text: TEXT_PROMPT.to_string(),
                    },
                    InputContent::InputImage {
                        image_url: prepared.data_url(),
                    },
                ],
            }],
            text: None,
        };
        self.send(&request, self.text_timeout).await
    }

    async fn extract_structured(
        &self,
        request: &StructuredExtractionRequest,
    ) -> Result<String, ExtractionError> {
        let mut content = vec![InputContent::InputText {
            text: structured_prompt(request),
        }];
        if let Some(template) = &request.template_image {
            let prepared = prepare_image(template, &self.image_config)?;
            content.push(InputContent::InputImage {
                image_url: prepared.data_url(),
            });
        }
        let filled = prepare_image(&request.filled_image, &self.image_config)?;
        content.push(InputContent::InputImage {
            image_url: filled.data_url(),
        });

        let api_request = ResponsesRequest {
            model: self.model.clone(),
            input: vec![InputMessage {
                role: "user",
                content,
            }],
            text: Some(TextOptions {
                format: TextFormat { kind: "json_object" },
            }),
        };
        self.send(&api_request, self.structured_timeout).await
    }
}

fn structured_prompt(request: &StructuredExtractionRequest) -> String {
    let mut prompt = request.instructions.trim().to_string();
    if !request.context.is_empty() {
        prompt.push_str("\n\nContext:");
        for line in &request.context {
            prompt.push_str("\n- ");
            prompt.push_str(line);
        }
    }
    if request.template_image.is_some() {
        prompt.push_str(
            "\n\nThe first image is the blank sheet. The second image is the sheet as the \
             player filled it in. Only report marks that differ from the blank sheet.",
        );
    }
    let schema =
        serde_json::to_string_pretty(&request.schema).unwrap_or_else(|_| "{}".to_string());
    prompt.push_str("\n\nRespond with a single JSON object of exactly this shape:\n");
    prompt.push_str(&schema);
    prompt
}

fn transport_error(error: reqwest::Error, timeout: Duration) -> ExtractionError {
    if error.is_timeout() {
        ExtractionError::Timeout(timeout)
    } else {
        ExtractionError::Network(error.to_string())
    }
}

/// True when the output text reads like the model declining to answer.
pub fn looks_like_refusal(text: &str) -> bool {
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') {
        return false;
    }
    let lowered = trimmed.to_lowercase();
    REFUSAL_PHRASES.iter().any(|p| lowered.contains(p))
}

fn convert_response(response: ResponsesResponse) -> Result<String, ExtractionError> {
    if let Some(error) = response.error {
        return Err(ExtractionError::Api {
            error_type: error.error_type.unwrap_or_else(|| "unknown".to_string()),
            message: error.message,
        });
    }

    let mut text = String::new();
    for item in response.output {
        for part in item.content {
            match part.kind.as_str() {
                "output_text" => {
                    if let Some(segment) = part.text {
                        text.push_str(&segment);
                    }
                }
                "refusal" => {
                    return Err(ExtractionError::Refusal(
                        part.refusal.unwrap_or_else(|| "refused".to_string()),
                    ));
                }
                _ => {}
            }
        }
    }

    if text.trim().is_empty() {
        return Err(ExtractionError::EmptyOutput);
    }
    if looks_like_refusal(&text) {
        return Err(ExtractionError::Refusal(text));
    }
    Ok(text)
}

// Responses API types

#[derive(Debug, Serialize)]
struct ResponsesRequest {
    model: String,
    input: Vec<InputMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<TextOptions>,
}

#[derive(Debug, Serialize)]
struct InputMessage {
    role: &'static str,
    content: Vec<InputContent>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InputContent {
    InputText { text: String },
    InputImage { image_url: String },
}

#[derive(Debug, Serialize)]
struct TextOptions {
    format: TextFormat,
}

#[derive(Debug, Serialize)]
struct TextFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
struct OutputContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
}
