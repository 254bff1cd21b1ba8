//! External service port traits (AI extraction, document rendering, email).

use async_trait::async_trait;

use super::error::{EmailError, ExtractionError, RenderError};

// =============================================================================
// AI Extraction
// =============================================================================

/// Everything the vision model needs to read one filled-in turn sheet.
#[derive(Debug, Clone, Default)]
pub struct StructuredExtractionRequest {
    pub instructions: String,
    /// Free-form facts from the sheet data, one per line in the prompt.
    pub context: Vec<String>,
    /// The same sheet rendered blank, so the model can diff the player's marks.
    pub template_image: Option<Vec<u8>>,
    pub filled_image: Vec<u8>,
    /// JSON skeleton of the expected answer.
    pub schema: serde_json::Value,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageExtractionPort: Send + Sync {
    /// Plain OCR of an image.
    async fn extract_text(&self, image: &[u8]) -> Result<String, ExtractionError>;

    /// Returns the model's answer, expected to be a JSON object shaped like `schema`.
    async fn extract_structured(
        &self,
        request: &StructuredExtractionRequest,
    ) -> Result<String, ExtractionError>;
}

// =============================================================================
// Document Rendering
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentRendererPort: Send + Sync {
    async fn render_pdf(&self, html: &str) -> Result<Vec<u8>, RenderError>;
    async fn render_png(&self, html: &str) -> Result<Vec<u8>, RenderError>;
}

// =============================================================================
// Email
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailPort: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}
