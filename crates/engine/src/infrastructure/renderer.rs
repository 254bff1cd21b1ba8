//! HTML to PDF/PNG through a Chromium conversion service (Gotenberg-compatible).

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;

use crate::infrastructure::ports::{DocumentRendererPort, RenderError};

/// Default renderer base URL.
pub const DEFAULT_RENDERER_URL: &str = "http://localhost:3001";

const CONVERT_PATH: &str = "/forms/chromium/convert/html";
const SCREENSHOT_PATH: &str = "/forms/chromium/screenshot/html";

/// Turn sheets are printed on A4; the screenshot uses the same page width in CSS pixels.
const SCREENSHOT_WIDTH_PX: &str = "794";

#[derive(Clone)]
pub struct ChromiumRenderer {
    client: Client,
    base_url: String,
}

impl ChromiumRenderer {
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post(&self, path: &str, form: Form) -> Result<Vec<u8>, RenderError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .multipart(form)
            .send()
            .await
            .map_err(|e| RenderError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .map_err(|e| RenderError::RequestFailed(e.to_string()))?;
            return Err(RenderError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RenderError::RequestFailed(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

impl Default for ChromiumRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_RENDERER_URL)
    }
}

fn html_part(html: &str) -> Result<Part, RenderError> {
    Part::bytes(html.as_bytes().to_vec())
        .file_name("index.html")
        .mime_str("text/html")
        .map_err(|e| RenderError::RequestFailed(e.to_string()))
}

#[async_trait]
impl DocumentRendererPort for ChromiumRenderer {
    async fn render_pdf(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        let form = Form::new()
            .part("files", html_part(html)?)
            .text("printBackground", "true");
        self.post(CONVERT_PATH, form).await
    }

    async fn render_png(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        let form = Form::new()
            .part("files", html_part(html)?)
            .text("format", "png")
            .text("width", SCREENSHOT_WIDTH_PX)
            .text("clip", "false");
        self.post(SCREENSHOT_PATH, form).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::Router;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn posts_to_the_conversion_routes() {
        let app = Router::new()
            .route(CONVERT_PATH, post(|| async { "%PDF-1.7" }))
            .route(SCREENSHOT_PATH, post(|| async { "PNG" }));
        let renderer = ChromiumRenderer::new(&serve(app).await);

        assert_eq!(renderer.render_pdf("<p>x</p>").await.unwrap(), b"%PDF-1.7");
        assert_eq!(renderer.render_png("<p>x</p>").await.unwrap(), b"PNG");
    }

    #[tokio::test]
    async fn surfaces_http_errors() {
        let app = Router::new().route(
            CONVERT_PATH,
            post(|| async { (axum::http::StatusCode::BAD_REQUEST, "no index.html") }),
        );
        let renderer = ChromiumRenderer::new(&serve(app).await);

        match renderer.render_pdf("<p>x</p>").await {
            Err(RenderError::Http { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "no index.html");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
