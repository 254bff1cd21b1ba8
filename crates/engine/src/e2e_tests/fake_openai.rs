//! A scripted stand-in for the OpenAI Responses API.
//!
//! Each POST to `/responses` answers with the next scripted reply; once the
//! script runs out the last reply repeats. The script can be set after the
//! server starts, so tests can name ids that only exist once a world is seeded.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::infrastructure::openai::OpenAiClient;
use crate::infrastructure::resilient_extraction::{ResilientExtractionClient, RetryConfig};

#[derive(Default)]
struct Script {
    calls: AtomicUsize,
    replies: Mutex<Vec<(StatusCode, Value)>>,
}

async fn respond(State(script): State<Arc<Script>>) -> (StatusCode, Json<Value>) {
    let n = script.calls.fetch_add(1, Ordering::SeqCst);
    let replies = script.replies.lock().unwrap();
    match replies.get(n.min(replies.len().saturating_sub(1))) {
        Some((status, body)) => (*status, Json(body.clone())),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": { "message": "no scripted reply" } })),
        ),
    }
}

/// A running fake server.
pub struct FakeOpenAi {
    pub base_url: String,
    script: Arc<Script>,
}

impl FakeOpenAi {
    pub async fn start() -> Self {
        let script = Arc::new(Script::default());
        let app = Router::new()
            .route("/responses", post(respond))
            .with_state(Arc::clone(&script));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            script,
        }
    }

    /// Replace the script and reset the call count.
    pub fn respond_with(&self, replies: Vec<(StatusCode, Value)>) {
        *self.script.replies.lock().unwrap() = replies;
        self.script.calls.store(0, Ordering::SeqCst);
    }

    /// How many requests have reached the server.
    pub fn calls(&self) -> usize {
        self.script.calls.load(Ordering::SeqCst)
    }

    /// The production client stack pointed at this server, with millisecond backoff.
    pub fn extractor(&self) -> Arc<ResilientExtractionClient> {
        let fast = RetryConfig {
            base_delay_ms: 10,
            max_delay_ms: 50,
            jitter_factor: 0.0,
            max_elapsed: Duration::from_secs(10),
        };
        Arc::new(ResilientExtractionClient::with_configs(
            Arc::new(OpenAiClient::new(&self.base_url, "sk-test", "gpt-test")),
            fast.clone(),
            fast,
        ))
    }
}

/// A successful Responses API reply carrying `text`.
pub fn output_text(text: &str) -> (StatusCode, Value) {
    (
        StatusCode::OK,
        json!({
            "output": [{
                "type": "message",
                "content": [{ "type": "output_text", "text": text }]
            }]
        }),
    )
}

pub fn rate_limited() -> (StatusCode, Value) {
    (
        StatusCode::TOO_MANY_REQUESTS,
        json!({
            "error": {
                "message": "Rate limit reached for requests",
                "type": "requests"
            }
        }),
    )
}
