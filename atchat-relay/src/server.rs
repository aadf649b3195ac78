use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::gemini::Generator;

/// Reply body sent whenever the upstream call fails.
pub const ERROR_REPLY: &str = "Error connecting to Gemini API";

#[derive(Clone)]
pub struct RelayState {
    generator: Arc<dyn Generator>,
}

impl RelayState {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }
}

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptReply {
    pub reply: String,
}

/// Single-route relay with permissive CORS so a browser-hosted chat view can call it.
pub fn router(state: RelayState, path: &str) -> Router {
    Router::new()
        .route(path, post(relay_prompt))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

async fn relay_prompt(
    State(state): State<RelayState>,
    Json(req): Json<PromptRequest>,
) -> (StatusCode, Json<PromptReply>) {
    tracing::debug!(len = req.prompt.len(), "relaying prompt");
    match state.generator.generate(&req.prompt).await {
        Ok(reply) => (StatusCode::OK, Json(PromptReply { reply })),
        Err(e) => {
            tracing::error!("generation failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(PromptReply {
                    reply: ERROR_REPLY.to_string(),
                }),
            )
        }
    }
}

pub async fn serve(listener: tokio::net::TcpListener, app: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Relay listening on http://{}", addr);
    }
    axum::serve(listener, app).await
}
