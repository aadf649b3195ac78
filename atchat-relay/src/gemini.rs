//! Upstream text generation through the Gemini `generateContent` API.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("upstream returned no candidates")]
    Empty,
}

/// Produces one reply for one prompt.
#[async_trait::async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Accepts both `gemini-1.5-flash` and `models/gemini-1.5-flash`.
pub fn normalize_model(model: &str) -> &str {
    model.strip_prefix("models/").unwrap_or(model)
}

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: &str,
        api_base: &str,
        timeout: Duration,
    ) -> Result<Self, GenerateError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            model: normalize_model(model).to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

#[async_trait::async_trait]
impl Generator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let body = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [RequestPart { text: prompt }],
            }],
        };
        let resp = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerateError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = resp.json().await?;
        let content = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or(GenerateError::Empty)?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        tracing::debug!(model = %self.model, len = text.len(), "generated reply");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::post,
    };
    use serde_json::{Value, json};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base: &str, model: &str) -> GeminiClient {
        GeminiClient::new("test-key", model, base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn model_prefix_is_stripped() {
        assert_eq!(normalize_model("models/gemini-1.5-flash"), "gemini-1.5-flash");
        assert_eq!(normalize_model("gemini-pro"), "gemini-pro");
    }

    #[test]
    fn request_body_shape() {
        let body = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [RequestPart { text: "hi" }],
            }],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"contents": [{"role": "user", "parts": [{"text": "hi"}]}]})
        );
    }

    #[tokio::test]
    async fn posts_prompt_and_joins_parts() {
        let router = Router::new().route(
            "/models/{call}",
            post(
                |Path(call): Path<String>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    assert_eq!(call, "gemini-1.5-flash:generateContent");
                    assert_eq!(headers["x-goog-api-key"], "test-key");
                    let prompt = body["contents"][0]["parts"][0]["text"].clone();
                    Json(json!({
                        "candidates": [{
                            "content": {"parts": [{"text": "you said "}, {"text": prompt}]}
                        }]
                    }))
                },
            ),
        );
        let base = serve(router).await;
        let reply = client(&base, "models/gemini-1.5-flash")
            .generate("hello")
            .await
            .unwrap();
        assert_eq!(reply, "you said hello");
    }

    #[tokio::test]
    async fn upstream_error_status_is_reported() {
        let router = Router::new().route(
            "/models/{call}",
            post(|| async { (StatusCode::FORBIDDEN, "bad key") }),
        );
        let base = serve(router).await;
        match client(&base, DEFAULT_MODEL).generate("hi").await {
            Err(GenerateError::Status { status, body }) => {
                assert_eq!(status, 403);
                assert_eq!(body, "bad key");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_candidates_is_empty() {
        let router = Router::new().route(
            "/models/{call}",
            post(|| async { Json(json!({"candidates": []})) }),
        );
        let base = serve(router).await;
        assert!(matches!(
            client(&base, DEFAULT_MODEL).generate("hi").await,
            Err(GenerateError::Empty)
        ));
    }
}
