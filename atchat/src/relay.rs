use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::protocol::{RelayReply, RequestId, SessionEvent};

pub const DEFAULT_RELAY_URL: &str = "http://localhost:3001/gemini";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Assistant text shown whenever the relay cannot produce a reply.
pub const RELAY_ERROR_TEXT: &str = "Relay server error.";

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("relay returned status {0}")]
    Status(u16),
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct RelayResponse {
    reply: String,
}

/// Client for the local relay's single endpoint.
#[derive(Clone, Debug)]
pub struct RelayClient {
    http: reqwest::Client,
    url: String,
}

impl RelayClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST `{prompt}` and return the `reply` field.
    pub async fn ask(&self, prompt: &str) -> Result<String, RelayError> {
        let resp = self
            .http
            .post(&self.url)
            .json(&RelayRequest { prompt })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RelayError::Status(status.as_u16()));
        }
        let body: RelayResponse = resp.json().await?;
        Ok(body.reply)
    }
}

/// Fire-and-forget prompt dispatch. The reply arrives later as
/// [`SessionEvent::Relay`] tagged with the same request id.
pub trait RelayDispatch: Send + Sync {
    fn dispatch(&self, request_id: RequestId, prompt: String);
}

/// Runs each relay call on its own tokio task.
pub struct SpawnedRelay {
    client: RelayClient,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SpawnedRelay {
    pub fn new(client: RelayClient, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { client, events }
    }
}

impl RelayDispatch for SpawnedRelay {
    fn dispatch(&self, request_id: RequestId, prompt: String) {
        let client = self.client.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = client.ask(&prompt).await;
            let _ = events.send(SessionEvent::Relay(RelayReply { request_id, result }));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/gemini")
    }

    fn client(url: String) -> RelayClient {
        RelayClient::new(url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn returns_reply_field() {
        let router = Router::new().route(
            "/gemini",
            post(|Json(body): Json<serde_json::Value>| async move {
                let prompt = body["prompt"].as_str().unwrap_or_default().to_string();
                Json(serde_json::json!({ "reply": format!("echo: {prompt}") }))
            }),
        );
        let url = serve(router).await;
        let reply = client(url).ask("hi").await.unwrap();
        assert_eq!(reply, "echo: hi");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let router = Router::new().route(
            "/gemini",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "reply": "Error connecting to Gemini API" })),
                )
            }),
        );
        let url = serve(router).await;
        let err = client(url).ask("hi").await.unwrap_err();
        assert!(matches!(err, RelayError::Status(500)));
    }

    #[tokio::test]
    async fn missing_reply_field_is_an_error() {
        let router = Router::new().route(
            "/gemini",
            post(|| async { Json(serde_json::json!({ "text": "wrong shape" })) }),
        );
        let url = serve(router).await;
        assert!(matches!(
            client(url).ask("hi").await,
            Err(RelayError::Http(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_relay_is_an_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let result = client(format!("http://{addr}/gemini")).ask("hi").await;
        assert!(matches!(result, Err(RelayError::Http(_))));
    }

    #[tokio::test]
    async fn spawned_relay_tags_reply_with_request_id() {
        let router = Router::new().route(
            "/gemini",
            post(|| async { Json(serde_json::json!({ "reply": "ok" })) }),
        );
        let url = serve(router).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        SpawnedRelay::new(client(url), tx).dispatch(RequestId(42), "q".into());
        match rx.recv().await {
            Some(SessionEvent::Relay(reply)) => {
                assert_eq!(reply.request_id, RequestId(42));
                assert_eq!(reply.result.unwrap(), "ok");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
