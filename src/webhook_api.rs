use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::command::Directive;
use crate::error::BotError;

/// Default Bot API host used for outbound webhook calls.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Which webhook operation to perform on the target bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookAction {
    Set,
    Delete,
}

impl WebhookAction {
    /// Bot API method name.
    pub fn method(self) -> &'static str {
        match self {
            WebhookAction::Set => "setWebhook",
            WebhookAction::Delete => "deleteWebhook",
        }
    }

    /// Chat command that triggers this action.
    pub fn command(self) -> &'static str {
        match self {
            WebhookAction::Set => "set",
            WebhookAction::Delete => "del",
        }
    }

    pub fn past_participle(self) -> &'static str {
        match self {
            WebhookAction::Set => "set",
            WebhookAction::Delete => "deleted",
        }
    }
}

/// Status and decoded JSON body of a Bot API call.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    /// The call succeeded when the body carries a truthy `result` field.
    pub fn succeeded(&self) -> bool {
        self.body.get("result").is_some_and(is_truthy)
    }

    pub fn description(&self) -> &str {
        self.body
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("no description")
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Performs webhook operations on behalf of another bot.
#[async_trait]
pub trait WebhookApi: Send + Sync {
    async fn call(
        &self,
        action: WebhookAction,
        directive: &Directive,
    ) -> Result<ApiResponse, BotError>;
}

/// reqwest-backed client for the Bot API webhook methods.
pub struct WebhookClient {
    client: reqwest::Client,
    api_url: String,
}

impl WebhookClient {
    /// Build a client against `api_url`. `timeout` of `None` leaves requests
    /// unbounded.
    pub fn new(api_url: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    /// `https://<api-host>/bot<token>/<method>`
    pub fn endpoint(&self, bot_token: &str, action: WebhookAction) -> String {
        format!("{}/bot{}/{}", self.api_url, bot_token, action.method())
    }

    /// POST `payload` as JSON, buffer the whole response and decode it.
    /// Transport and decode failures are returned as-is; nothing is retried.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        payload: &T,
    ) -> Result<ApiResponse, BotError> {
        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .json(payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let body: Value = serde_json::from_slice(&bytes)?;

        Ok(ApiResponse { status, body })
    }
}

#[async_trait]
impl WebhookApi for WebhookClient {
    async fn call(
        &self,
        action: WebhookAction,
        directive: &Directive,
    ) -> Result<ApiResponse, BotError> {
        debug!(
            "Calling {} for webhook url {}",
            action.method(),
            directive.webhook_url
        );
        let endpoint = self.endpoint(&directive.bot_token, action);
        self.post_json(&endpoint, &json!({ "url": directive.webhook_url }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use axum::{http::Uri, Json, Router};
    use tokio::net::TcpListener;

    /// Serve a stub Bot API that echoes the request path and body back.
    async fn spawn_stub(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn directive(token: &str, url: &str) -> Directive {
        Directive {
            bot_token: token.to_string(),
            webhook_url: url.to_string(),
        }
    }

    #[test]
    fn test_endpoint_format() {
        let client = WebhookClient::new("https://api.telegram.org/", None).unwrap();
        assert_eq!(
            client.endpoint("123:abc", WebhookAction::Set),
            "https://api.telegram.org/bot123:abc/setWebhook"
        );
        assert_eq!(
            client.endpoint("123:abc", WebhookAction::Delete),
            "https://api.telegram.org/bot123:abc/deleteWebhook"
        );
    }

    #[test]
    fn test_truthy_result() {
        let ok = ApiResponse {
            status: 200,
            body: json!({"ok": true, "result": true, "description": "Webhook was set"}),
        };
        assert!(ok.succeeded());
        assert_eq!(ok.description(), "Webhook was set");

        let rejected = ApiResponse {
            status: 400,
            body: json!({"ok": false, "error_code": 400, "description": "Bad Request"}),
        };
        assert!(!rejected.succeeded());
        assert_eq!(rejected.description(), "Bad Request");

        let no_description = ApiResponse {
            status: 200,
            body: json!({"result": 0}),
        };
        assert!(!no_description.succeeded());
        assert_eq!(no_description.description(), "no description");
    }

    #[tokio::test]
    async fn test_call_posts_url_payload() {
        let router = Router::new().fallback(|uri: Uri, Json(body): Json<Value>| async move {
            Json(json!({
                "ok": true,
                "result": true,
                "description": format!("{} {}", uri.path(), body["url"].as_str().unwrap_or("")),
            }))
        });
        let base = spawn_stub(router).await;
        let client = WebhookClient::new(&base, None).unwrap();

        let response = client
            .call(WebhookAction::Set, &directive("42:xyz", "https://example.com/hook"))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert!(response.succeeded());
        assert_eq!(
            response.description(),
            "/bot42:xyz/setWebhook https://example.com/hook"
        );
    }

    #[tokio::test]
    async fn test_error_status_still_decodes_body() {
        let router = Router::new().fallback(|| async {
            (
                axum::http::StatusCode::UNAUTHORIZED,
                Json(json!({"ok": false, "error_code": 401, "description": "Unauthorized"})),
            )
        });
        let base = spawn_stub(router).await;
        let client = WebhookClient::new(&base, None).unwrap();

        let response = client
            .call(WebhookAction::Delete, &directive("bad", "https://example.com"))
            .await
            .unwrap();

        assert_eq!(response.status, 401);
        assert!(!response.succeeded());
        assert_eq!(response.description(), "Unauthorized");
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let router = Router::new().fallback(|| async { "<html>gateway</html>" });
        let base = spawn_stub(router).await;
        let client = WebhookClient::new(&base, None).unwrap();

        let err = client
            .call(WebhookAction::Set, &directive("1:a", "https://example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = WebhookClient::new(&format!("http://{}", addr), None).unwrap();
        let err = client
            .call(WebhookAction::Set, &directive("1:a", "https://example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportFailure);
    }
}
