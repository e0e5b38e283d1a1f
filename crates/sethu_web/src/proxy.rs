//! Pass-through to the Sakhi chat backend.
//!
//! Bodies go through untouched. The only thing added on the way out is the
//! content type and the header that gets requests past ngrok's browser
//! warning page.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sethu_core::{Error, Result};
use std::time::Duration;

pub const BINDING_STATUS: &str = "Binding Layer Active";
pub const CONNECT_FAILED: &str = "Binding Layer failed to connect to Backend";
const DEFAULT_CHAT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<Value>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ChatProxy {
    client: Client,
    target: String,
}

impl ChatProxy {
    pub fn new(target: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            target: target.trim_end_matches('/').to_string(),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.target, path.trim_start_matches('/'))
    }

    /// Forwards a chat message. A backend error comes back as its own status
    /// with `{error: detail}`; failing to reach the backend at all is an error.
    pub async fn chat(&self, mut request: ChatRequest) -> Result<(u16, Value)> {
        if request.language.as_deref().map_or(true, |lang| lang.trim().is_empty()) {
            request.language = Some(DEFAULT_CHAT_LANGUAGE.to_string());
        }

        let response = self
            .client
            .post(self.url("sakhi/chat"))
            .header("ngrok-skip-browser-warning", "true")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("❌ Binding Layer Error: {}", e);
                Error::Proxy(CONNECT_FAILED.to_string())
            })?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if status.is_success() {
            return Ok((status.as_u16(), body));
        }

        tracing::error!("❌ Chat backend answered {}", status);
        let detail = body
            .get("detail")
            .filter(|detail| !detail.is_null())
            .cloned()
            .unwrap_or_else(|| json!(CONNECT_FAILED));
        Ok((status.as_u16(), json!({ "error": detail })))
    }

    /// Sends `body` to `path` on the backend as is and hands back whatever it
    /// answers, status included.
    pub async fn forward(
        &self,
        method: &str,
        path: &str,
        query: Option<&str>,
        content_type: Option<&str>,
        body: Vec<u8>,
    ) -> Result<ProxyResponse> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| Error::Validation(format!("unsupported method: {}", method)))?;
        let mut url = self.url(path);
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("ngrok-skip-browser-warning", "true");
        if let Some(content_type) = content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("❌ Proxy {} {} failed: {}", method, url, e);
            Error::Proxy(CONNECT_FAILED.to_string())
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();
        Ok(ProxyResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Query,
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use std::collections::HashMap;

    async fn upstream() -> String {
        async fn chat(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
            if body["message"] == "fail" {
                return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": "message rejected" })));
            }
            let ngrok = headers.contains_key("ngrok-skip-browser-warning");
            (StatusCode::OK, Json(json!({ "echo": body, "ngrok": ngrok })))
        }

        async fn profile(Query(params): Query<HashMap<String, String>>) -> (StatusCode, String) {
            (StatusCode::CREATED, format!("user={}", params.get("id").cloned().unwrap_or_default()))
        }

        let app = Router::new()
            .route("/sakhi/chat", post(chat))
            .route("/users/profile", get(profile).post(profile));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn closed_port() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_chat_defaults_language() {
        let proxy = ChatProxy::new(&upstream().await, Duration::from_secs(5)).unwrap();
        let request = ChatRequest {
            message: Some(json!("hello")),
            user_id: Some(json!("u-1")),
            ..Default::default()
        };
        let (status, body) = proxy.chat(request).await.unwrap();
        assert_eq!(status, 200);
        assert_eq!(body["echo"]["language"], "en");
        assert_eq!(body["echo"]["user_id"], "u-1");
        assert!(body["echo"].get("phone_number").is_none());
        assert_eq!(body["ngrok"], true);
    }

    #[tokio::test]
    async fn test_chat_backend_error_keeps_status() {
        let proxy = ChatProxy::new(&upstream().await, Duration::from_secs(5)).unwrap();
        let request = ChatRequest {
            message: Some(json!("fail")),
            language: Some("te".to_string()),
            ..Default::default()
        };
        let (status, body) = proxy.chat(request).await.unwrap();
        assert_eq!(status, 422);
        assert_eq!(body, json!({ "error": "message rejected" }));
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let proxy = ChatProxy::new(&closed_port(), Duration::from_secs(2)).unwrap();
        let err = proxy.chat(ChatRequest::default()).await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(err.to_string().contains(CONNECT_FAILED));
    }

    #[tokio::test]
    async fn test_forward_is_verbatim() {
        let proxy = ChatProxy::new(&upstream().await, Duration::from_secs(5)).unwrap();
        let response = proxy
            .forward("POST", "/users/profile", Some("id=42"), Some("text/plain"), b"ignored".to_vec())
            .await
            .unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(response.body, b"user=42".to_vec());

        let missing = proxy.forward("GET", "nowhere", None, None, Vec::new()).await.unwrap();
        assert_eq!(missing.status, 404);
        assert!(proxy.forward("NOT A METHOD", "x", None, None, Vec::new()).await.is_err());
    }
}
