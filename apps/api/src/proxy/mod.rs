//! Pass-through calls to the backend API for the consultant and blog pages.
//!
//! Each call mirrors the backend's status and JSON body. Transport failures
//! become a 500 with `{ "message": "An error occurred" }`.

pub mod handlers;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use tracing::{error, warn};

const TRANSPORT_FAILURE: &str = "An error occurred";

/// Status and JSON body to hand back to the caller unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyReply {
    pub status: u16,
    pub body: Value,
}

impl ProxyReply {
    pub fn message(status: u16, message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self {
            status,
            body: json!({ "message": message }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl IntoResponse for ProxyReply {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_GATEWAY);
        (status, Json(self.body)).into_response()
    }
}

/// A raw body and its content type, forwarded byte for byte.
pub struct RawBody {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

#[derive(Clone)]
pub struct BackendProxy {
    client: Client,
    base_url: String,
}

impl BackendProxy {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Sends one request to `<base>/<path>` and mirrors the reply.
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        authorization: Option<&str>,
        body: Option<RawBody>,
    ) -> ProxyReply {
        match self.send(method.clone(), path, authorization, body).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Backend {method} {path} failed: {e}");
                ProxyReply::message(500, TRANSPORT_FAILURE)
            }
        }
    }

    /// Fetches one blog post and adds the rating fields the blog page reads.
    pub async fn blog(&self, id: &str) -> ProxyReply {
        let path = format!("api/blogs/{id}");
        match self.send(Method::GET, &path, None, None).await {
            Ok(reply) if reply.is_success() => ProxyReply {
                status: 200,
                body: json!({ "data": with_rating_fields(reply.body) }),
            },
            Ok(reply) => ProxyReply::message(500, format!("Failed to fetch blog: {}", reply.status)),
            Err(e) => {
                error!("Backend GET {path} failed: {e}");
                ProxyReply::message(500, TRANSPORT_FAILURE)
            }
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        authorization: Option<&str>,
        body: Option<RawBody>,
    ) -> Result<ProxyReply, reqwest::Error> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(auth) = authorization {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }
        if let Some(RawBody { bytes, content_type }) = body {
            if let Some(content_type) = content_type {
                request = request.header(reqwest::header::CONTENT_TYPE, content_type);
            }
            request = request.body(bytes);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let success = (200..300).contains(&status);
        if !success {
            warn!("Backend {method} {url} returned {status}");
        }

        let body = match serde_json::from_str::<Value>(&text) {
            Ok(value) => value,
            Err(_) if text.trim().is_empty() && success => Value::Null,
            Err(_) if text.trim().is_empty() => json!({ "message": TRANSPORT_FAILURE }),
            Err(_) => Value::String(text),
        };
        Ok(ProxyReply { status, body })
    }
}

/// `ratings_avg_rating` mirrors `average_rating`; both rating fields default to 0.
fn with_rating_fields(post: Value) -> Value {
    let mut post = match post {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    let average = truthy_or_zero(post.get("average_rating"));
    let count = truthy_or_zero(post.get("ratings_count"));
    post.insert("ratings_avg_rating".to_string(), average);
    post.insert("ratings_count".to_string(), count);
    Value::Object(post)
}

fn truthy_or_zero(value: Option<&Value>) -> Value {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => json!(0),
        Some(Value::String(s)) if s.is_empty() => json!(0),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => json!(0),
        Some(other) => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_forward_mirrors_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/admin/consultants"))
            .and(header("authorization", "Bearer admin"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "Forbidden"})))
            .mount(&server)
            .await;

        let proxy = BackendProxy::new(Client::new(), server.uri());
        let reply = proxy
            .forward(Method::GET, "/api/admin/consultants", Some("Bearer admin"), None)
            .await;
        assert_eq!(reply, ProxyReply::message(403, "Forbidden"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_500() {
        let proxy = BackendProxy::new(Client::new(), "http://127.0.0.1:9");
        let reply = proxy.forward(Method::GET, "api/blogs/1", None, None).await;
        assert_eq!(reply, ProxyReply::message(500, "An error occurred"));
    }

    #[tokio::test]
    async fn test_blog_adds_rating_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/blogs/42"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": 42, "average_rating": 4.5})),
            )
            .mount(&server)
            .await;

        let reply = BackendProxy::new(Client::new(), server.uri()).blog("42").await;
        assert_eq!(reply.status, 200);
        assert_eq!(
            reply.body,
            json!({"data": {"id": 42, "average_rating": 4.5, "ratings_avg_rating": 4.5, "ratings_count": 0}})
        );
    }

    #[tokio::test]
    async fn test_blog_not_found_becomes_500() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let reply = BackendProxy::new(Client::new(), server.uri()).blog("7").await;
        assert_eq!(reply, ProxyReply::message(500, "Failed to fetch blog: 404"));
    }
}
