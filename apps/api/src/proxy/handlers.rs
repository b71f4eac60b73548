use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap},
};
use reqwest::Method;
use serde::Deserialize;

use crate::proxy::{ProxyReply, RawBody};
use crate::state::AppState;

/// A single backend path segment: ASCII letters, digits, `_` and `-`.
fn is_path_segment(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// POST /api/consultants
/// Consultant applications arrive as multipart forms; the body is forwarded untouched.
pub async fn handle_submit_consultant(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ProxyReply {
    let authorization = header_value(&headers, header::AUTHORIZATION);
    let raw = RawBody {
        bytes: body,
        content_type: header_value(&headers, header::CONTENT_TYPE),
    };
    state
        .proxy
        .forward(Method::POST, "api/consultants", authorization.as_deref(), Some(raw))
        .await
}

/// GET /api/admin/consultants
pub async fn handle_list_consultants(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ProxyReply {
    let authorization = header_value(&headers, header::AUTHORIZATION);
    state
        .proxy
        .forward(Method::GET, "api/admin/consultants", authorization.as_deref(), None)
        .await
}

#[derive(Debug, Deserialize)]
pub struct ReviewParams {
    pub id: Option<String>,
    pub action: Option<String>,
}

/// POST /api/admin/consultants?id=<id>&action=<approve|reject>
pub async fn handle_review_consultant(
    State(state): State<AppState>,
    Query(params): Query<ReviewParams>,
    headers: HeaderMap,
    body: Bytes,
) -> ProxyReply {
    let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    let (Some(id), Some(action)) = (present(params.id), present(params.action)) else {
        return ProxyReply::message(400, "Missing parameters");
    };
    if !is_path_segment(&id) || !is_path_segment(&action) {
        return ProxyReply::message(400, "Invalid parameters");
    }

    let authorization = header_value(&headers, header::AUTHORIZATION);
    let bytes = if body.iter().all(u8::is_ascii_whitespace) {
        Bytes::from_static(b"{}")
    } else {
        body
    };
    let raw = RawBody {
        bytes,
        content_type: Some("application/json".to_string()),
    };
    state
        .proxy
        .forward(
            Method::POST,
            &format!("api/admin/consultants/{id}/{action}"),
            authorization.as_deref(),
            Some(raw),
        )
        .await
}

/// GET /api/blog/:id
pub async fn handle_get_blog(State(state): State<AppState>, Path(id): Path<String>) -> ProxyReply {
    if !is_path_segment(&id) {
        return ProxyReply::message(400, "Invalid blog id");
    }
    state.proxy.blog(&id).await
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::{body_bytes, body_json, header as header_is, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::test_support::TestApp;

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_review_without_action_is_rejected_locally() {
        let server = MockServer::start().await;
        let app = TestApp::new(&server.uri());

        let response = app
            .router()
            .oneshot(
                Request::post("/api/admin/consultants?id=12")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, json!({"message": "Missing parameters"}));
    }

    #[tokio::test]
    async fn test_review_posts_to_id_and_action_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/admin/consultants/12/approve"))
            .and(header_is("authorization", "Bearer admin"))
            .and(body_json(json!({"note": "ok"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "approved"})))
            .expect(1)
            .mount(&server)
            .await;
        let app = TestApp::new(&server.uri());

        let response = app
            .router()
            .oneshot(
                Request::post("/api/admin/consultants?id=12&action=approve")
                    .header("authorization", "Bearer admin")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"note": "ok"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"status": "approved"}));
    }

    #[tokio::test]
    async fn test_review_rejects_dot_segments_in_params() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let app = TestApp::new(&server.uri());

        for query in ["id=..%2F..%2Fusers&action=delete", "id=12&action=..%2Fpurge"] {
            let response = app
                .router()
                .oneshot(
                    Request::post(format!("/api/admin/consultants?{query}"))
                        .header("authorization", "Bearer admin")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(json_body(response).await, json!({"message": "Invalid parameters"}));
        }
    }

    #[tokio::test]
    async fn test_blog_id_with_encoded_slash_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;
        let app = TestApp::new(&server.uri());

        let response = app
            .router()
            .oneshot(Request::get("/api/blog/..%2Fusers").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_consultant_application_body_passes_through() {
        let server = MockServer::start().await;
        let multipart = "--XYZ\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nAda\r\n--XYZ--\r\n";
        Mock::given(method("POST"))
            .and(path("/api/consultants"))
            .and(header_is("content-type", "multipart/form-data; boundary=XYZ"))
            .and(body_bytes(multipart.as_bytes().to_vec()))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({"message": "CV required"})))
            .mount(&server)
            .await;
        let app = TestApp::new(&server.uri());

        let response = app
            .router()
            .oneshot(
                Request::post("/api/consultants")
                    .header("content-type", "multipart/form-data; boundary=XYZ")
                    .body(Body::from(multipart))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await, json!({"message": "CV required"}));
    }

    #[tokio::test]
    async fn test_blog_route_wraps_post_in_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/blogs/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 3, "ratings_count": 9})))
            .mount(&server)
            .await;
        let app = TestApp::new(&server.uri());

        let response = app
            .router()
            .oneshot(Request::get("/api/blog/3").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"data": {"id": 3, "ratings_count": 9, "ratings_avg_rating": 0}})
        );
    }
}
