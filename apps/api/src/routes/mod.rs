pub mod health;

use axum::{
    http::Uri,
    routing::{get, post},
    Router,
};

use crate::errors::AppError;
use crate::planning::handlers as plans;
use crate::proxy::handlers as proxy;
use crate::state::AppState;

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Plan pipeline
        .route("/api/plans", post(plans::handle_generate_plan))
        .route("/api/plans/save", post(plans::handle_save_plan))
        .route("/api/plans/saved", get(plans::handle_saved_plans))
        .route("/api/plans/export", post(plans::handle_export_plan))
        .route("/api/completion", post(plans::handle_completion))
        // Backend pass-through
        .route("/api/consultants", post(proxy::handle_submit_consultant))
        .route(
            "/api/admin/consultants",
            get(proxy::handle_list_consultants).post(proxy::handle_review_consultant),
        )
        .route("/api/blog/:id", get(proxy::handle_get_blog))
        .fallback(not_found)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::test_support::TestApp;

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new("http://127.0.0.1:9");
        let response = app
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "smartstart-api");
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let app = TestApp::new("http://127.0.0.1:9");
        let response = app
            .router()
            .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}
