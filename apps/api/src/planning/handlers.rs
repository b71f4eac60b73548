use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::export::{export_docx, export_file_name, DOCX_CONTENT_TYPE};
use crate::llm_client::RawCompletion;
use crate::models::saved_plan::SavedPlanRecord;
use crate::persistence::SaveOutcome;
use crate::planning::generator::generate_plan;
use crate::planning::normalizer::{find_object, NormalizationOrigin, NormalizedPlan};
use crate::planning::request::PlanRequest;
use crate::render::markdown::render_markdown;
use crate::render::{render_plan, RenderedSection};
use crate::state::AppState;

/// The token from `Authorization: Bearer <token>`, if any.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[derive(Debug, Deserialize)]
pub struct GeneratePlanRequest {
    #[serde(flatten)]
    pub request: PlanRequest,
    #[serde(default)]
    pub save: bool,
}

#[derive(Debug, Serialize)]
pub struct GeneratePlanResponse {
    pub plan: NormalizedPlan,
    pub origin: NormalizationOrigin,
    pub generated_at: DateTime<Utc>,
    pub sections: Vec<RenderedSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save: Option<SaveOutcome>,
}

/// POST /api/plans
pub async fn handle_generate_plan(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<GeneratePlanRequest>, JsonRejection>,
) -> Result<Json<GeneratePlanResponse>, AppError> {
    let Json(req) = payload?;
    req.request.validate().map_err(AppError::Validation)?;

    let outcome = generate_plan(state.completion.as_ref(), &req.request).await?;
    let save = if req.save {
        Some(
            state
                .persistence
                .save(
                    &outcome.plan,
                    &req.request,
                    outcome.generated_at,
                    bearer_token(&headers),
                )
                .await,
        )
    } else {
        None
    };

    Ok(Json(GeneratePlanResponse {
        sections: render_plan(&outcome.plan),
        plan: outcome.plan,
        origin: outcome.origin,
        generated_at: outcome.generated_at,
        save,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SavePlanRequest {
    pub request: PlanRequest,
    pub plan: NormalizedPlan,
    /// When the plan was generated; retries with the same value are deduplicated.
    pub generated_at: Option<DateTime<Utc>>,
}

/// POST /api/plans/save
pub async fn handle_save_plan(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<SavePlanRequest>, JsonRejection>,
) -> Result<Json<SaveOutcome>, AppError> {
    let Json(req) = payload?;
    let generated_at = req.generated_at.unwrap_or_else(Utc::now);
    let outcome = state
        .persistence
        .save(&req.plan, &req.request, generated_at, bearer_token(&headers))
        .await;
    Ok(Json(outcome))
}

/// GET /api/plans/saved
pub async fn handle_saved_plans(
    State(state): State<AppState>,
) -> Result<Json<Vec<SavedPlanRecord>>, AppError> {
    Ok(Json(state.persistence.saved_plans().await?))
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Docx,
    Markdown,
}

#[derive(Debug, Deserialize)]
pub struct ExportPlanRequest {
    pub plan: NormalizedPlan,
    pub prepared_on: Option<NaiveDate>,
    #[serde(default)]
    pub format: ExportFormat,
}

/// POST /api/plans/export
pub async fn handle_export_plan(
    payload: Result<Json<ExportPlanRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload?;
    if req.format == ExportFormat::Markdown {
        return Ok((
            [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            render_markdown(&req.plan),
        )
            .into_response());
    }

    let prepared_on = req.prepared_on.unwrap_or_else(|| Utc::now().date_naive());
    let file_name = export_file_name(&req.plan);

    let plan = req.plan;
    let bytes = tokio::task::spawn_blocking(move || export_docx(&plan, prepared_on))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("export task failed: {e}")))??;
    info!("Exported {file_name} ({} bytes)", bytes.len());

    Ok((
        [
            (header::CONTENT_TYPE, DOCX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

fn completion_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// POST /api/completion
/// Body `{ "prompt": string }`. Returns the JSON object the model produced.
pub async fn handle_completion(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"));
    if !is_json {
        return completion_error(StatusCode::BAD_REQUEST, "Content-Type must be application/json");
    }

    let Ok(body) = serde_json::from_slice::<Value>(&body) else {
        return completion_error(StatusCode::BAD_REQUEST, "Invalid JSON body");
    };
    let prompt = match body.get("prompt") {
        Some(Value::String(prompt)) if !prompt.trim().is_empty() => prompt.as_str(),
        _ => return completion_error(StatusCode::BAD_REQUEST, "Prompt must be a non-empty string"),
    };

    let raw = match state.completion.complete(prompt).await {
        Ok(raw) => raw,
        Err(e) => {
            let status = StatusCode::from_u16(e.status()).unwrap_or(StatusCode::BAD_GATEWAY);
            return completion_error(status, &e.upstream_message());
        }
    };

    let text = match raw {
        RawCompletion::Structured(Value::String(text)) | RawCompletion::Text(text) => text,
        RawCompletion::Structured(other) => return Json(other).into_response(),
    };

    match find_object(&text, 0, &mut |map: Map<String, Value>| Some(map)) {
        Some((map, origin)) => {
            info!("Completion route extracted object via {origin:?}");
            Json(Value::Object(map)).into_response()
        }
        None => {
            warn!("Completion route could not extract JSON ({} chars)", text.len());
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "error": "AI returned invalid JSON format",
                    "rawResponse": text
                })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::llm_client::LlmError;
    use crate::test_support::{StubGateway, TestApp};

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));
        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn test_generate_returns_plan_sections_and_origin() {
        let gateway = StubGateway::returning(RawCompletion::Text(
            "Sure! Here it is: {\"title\": \"Crumbs\", \"executive_summary\": \"Bread.\", \
             \"financial_plan\": {\"revenue\": 500, \"expenses\": 300}} Enjoy."
                .to_string(),
        ));
        let app = TestApp::with_gateway("http://127.0.0.1:9", Arc::new(gateway));

        let response = app
            .router()
            .oneshot(post_json(
                "/api/plans",
                json!({"kind": "venture", "fields": {"businesstype": "Bakery"}}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["origin"], "embedded");
        assert_eq!(body["plan"]["title"], "Crumbs");
        assert_eq!(body["sections"][1]["title"], "Financial Plan");
        assert_eq!(body["sections"][1]["blocks"][0]["headers"], json!(["Item", "Value"]));
        assert!(body.get("save").is_none());
    }

    #[tokio::test]
    async fn test_unknown_kind_gets_validation_error_shape() {
        let app = TestApp::new("http://127.0.0.1:9");
        let response = app
            .router()
            .oneshot(post_json("/api/plans", json!({"kind": "franchise", "fields": {}})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_malformed_export_body_gets_validation_error_shape() {
        let app = TestApp::new("http://127.0.0.1:9");
        let response = app
            .router()
            .oneshot(
                Request::post("/api/plans/export")
                    .header("content-type", "application/json")
                    .body(Body::from("{\"plan\": "))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["message"].as_str().is_some_and(|m| !m.is_empty()));
    }

    #[tokio::test]
    async fn test_generate_rejects_blank_subject() {
        let app = TestApp::new("http://127.0.0.1:9");
        let response = app
            .router()
            .oneshot(post_json("/api/plans", json!({"kind": "venture", "fields": {}})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_generate_upstream_failure_is_502_and_retry_succeeds() {
        let gateway = StubGateway::failing_once(
            LlmError::Api {
                status: 429,
                message: "Rate limit exceeded".to_string(),
            },
            RawCompletion::Structured(json!({"executive_summary": "Bread."})),
        );
        let app = TestApp::with_gateway("http://127.0.0.1:9", Arc::new(gateway));
        let request = json!({"kind": "venture", "fields": {"businesstype": "Bakery"}});

        let first = app.router().oneshot(post_json("/api/plans", request.clone())).await.unwrap();
        assert_eq!(first.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(first).await["error"]["message"], "Error: Rate limit exceeded");

        let second = app.router().oneshot(post_json("/api/plans", request)).await.unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(json_body(second).await["plan"]["title"], "Bakery Business Plan");
    }

    #[tokio::test]
    async fn test_generate_with_save_falls_back_when_backend_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/save-plan"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "down"})))
            .mount(&server)
            .await;
        let gateway = StubGateway::returning(RawCompletion::Structured(json!({
            "title": "Crumbs",
            "executive_summary": "Bread."
        })));
        let app = TestApp::with_gateway(&server.uri(), Arc::new(gateway));

        let response = app
            .router()
            .oneshot(
                Request::post("/api/plans")
                    .header("content-type", "application/json")
                    .header("authorization", "Bearer tok")
                    .body(Body::from(
                        json!({"kind": "venture", "fields": {"businesstype": "Bakery"}, "save": true})
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["save"]["status"], "local_fallback");

        let saved = app
            .router()
            .oneshot(Request::get("/api/plans/saved").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let saved = json_body(saved).await;
        assert_eq!(saved.as_array().unwrap().len(), 1);
        assert_eq!(saved[0]["plan"]["title"], "Crumbs");
        assert_eq!(saved[0]["form_data"]["businesstype"], "Bakery");
    }

    #[tokio::test]
    async fn test_explicit_save_is_idempotent() {
        let app = TestApp::new("http://127.0.0.1:9");
        let body = json!({
            "request": {"kind": "tracker", "fields": {"Businessactivities": "Retail"}},
            "plan": {"title": "Shop", "Businessactivities": "Selling shoes"},
            "generated_at": "2024-05-01T12:00:00Z"
        });

        let first = app.router().oneshot(post_json("/api/plans/save", body.clone())).await.unwrap();
        assert_eq!(json_body(first).await["status"], "local_fallback");
        let second = app.router().oneshot(post_json("/api/plans/save", body)).await.unwrap();
        assert_eq!(json_body(second).await["status"], "duplicate");
    }

    #[tokio::test]
    async fn test_export_returns_docx_attachment() {
        let app = TestApp::new("http://127.0.0.1:9");
        let response = app
            .router()
            .oneshot(post_json(
                "/api/plans/export",
                json!({
                    "plan": {"title": "Sunrise Bakery", "financial_plan": {"revenue": 500}},
                    "prepared_on": "2024-05-01"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], DOCX_CONTENT_TYPE);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Business_Plan_Sunrise_Bakery.docx\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[tokio::test]
    async fn test_export_as_markdown() {
        let app = TestApp::new("http://127.0.0.1:9");
        let response = app
            .router()
            .oneshot(post_json(
                "/api/plans/export",
                json!({
                    "plan": {"title": "Sunrise Bakery", "growth_ideas": ["Catering"]},
                    "format": "markdown"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            "# Sunrise Bakery\n\n## Growth Ideas\n\n- Catering\n"
        );
    }

    #[tokio::test]
    async fn test_completion_route_extracts_fenced_json() {
        let gateway = StubGateway::returning(RawCompletion::Text(
            "```json\n{\"title\": \"Crumbs\"}\n```".to_string(),
        ));
        let app = TestApp::with_gateway("http://127.0.0.1:9", Arc::new(gateway));

        let response = app
            .router()
            .oneshot(post_json("/api/completion", json!({"prompt": "Plan a bakery"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"title": "Crumbs"}));
    }

    #[tokio::test]
    async fn test_completion_route_reports_unparseable_text() {
        let gateway = StubGateway::returning(RawCompletion::Text("I cannot help with that.".to_string()));
        let app = TestApp::with_gateway("http://127.0.0.1:9", Arc::new(gateway));

        let response = app
            .router()
            .oneshot(post_json("/api/completion", json!({"prompt": "Plan a bakery"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            json_body(response).await,
            json!({"error": "AI returned invalid JSON format", "rawResponse": "I cannot help with that."})
        );
    }

    #[tokio::test]
    async fn test_completion_route_validates_body() {
        let app = TestApp::new("http://127.0.0.1:9");

        let blank = app
            .router()
            .oneshot(post_json("/api/completion", json!({"prompt": "  "})))
            .await
            .unwrap();
        assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(blank).await, json!({"error": "Prompt must be a non-empty string"}));

        let text = app
            .router()
            .oneshot(Request::post("/api/completion").body(Body::from("prompt")).unwrap())
            .await
            .unwrap();
        assert_eq!(text.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(text).await,
            json!({"error": "Content-Type must be application/json"})
        );
    }

    #[tokio::test]
    async fn test_completion_route_mirrors_upstream_status() {
        let gateway = StubGateway::failing_once(
            LlmError::Api {
                status: 401,
                message: "Invalid API key".to_string(),
            },
            RawCompletion::Text(String::new()),
        );
        let app = TestApp::with_gateway("http://127.0.0.1:9", Arc::new(gateway));

        let response = app
            .router()
            .oneshot(post_json("/api/completion", json!({"prompt": "Plan a bakery"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await, json!({"error": "Invalid API key"}));
    }
}
