//! HTTP API endpoints for the Mentora learning platform.
//!
//! # Endpoints
//!
//! - `GET /api/health` - Liveness check
//! - `POST /api/user/register?username=` - Create or fetch a user
//! - `GET /api/user/:username` - Fetch a user
//! - `POST /api/course/generate` - Generate and store a course
//! - `GET /api/course/:course_id` - Fetch a course
//! - `PUT /api/course/:course_id/module?module_index=` - Move the current module
//! - `PUT /api/course/:course_id/complete` - Complete a course and award its badge
//! - `POST /api/quiz/generate?course_id=&module_id=` - Generate a quiz
//! - `POST /api/quiz/submit` - Score a quiz submission
//! - `POST /api/tutor/ask` - Ask the tutor
//! - `POST /api/module/simplify` - Rewrite a module in simpler terms
//! - `POST /api/teaching/submit` - Grade a learner's explanation
//! - `GET /api/progress/:username` - Dashboard data for a learner
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mentora_api::{create_router, AppState, Config, LearningService};
//! use mentora_llm::ScriptedChatClient;
//! use mentora_store::MemoryStore;
//!
//! # async fn example() {
//! let config = Config::default();
//! let service = LearningService::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(ScriptedChatClient::replying("{}")),
//!     config.quiz_scoring,
//! );
//!
//! let router = create_router(AppState::new(config, service));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8001").await.unwrap();
//! axum::serve(listener, router).await.unwrap();
//! # }
//! ```

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use mentora_store::{Course, Module, User};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};

use crate::config::Config;
use crate::error::MentoraError;
use crate::services::LearningService;
use crate::types::{
    Ack, CourseRequest, ModuleIndexParams, ModuleUpdated, ProgressOverview, Quiz, QuizParams,
    QuizResult, QuizSubmission, RegisterParams, SimplifyRequest, TeachingFeedback,
    TeachingSubmission, TutorMessage, TutorResponse,
};

// ============================================================================
// Response Types
// ============================================================================

/// Error response body returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of the error.
    pub error: String,
}

/// Response body of the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "ok".
    pub status: String,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the HTTP server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// The learning operations.
    pub service: LearningService,
}

impl AppState {
    /// Creates a new `AppState`.
    #[must_use]
    pub fn new(config: Config, service: LearningService) -> Self {
        Self { config, service }
    }
}

type SharedState = State<Arc<AppState>>;

// ============================================================================
// API Error Type
// ============================================================================

/// Internal error type for API handlers.
#[derive(Debug)]
struct ApiError(MentoraError);

impl From<MentoraError> for ApiError {
    fn from(err: MentoraError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            MentoraError::NotFound { .. } => StatusCode::NOT_FOUND,
            MentoraError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            MentoraError::Store(e) => {
                error!(error = %e, "Store operation failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            MentoraError::Generation { .. }
            | MentoraError::ConfigParseError { .. }
            | MentoraError::ConfigValidationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with all API endpoints.
///
/// The router has:
/// - All API routes under `/api`
/// - CORS configured from `corsOrigins`
/// - Tracing middleware for request logging
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    let api_routes = Router::new()
        .route("/health", get(handle_health))
        .route("/user/register", post(handle_register_user))
        .route("/user/:username", get(handle_get_user))
        .route("/course/generate", post(handle_generate_course))
        .route("/course/:course_id", get(handle_get_course))
        .route("/course/:course_id/module", put(handle_set_current_module))
        .route("/course/:course_id/complete", put(handle_complete_course))
        .route("/quiz/generate", post(handle_generate_quiz))
        .route("/quiz/submit", post(handle_submit_quiz))
        .route("/tutor/ask", post(handle_ask_tutor))
        .route("/module/simplify", post(handle_simplify_module))
        .route("/teaching/submit", post(handle_submit_teaching))
        .route("/progress/:username", get(handle_progress));

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Builds the CORS layer.
///
/// A `"*"` entry allows any origin without credentials. Otherwise only the
/// listed origins are allowed, with credentials.
fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring CORS origin that is not a valid header value");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

// ============================================================================
// Handlers
// ============================================================================

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn handle_register_user(
    State(state): SharedState,
    Query(params): Query<RegisterParams>,
) -> ApiResult<User> {
    Ok(Json(state.service.register_user(&params.username).await?))
}

async fn handle_get_user(
    State(state): SharedState,
    Path(username): Path<String>,
) -> ApiResult<User> {
    Ok(Json(state.service.get_user(&username).await?))
}

async fn handle_generate_course(
    State(state): SharedState,
    Json(request): Json<CourseRequest>,
) -> ApiResult<Course> {
    Ok(Json(state.service.generate_course(&request).await?))
}

async fn handle_get_course(
    State(state): SharedState,
    Path(course_id): Path<String>,
) -> ApiResult<Course> {
    Ok(Json(state.service.get_course(&course_id).await?))
}

async fn handle_set_current_module(
    State(state): SharedState,
    Path(course_id): Path<String>,
    Query(params): Query<ModuleIndexParams>,
) -> ApiResult<ModuleUpdated> {
    Ok(Json(
        state
            .service
            .set_current_module(&course_id, params.module_index)
            .await?,
    ))
}

async fn handle_complete_course(
    State(state): SharedState,
    Path(course_id): Path<String>,
) -> ApiResult<Ack> {
    Ok(Json(state.service.complete_course(&course_id).await?))
}

async fn handle_generate_quiz(
    State(state): SharedState,
    Query(params): Query<QuizParams>,
) -> ApiResult<Quiz> {
    Ok(Json(
        state
            .service
            .generate_quiz(&params.course_id, &params.module_id)
            .await?,
    ))
}

async fn handle_submit_quiz(
    State(state): SharedState,
    Json(submission): Json<QuizSubmission>,
) -> ApiResult<QuizResult> {
    Ok(Json(state.service.submit_quiz(&submission).await?))
}

async fn handle_ask_tutor(
    State(state): SharedState,
    Json(message): Json<TutorMessage>,
) -> ApiResult<TutorResponse> {
    Ok(Json(state.service.ask_tutor(&message).await?))
}

async fn handle_simplify_module(
    State(state): SharedState,
    Json(request): Json<SimplifyRequest>,
) -> ApiResult<Module> {
    Ok(Json(state.service.simplify_module(&request).await?))
}

async fn handle_submit_teaching(
    State(state): SharedState,
    Json(submission): Json<TeachingSubmission>,
) -> ApiResult<TeachingFeedback> {
    Ok(Json(state.service.submit_teaching(&submission).await?))
}

async fn handle_progress(
    State(state): SharedState,
    Path(username): Path<String>,
) -> ApiResult<ProgressOverview> {
    Ok(Json(state.service.progress_overview(&username).await?))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use mentora_llm::{LlmError, ScriptedChatClient};
    use mentora_store::MemoryStore;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    use super::*;

    const COURSE_REPLY: &str = r#"```json
{"modules": [
    {"title": "Basics", "content": "Start here.", "examples": ["a", "b"], "key_points": ["x", "y", "z"]},
    {"title": "Next", "content": "Then this.", "examples": ["c", "d"], "key_points": ["x", "y", "z"]}
]}
```"#;

    fn router_with(llm: ScriptedChatClient, config: Config) -> Router {
        let service = LearningService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(llm),
            config.quiz_scoring,
        );
        create_router(AppState::new(config, service))
    }

    fn test_router(llm: ScriptedChatClient) -> Router {
        router_with(llm, Config::default())
    }

    fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder().method(method).uri(uri);
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    fn with_origin(origin: &str) -> Request<Body> {
        Request::builder()
            .uri("/api/health")
            .header(header::ORIGIN, origin)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn call(router: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
        send(router, request(method, uri, None)).await
    }

    async fn generate_course(router: &Router) -> Value {
        let body = json!({"username": "ada", "topic": "Rust", "skill_level": "Beginner"});
        let req = request(Method::POST, "/api/course/generate", Some(body));
        let (status, course) = send(router, req).await;
        assert_eq!(status, StatusCode::OK);
        course
    }

    #[tokio::test]
    async fn test_health() {
        let router = test_router(ScriptedChatClient::default());
        let (status, body) = call(&router, Method::GET, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_register_then_get_user() {
        let router = test_router(ScriptedChatClient::default());
        let register = "/api/user/register?username=ada";

        let (status, first) = call(&router, Method::POST, register).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["username"], "ada");
        assert_eq!(first["level"], 1);

        let (_, second) = call(&router, Method::POST, register).await;
        assert_eq!(first["id"], second["id"]);

        let (status, fetched) = call(&router, Method::GET, "/api/user/ada").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["id"], first["id"]);
    }

    #[tokio::test]
    async fn test_unknown_user_is_404() {
        let router = test_router(ScriptedChatClient::default());
        let (status, body) = call(&router, Method::GET, "/api/user/ghost").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "User not found");
    }

    #[tokio::test]
    async fn test_register_requires_username_param() {
        let router = test_router(ScriptedChatClient::default());
        let (status, _) = call(&router, Method::POST, "/api/user/register").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let blank = "/api/user/register?username=%20";
        let (status, body) = call(&router, Method::POST, blank).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "username must not be empty");
    }

    #[tokio::test]
    async fn test_generate_and_fetch_course() {
        let router = test_router(ScriptedChatClient::replying(COURSE_REPLY));
        let course = generate_course(&router).await;

        assert_eq!(course["modules"].as_array().unwrap().len(), 2);
        assert_eq!(course["current_module_index"], 0);
        assert_eq!(course["completed"], false);

        let id = course["id"].as_str().unwrap();
        let (status, fetched) = call(&router, Method::GET, &format!("/api/course/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, course);
    }

    #[tokio::test]
    async fn test_generation_failure_is_500_with_cause() {
        let error = LlmError::from_status(503, "overloaded");
        let router = test_router(ScriptedChatClient::failing(error));
        let body = json!({"username": "ada", "topic": "Rust", "skill_level": "Beginner"});
        let req = request(Method::POST, "/api/course/generate", Some(body));
        let (status, body) = send(&router, req).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = body["error"].as_str().unwrap();
        assert!(message.starts_with("Failed to generate course:"));
    }

    #[tokio::test]
    async fn test_malformed_body_rejected() {
        let router = test_router(ScriptedChatClient::replying(COURSE_REPLY));
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/course/generate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = router.oneshot(req).await.unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_course_module_and_completion() {
        let router = test_router(ScriptedChatClient::replying(COURSE_REPLY));
        call(&router, Method::POST, "/api/user/register?username=ada").await;
        let course = generate_course(&router).await;
        let id = course["id"].as_str().unwrap();

        let uri = format!("/api/course/{id}/module?module_index=1");
        let (status, ack) = call(&router, Method::PUT, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack["message"], "Module updated");
        assert_eq!(ack["current_index"], 1);

        let uri = format!("/api/course/{id}/module?module_index=9");
        let (status, _) = call(&router, Method::PUT, &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let uri = format!("/api/course/{id}/complete");
        for _ in 0..2 {
            let (status, ack) = call(&router, Method::PUT, &uri).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(ack["message"], "Course completed! 🎉");
        }

        let (_, user) = call(&router, Method::GET, "/api/user/ada").await;
        assert_eq!(user["badges"], json!(["Completed Rust"]));
        assert_eq!(user["total_courses"], 1);

        let missing = "/api/course/missing/complete";
        let (status, _) = call(&router, Method::PUT, missing).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_quiz_submit_and_progress() {
        let router = test_router(ScriptedChatClient::replying(COURSE_REPLY));
        call(&router, Method::POST, "/api/user/register?username=ada").await;
        let course = generate_course(&router).await;

        let submission = json!({
            "username": "ada",
            "course_id": course["id"],
            "module_id": course["modules"][0]["id"],
            "answers": [0, 1, 2, 3, 0]
        });
        let req = request(Method::POST, "/api/quiz/submit", Some(submission));
        let (status, result) = send(&router, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result["score"], 5);
        assert_eq!(result["total"], 5);
        assert_eq!(result["percentage"], 100.0);
        assert_eq!(result["passed"], true);
        assert_eq!(result["correct_answers"], json!([0, 0, 0, 0, 0]));

        let (status, overview) = call(&router, Method::GET, "/api/progress/ada").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(overview["user"]["total_modules_completed"], 1);
        assert_eq!(overview["progress"][0]["attempts"], 1);
        assert_eq!(overview["courses"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_quiz_submit_unknown_module_is_404() {
        let router = test_router(ScriptedChatClient::replying(COURSE_REPLY));
        let course = generate_course(&router).await;

        let submission = json!({
            "username": "ada",
            "course_id": course["id"],
            "module_id": "no-such-module",
            "answers": [0, 0, 0]
        });
        let req = request(Method::POST, "/api/quiz/submit", Some(submission));
        let (status, body) = send(&router, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Module not found");

        let (_, overview) = call(&router, Method::GET, "/api/progress/ada").await;
        assert_eq!(overview["progress"], json!([]));
    }

    #[tokio::test]
    async fn test_progress_for_unknown_user_has_null_user() {
        let router = test_router(ScriptedChatClient::default());
        let (status, overview) = call(&router, Method::GET, "/api/progress/ghost").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(overview["user"], Value::Null);
        assert_eq!(overview["progress"], json!([]));
    }

    #[tokio::test]
    async fn test_quiz_generate_unknown_course() {
        let router = test_router(ScriptedChatClient::default());
        let uri = "/api/quiz/generate?course_id=x&module_id=y";
        let (status, body) = call(&router, Method::POST, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Course not found");
    }

    #[tokio::test]
    async fn test_cors_wildcard_allows_any_origin() {
        let router = test_router(ScriptedChatClient::default());
        let req = with_origin("http://example.test");
        let response = router.oneshot(req).await.unwrap();
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_cors_explicit_origins() {
        let mut config = Config::default();
        config.cors_origins = vec!["http://localhost:3000".to_string()];
        let router = router_with(ScriptedChatClient::default(), config);

        let req = with_origin("http://localhost:3000");
        let allowed = router.clone().oneshot(req).await.unwrap();
        let headers = allowed.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");

        let req = with_origin("http://evil.test");
        let denied = router.oneshot(req).await.unwrap();
        let headers = denied.headers();
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}
