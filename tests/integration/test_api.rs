//! End-to-end tests for the Mentora API.
//!
//! Each test binds a real server on an ephemeral port. Generation goes
//! through `HttpChatClient` to a fake OpenAI-compatible provider that picks
//! its reply from the session key it receives.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{routing::post, Json, Router};
use mentora_api::{create_router, AppState, Config, LearningService, QuizScoring};
use mentora_llm::{ClientOptions, HttpChatClient, RetryPolicy};
use mentora_store::{DocumentStore, FileStore, MemoryStore};
use serde_json::{json, Value};
use tokio::net::TcpListener;

const COURSE_REPLY: &str = r#"Here is your course!
```json
{"modules": [
    {"title": "What is Rust", "content": "Rust is a systems language.", "examples": ["cargo new"], "key_points": ["Fast", "Safe", "Productive"]},
    {"title": "Ownership", "content": "Every value has one owner.", "examples": ["let s = String::new();"], "key_points": ["Moves", "Borrows", "Drops"]},
    {"title": "Borrowing", "content": "References borrow values.", "examples": ["&s"], "key_points": ["Shared", "Mutable", "Rules"]},
    {"title": "Traits", "content": "Traits describe behavior.", "examples": ["impl Display"], "key_points": ["Bounds", "Generics", "Objects"]},
    {"title": "Async", "content": "Futures are lazy.", "examples": [".await"], "key_points": ["Runtimes", "Tasks", "Pinning"]}
]}
```"#;

const QUIZ_REPLY: &str = r#"{"questions": [
    {"question": "Who owns a value?", "options": ["Nobody", "One owner", "Two owners", "The GC"], "correct_answer": 1},
    {"question": "What does & create?", "options": ["A reference", "A copy", "A box", "A thread"], "correct_answer": 0}
]}"#;

const SIMPLIFY_REPLY: &str = r#"```
{"title": "Ownership", "content": "Think of a value like a library book.", "examples": ["a", "b", "c"], "key_points": ["One borrower at a time"]}
```"#;

const TEACHING_REPLY: &str = r#"{"feedback": "Great effort, ada!", "quality_score": 12, "suggestions": ["Mention drops"], "can_proceed": true}"#;

/// Session keys seen by the fake provider.
type Sessions = Arc<Mutex<Vec<String>>>;

/// Starts a fake chat completions provider and returns its base URL.
async fn spawn_provider() -> (String, Sessions) {
    let sessions: Sessions = Arc::default();
    let seen = Arc::clone(&sessions);

    let app = Router::new().route(
        "/v1/chat/completions",
        post(move |Json(body): Json<Value>| {
            let seen = Arc::clone(&seen);
            async move {
                let session = body["user"].as_str().unwrap_or_default().to_string();
                seen.lock().unwrap().push(session.clone());

                let content = if session.starts_with("course_gen_") {
                    COURSE_REPLY.to_string()
                } else if session.starts_with("quiz_gen_") {
                    QUIZ_REPLY.to_string()
                } else if session.starts_with("simplify_") {
                    SIMPLIFY_REPLY.to_string()
                } else if session.starts_with("teaching_") {
                    TEACHING_REPLY.to_string()
                } else {
                    "Ownership means one owner at a time, ada.".to_string()
                };
                Json(json!({"choices": [{"message": {"role": "assistant", "content": content}}]}))
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), sessions)
}

/// Starts the Mentora API over `store`, talking to the provider at `endpoint`.
async fn spawn_api(
    store: Arc<dyn DocumentStore>,
    endpoint: &str,
    scoring: QuizScoring,
) -> SocketAddr {
    let mut config = Config::default();
    config.quiz_scoring = scoring;
    config.llm.endpoint = endpoint.to_string();

    let llm = HttpChatClient::new(ClientOptions {
        endpoint: endpoint.to_string(),
        model: "test-model".to_string(),
        api_key: Some("sk-test".to_string()),
        timeout: Duration::from_secs(5),
        retry: RetryPolicy::none(),
    })
    .expect("Failed to build client");

    let service = LearningService::new(store, Arc::new(llm), scoring);
    let router = create_router(AppState::new(config, service));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn post_json(client: &reqwest::Client, url: String, body: Value) -> (u16, Value) {
    let response = client.post(url).json(&body).send().await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

/// Walks a learner through the whole platform.
#[tokio::test]
async fn test_full_learning_journey() {
    let (endpoint, sessions) = spawn_provider().await;
    let store = Arc::new(MemoryStore::new());
    let addr = spawn_api(store, &endpoint, QuizScoring::Placeholder).await;
    let base = format!("http://{addr}/api");
    let client = reqwest::Client::new();

    // Register
    let user: Value = client
        .post(format!("{base}/user/register?username=ada"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(user["username"], "ada");

    // Course
    let (status, course) = post_json(
        &client,
        format!("{base}/course/generate"),
        json!({"username": "ada", "topic": "Rust", "skill_level": "Beginner", "learning_goal": "Build a CLI"}),
    )
    .await;
    assert_eq!(status, 200);
    let modules = course["modules"].as_array().unwrap();
    assert_eq!(modules.len(), 5);
    assert_eq!(modules[1]["title"], "Ownership");
    let course_id = course["id"].as_str().unwrap().to_string();
    let module_id = modules[1]["id"].as_str().unwrap().to_string();

    // Quiz
    let quiz: Value = client
        .post(format!(
            "{base}/quiz/generate?course_id={course_id}&module_id={module_id}"
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(quiz["module_id"], module_id.as_str());
    assert_eq!(quiz["questions"].as_array().unwrap().len(), 2);

    let (status, result) = post_json(
        &client,
        format!("{base}/quiz/submit"),
        json!({"username": "ada", "course_id": course_id, "module_id": module_id, "answers": [1, 0]}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(result["passed"], true);
    assert_eq!(result["total"], 2);

    // Tutor
    let (status, tutor) = post_json(
        &client,
        format!("{base}/tutor/ask"),
        json!({"username": "ada", "course_id": course_id, "module_id": module_id, "message": "What is ownership?", "context": "learning"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(
        tutor["response"],
        "Ownership means one owner at a time, ada."
    );
    assert!(tutor["encouragement"].as_str().unwrap().contains("ada"));

    // Simplify
    let (status, simplified) = post_json(
        &client,
        format!("{base}/module/simplify"),
        json!({"username": "ada", "course_id": course_id, "module_id": module_id, "difficulty_areas": ["moves"]}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(simplified["id"], module_id.as_str());

    // Teaching
    let (status, feedback) = post_json(
        &client,
        format!("{base}/teaching/submit"),
        json!({"username": "ada", "course_id": course_id, "module_id": module_id, "explanation": "A value has one owner and is dropped with it."}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(feedback["quality_score"], 10);

    // Navigation and completion
    let ack: Value = client
        .put(format!("{base}/course/{course_id}/module?module_index=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ack["current_index"], 2);

    for _ in 0..2 {
        let response = client
            .put(format!("{base}/course/{course_id}/complete"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    // Dashboard
    let overview: Value = client
        .get(format!("{base}/progress/ada"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(overview["user"]["total_courses"], 1);
    assert_eq!(overview["user"]["total_modules_completed"], 1);
    assert_eq!(overview["user"]["badges"], json!(["Completed Rust"]));
    assert_eq!(overview["progress"][0]["attempts"], 1);
    let stored_course = &overview["courses"][0];
    assert_eq!(stored_course["completed"], true);
    assert_eq!(stored_course["current_module_index"], 2);
    assert_eq!(
        stored_course["modules"][1]["content"],
        "Think of a value like a library book."
    );

    let seen = sessions.lock().unwrap().clone();
    assert!(seen[0].starts_with("course_gen_ada_"));
    assert!(seen.contains(&format!("quiz_gen_{module_id}")));
    assert!(seen.contains(&format!("tutor_ada_{course_id}")));
    assert!(seen.contains(&format!("simplify_{module_id}")));
    assert!(seen.contains(&format!("teaching_{module_id}")));
}

/// Stored scoring grades submissions against the quiz that was generated.
#[tokio::test]
async fn test_stored_quiz_scoring_end_to_end() {
    let (endpoint, _) = spawn_provider().await;
    let addr = spawn_api(Arc::new(MemoryStore::new()), &endpoint, QuizScoring::Stored).await;
    let base = format!("http://{addr}/api");
    let client = reqwest::Client::new();

    let (_, course) = post_json(
        &client,
        format!("{base}/course/generate"),
        json!({"username": "ada", "topic": "Rust", "skill_level": "Intermediate"}),
    )
    .await;
    let course_id = course["id"].as_str().unwrap();
    let module_id = course["modules"][0]["id"].as_str().unwrap();
    let submission = json!({"username": "ada", "course_id": course_id, "module_id": module_id, "answers": [0, 0]});

    let (status, body) =
        post_json(&client, format!("{base}/quiz/submit"), submission.clone()).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Quiz not found");

    client
        .post(format!(
            "{base}/quiz/generate?course_id={course_id}&module_id={module_id}"
        ))
        .send()
        .await
        .unwrap();

    let (status, result) = post_json(&client, format!("{base}/quiz/submit"), submission).await;
    assert_eq!(status, 200);
    assert_eq!(result["score"], 1);
    assert_eq!(result["percentage"], 50.0);
    assert_eq!(result["passed"], false);
    assert_eq!(result["correct_answers"], json!([1, 0]));
    assert_eq!(
        result["feedback"],
        "It's okay, Learner. You scored 50%. Learning takes time. Let's simplify this concept and try again. You've got this! 💪"
    );
}

/// Provider failures surface as 500 with the cause, and nothing is stored.
#[tokio::test]
async fn test_unreachable_provider_is_generation_failure() {
    // Grab a free port and release it so connections are refused.
    let endpoint = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        format!("http://{}", listener.local_addr().unwrap())
    };
    let store = Arc::new(MemoryStore::new());
    let addr = spawn_api(store.clone(), &endpoint, QuizScoring::Placeholder).await;
    let client = reqwest::Client::new();

    let (status, body) = post_json(
        &client,
        format!("http://{addr}/api/course/generate"),
        json!({"username": "ada", "topic": "Rust", "skill_level": "Beginner"}),
    )
    .await;

    assert_eq!(status, 500);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to generate course:"));
    assert!(store.courses_for_user("ada").await.unwrap().is_empty());
}

/// Data written through the API survives reopening the data file.
#[tokio::test]
async fn test_file_store_persists_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let data_file = dir.path().join("nested/data.json");
    let (endpoint, _) = spawn_provider().await;

    let store = FileStore::open(&data_file).await.unwrap();
    let addr = spawn_api(Arc::new(store), &endpoint, QuizScoring::Placeholder).await;
    let client = reqwest::Client::new();

    client
        .post(format!("http://{addr}/api/user/register?username=ada"))
        .send()
        .await
        .unwrap();
    let (_, course) = post_json(
        &client,
        format!("http://{addr}/api/course/generate"),
        json!({"username": "ada", "topic": "Rust", "skill_level": "Beginner"}),
    )
    .await;
    let course_id = course["id"].as_str().unwrap();

    let reopened = FileStore::open(&data_file).await.unwrap();
    let user = reopened.find_user("ada").await.unwrap().unwrap();
    assert_eq!(user.total_courses, 1);
    let stored = reopened.find_course(course_id).await.unwrap().unwrap();
    assert_eq!(stored.modules.len(), 5);
    assert_eq!(stored.schema_version, mentora_store::CURRENT_SCHEMA_VERSION);
}
