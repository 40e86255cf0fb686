//! End-to-end tests for the UniPath counselling pipeline.
//!
//! These exercise the full path from an HTTP chat request through the agent
//! loop and the tools down to a real (in-memory) SQLite database, then read
//! the results back through the dashboard endpoints.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use unipath_agent::CounselAgent;
use unipath_config::AppConfig;
use unipath_core::domain::Stage;
use unipath_core::error::ProviderError;
use unipath_core::event::EventBus;
use unipath_core::message::{Message, MessageToolCall, Role};
use unipath_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use unipath_core::store::CounselStore;
use unipath_gateway::{GatewayState, build_router};
use unipath_store::SqliteStore;
use unipath_store::seed::{seed_catalog, seed_demo_profile};
use unipath_tools::NO_RESULTS_MARKER;

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted responses in sequence and keeps
/// every request it was sent.
struct ScriptedProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The content of the last tool message in request `n`.
    fn tool_output(&self, n: usize) -> String {
        let requests = self.requests();
        let msg = requests[n]
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Tool)
            .expect("no tool message in request");
        msg.content.clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let idx = requests.len();
        requests.push(request);
        if idx >= responses.len() {
            panic!(
                "ScriptedProvider exhausted: call #{}, have {}",
                idx,
                responses.len()
            );
        }
        Ok(responses[idx].clone())
    }
}

fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock".into(),
    }
}

fn tool_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    let mut msg = Message::assistant("");
    msg.tool_calls = tool_calls;
    ProviderResponse {
        message: msg,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock".into(),
    }
}

fn make_tool_call(id: &str, name: &str, args: Value) -> MessageToolCall {
    MessageToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

// ── Harness ──────────────────────────────────────────────────────────────

struct Harness {
    app: Router,
    store: Arc<SqliteStore>,
    provider: Arc<ScriptedProvider>,
}

async fn harness(responses: Vec<ProviderResponse>) -> Harness {
    let store = Arc::new(SqliteStore::new("sqlite::memory:").await.unwrap());
    seed_catalog(store.as_ref()).await.unwrap();
    seed_demo_profile(store.as_ref(), "student-1").await.unwrap();

    let provider = Arc::new(ScriptedProvider::new(responses));
    let event_bus = Arc::new(EventBus::default());
    let tools = Arc::new(unipath_tools::counsel_registry(store.clone(), 5));
    let agent = CounselAgent::new(
        provider.clone(),
        "mock",
        0.0,
        tools,
        store.clone(),
        event_bus.clone(),
    );

    let state = Arc::new(GatewayState {
        agent: Arc::new(agent),
        store: store.clone(),
        event_bus,
    });

    Harness {
        app: build_router(state, &[]),
        store,
        provider,
    }
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn chat(app: &Router, messages: Value) -> String {
    let (status, json) = call(
        app,
        "POST",
        "/api/chat",
        Some(json!({"userId": "student-1", "messages": messages})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json["content"].as_str().unwrap().to_string()
}

// ── E2E: search → shortlist → lock ───────────────────────────────────────

#[tokio::test]
async fn e2e_search_shortlist_lock_flow() {
    let h = harness(vec![
        // Turn 1: search within the stored budget
        tool_response(vec![make_tool_call(
            "call_search",
            "searchUniversities",
            json!({"country": "Canada", "maxBudget": 40000}),
        )]),
        text_response("Waterloo, McGill and Dalhousie fit your budget."),
        // Turn 2: interest in Waterloo
        tool_response(vec![make_tool_call(
            "call_add",
            "addToShortlist",
            json!({"userId": "student-1", "universityId": "uwaterloo", "category": "TARGET", "reason": "Strong CS program within budget"}),
        )]),
        text_response("Added Waterloo to your shortlist."),
        // Turn 3: explicit final confirmation
        tool_response(vec![make_tool_call(
            "call_lock",
            "lockUniversity",
            json!({"userId": "student-1", "universityId": "uwaterloo"}),
        )]),
        text_response("Waterloo is locked in. Your application checklist is ready."),
    ])
    .await;

    let reply = chat(
        &h.app,
        json!([{"role": "user", "content": "Which Canadian universities fit my budget?"}]),
    )
    .await;
    assert_eq!(reply, "Waterloo, McGill and Dalhousie fit your budget.");
    let rows: Vec<Value> = serde_json::from_str(&h.provider.tool_output(1)).unwrap();
    assert!(rows.iter().all(|r| r["country"] == "Canada"));
    assert!(rows.iter().all(|r| r["tuition_fee"].as_f64().unwrap() <= 40000.0));

    chat(
        &h.app,
        json!([
            {"role": "user", "content": "Which Canadian universities fit my budget?"},
            {"role": "assistant", "content": reply},
            {"role": "user", "content": "I like Waterloo"}
        ]),
    )
    .await;

    let (_, shortlist) = call(&h.app, "GET", "/api/users/student-1/shortlist", None).await;
    let shortlist = shortlist.as_array().unwrap().clone();
    assert_eq!(shortlist.len(), 1);
    assert_eq!(shortlist[0]["category"], "TARGET");
    assert_eq!(shortlist[0]["is_locked"], false);
    assert_eq!(shortlist[0]["universities"]["name"], "University of Waterloo");

    let reply = chat(
        &h.app,
        json!([{"role": "user", "content": "Yes, Waterloo is my final choice. Lock it."}]),
    )
    .await;
    assert_eq!(reply, "Waterloo is locked in. Your application checklist is ready.");

    let profile = h.store.get_profile("student-1").await.unwrap().unwrap();
    assert_eq!(profile.current_stage, Stage::Application);
    assert_eq!(profile.locked_university_id.as_deref(), Some("uwaterloo"));

    let (_, tasks) = call(&h.app, "GET", "/api/users/student-1/tasks", None).await;
    let tasks = tasks.as_array().unwrap().clone();
    assert_eq!(tasks.len(), 4);
    assert!(tasks.iter().all(|t| t["status"] == "PENDING"));
    assert_eq!(tasks[0]["title"], "Draft Statement of Purpose (SOP)");

    let (_, shortlist) = call(&h.app, "GET", "/api/users/student-1/shortlist", None).await;
    assert_eq!(shortlist[0]["is_locked"], true);
}

// ── E2E: override and anti-hallucination ─────────────────────────────────

#[tokio::test]
async fn e2e_stated_filters_override_profile() {
    // Stored profile targets Canada with a 40000 budget.
    let h = harness(vec![
        tool_response(vec![make_tool_call(
            "call_search",
            "searchUniversities",
            json!({"country": "UK", "maxBudget": 15000}),
        )]),
        text_response("Coventry and Sheffield Hallam are within 15000."),
    ])
    .await;

    chat(
        &h.app,
        json!([{"role": "user", "content": "Actually, show me the UK under 15000"}]),
    )
    .await;

    let system = h.provider.requests()[0].messages[0].content.clone();
    assert!(system.contains("- Target Country: Canada"));

    let rows: Vec<Value> = serde_json::from_str(&h.provider.tool_output(1)).unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["coventry", "sheffield-hallam"]);
}

#[tokio::test]
async fn e2e_empty_search_yields_marker() {
    let h = harness(vec![
        tool_response(vec![make_tool_call(
            "call_search",
            "searchUniversities",
            json!({"country": "Germany"}),
        )]),
        text_response("There are no German universities in our catalog right now."),
    ])
    .await;

    chat(&h.app, json!([{"role": "user", "content": "What about Germany?"}])).await;
    assert_eq!(h.provider.tool_output(1), NO_RESULTS_MARKER);
}

// ── E2E: failure paths ───────────────────────────────────────────────────

#[tokio::test]
async fn e2e_lock_for_unknown_student_creates_nothing() {
    let h = harness(vec![
        tool_response(vec![make_tool_call(
            "call_lock",
            "lockUniversity",
            json!({"userId": "nobody", "universityId": "mcgill"}),
        )]),
        text_response("I couldn't lock that, sorry."),
    ])
    .await;

    chat(&h.app, json!([{"role": "user", "content": "Lock McGill"}])).await;

    let output = h.provider.tool_output(1);
    assert!(output.starts_with("Error locking:"), "got: {output}");
    assert!(h.store.list_tasks("nobody").await.unwrap().is_empty());

    let profile = h.store.get_profile("student-1").await.unwrap().unwrap();
    assert_eq!(profile.current_stage, Stage::Profile);
}

#[tokio::test]
async fn e2e_duplicate_shortlist_adds_create_two_rows() {
    let add = || {
        make_tool_call(
            "call_add",
            "addToShortlist",
            json!({"userId": "student-1", "universityId": "mcgill", "category": "SAFE", "reason": "Affordable"}),
        )
    };
    let h = harness(vec![
        tool_response(vec![add()]),
        tool_response(vec![add()]),
        text_response("Done."),
    ])
    .await;

    chat(&h.app, json!([{"role": "user", "content": "Add McGill"}])).await;
    assert_eq!(h.store.list_shortlist("student-1").await.unwrap().len(), 2);
}

#[tokio::test]
async fn e2e_long_history_is_windowed() {
    let h = harness(vec![text_response("ok")]).await;

    let mut turns: Vec<Value> = (0..20)
        .map(|i| {
            let role = if i % 2 == 0 { "user" } else { "assistant" };
            json!({"role": role, "content": format!("turn {i}")})
        })
        .collect();
    turns.push(json!({"role": "user", "content": "latest question"}));

    chat(&h.app, Value::Array(turns)).await;

    let messages = &h.provider.requests()[0].messages;
    assert_eq!(messages.len(), 1 + 15);
    assert_eq!(messages[1].content, "turn 6");
    assert_eq!(messages.last().unwrap().content, "latest question");
}

// ── E2E: dashboard flow ──────────────────────────────────────────────────

#[tokio::test]
async fn e2e_onboarding_discovery_and_manual_tasks() {
    let h = harness(vec![]).await;

    let (status, profile) = call(
        &h.app,
        "PUT",
        "/api/profiles/student-2/onboarding",
        Some(json!({
            "full_name": "Meera S",
            "academic_data": {"major": "Business Analytics", "history": {"twelfth": {"board": "ICSE", "year": 2022, "percentage": 91}}},
            "preferences": {"budget": 30000, "country": "Ireland", "intake": "Fall 2026"},
            "readiness_data": {"englishTest": "TOEFL", "englishScore": "104"}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["onboarding_completed"], true);

    let (status, cards) = call(
        &h.app,
        "GET",
        "/api/universities?country=Ireland&maxBudget=30000",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let cards = cards.as_array().unwrap().clone();
    assert_eq!(cards.len(), 2);
    assert!(cards.iter().all(|c| c["match"] == "TARGET"));

    let (status, _) = call(
        &h.app,
        "POST",
        "/api/profiles/student-2/stage",
        Some(json!({"stage": "DISCOVERY"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, task) = call(
        &h.app,
        "POST",
        "/api/users/student-2/tasks",
        Some(json!({"title": "Book TOEFL retake"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = task["id"].as_str().unwrap().to_string();

    let (_, toggled) = call(&h.app, "POST", &format!("/api/tasks/{id}/toggle"), None).await;
    assert_eq!(toggled["status"], "DONE");

    let stored = h.store.get_profile("student-2").await.unwrap().unwrap();
    assert_eq!(stored.current_stage, Stage::Discovery);
    assert_eq!(stored.preferences.country.as_deref(), Some("Ireland"));
}

// ── Config wiring ────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_agent_builds_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
default_provider = "ollama"
default_model = "llama3.2"

[agent]
search_limit = 3
"#,
    )
    .unwrap();
    let config = AppConfig::load_from(&path).unwrap();

    let store = Arc::new(SqliteStore::new("sqlite::memory:").await.unwrap());
    let agent = CounselAgent::from_config(&config, store, Arc::new(EventBus::default())).unwrap();

    assert_eq!(agent.model(), "llama3.2");
    assert_eq!(agent.provider_name(), "ollama");
    assert_eq!(
        agent.tools().names(),
        vec!["searchUniversities", "addToShortlist", "lockUniversity"]
    );
}
