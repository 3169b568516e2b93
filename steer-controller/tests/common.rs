#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use steer_common::observability::{LogConfig, LogFormat};
use steer_common::{PixelRect, Viewport};
use steer_controller::{Controller, ControllerSettings, InputGate, Notice, Operator};
use steer_drivers::settle::SettlePolicy;
use steer_drivers::testing::MemoryPage;
use steer_planner::adk::AdkPlanner;
use steer_planner::{SessionIdentity, TaskPlan};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "steer-tests",
            emit_stderr: true,
            format: LogFormat::Text,
            default_filter: "debug".into(),
            ..LogConfig::default()
        };
        steer_common::observability::init_logging(config).unwrap_or_default()
    });
}

pub const SESSION_PATH: &str = "/apps/browser_controller/users/u_123/sessions/s_123";

#[derive(Default)]
pub struct RecordingOperator {
    notices: Mutex<Vec<(Notice, String)>>,
    toggles: Mutex<Vec<bool>>,
}

impl RecordingOperator {
    pub fn notices(&self) -> Vec<(Notice, String)> {
        self.notices.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.notices().into_iter().map(|(_, t)| t).collect()
    }

    pub fn toggles(&self) -> Vec<bool> {
        self.toggles.lock().unwrap().clone()
    }
}

impl Operator for RecordingOperator {
    fn notify(&self, kind: Notice, text: &str) {
        self.notices.lock().unwrap().push((kind, text.to_string()));
    }

    fn set_input_enabled(&self, enabled: bool) {
        self.toggles.lock().unwrap().push(enabled);
    }
}

/// Replies with the given templates in order, then with 500s.
pub struct Sequence {
    replies: Vec<ResponseTemplate>,
    next: AtomicUsize,
}

impl Sequence {
    pub fn new(replies: Vec<ResponseTemplate>) -> Self {
        Self {
            replies,
            next: AtomicUsize::new(0),
        }
    }
}

impl Respond for Sequence {
    fn respond(&self, _: &Request) -> ResponseTemplate {
        let i = self.next.fetch_add(1, Ordering::SeqCst);
        self.replies
            .get(i)
            .cloned()
            .unwrap_or_else(|| ResponseTemplate::new(500).set_body_string("no more replies"))
    }
}

pub fn event(author: &str, text: &str) -> Value {
    json!({"author": author, "content": {"role": "model", "parts": [{"text": text}]}})
}

pub fn events(list: Vec<Value>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(Value::Array(list))
}

pub fn reply(author: &str, text: &str) -> ResponseTemplate {
    events(vec![event(author, text)])
}

pub const CLICK_BOX: &str = r#"{"item_description":"Search button","ymin":100,"xmin":100,"ymax":120,"xmax":300}"#;

pub fn button_rect() -> PixelRect {
    PixelRect {
        top: 100.0,
        left: 100.0,
        width: 200.0,
        height: 20.0,
    }
}

pub fn plan() -> TaskPlan {
    TaskPlan {
        goal_summary: "Search for rust".into(),
        successful_end_state: "Results are visible".into(),
        proposed_action_plan: "1. click search 2. type rust".into(),
    }
}

pub fn fast_settings() -> ControllerSettings {
    ControllerSettings {
        session_reset_delay: Duration::from_millis(1),
        settle: SettlePolicy {
            delay: Duration::from_millis(1),
            ready_timeout: Duration::from_millis(20),
            poll: Duration::from_millis(1),
        },
        click_settle: Duration::ZERO,
        ..ControllerSettings::default()
    }
}

pub fn planner(server: &MockServer) -> Arc<AdkPlanner> {
    Arc::new(
        AdkPlanner::new(
            &server.uri(),
            SessionIdentity {
                user_id: "u_123".into(),
                session_id: "s_123".into(),
            },
            Duration::from_secs(5),
        )
        .unwrap(),
    )
}

pub async fn mount_sessions(server: &MockServer, create_status: u16) {
    Mock::given(method("DELETE"))
        .and(path(SESSION_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(SESSION_PATH))
        .respond_with(ResponseTemplate::new(create_status))
        .mount(server)
        .await;
}

pub async fn mount_run(server: &MockServer, replies: Vec<ResponseTemplate>) {
    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(Sequence::new(replies))
        .mount(server)
        .await;
}

pub struct Harness {
    pub server: MockServer,
    pub page: Arc<MemoryPage>,
    pub operator: Arc<RecordingOperator>,
    pub gate: Arc<InputGate>,
    pub controller: Controller,
}

/// A controller wired to a mock planner replaying `replies` on `/run`.
pub async fn harness(replies: Vec<ResponseTemplate>, settings: ControllerSettings) -> Harness {
    init_test_tracing();
    let server = MockServer::start().await;
    mount_sessions(&server, 200).await;
    mount_run(&server, replies).await;

    let page = Arc::new(MemoryPage::new(Viewport::new(1000.0, 1000.0)));
    let operator = Arc::new(RecordingOperator::default());
    let gate = InputGate::new(operator.clone());
    let controller = Controller::new(planner(&server), page.clone(), gate.clone(), settings);
    Harness {
        server,
        page,
        operator,
        gate,
        controller,
    }
}

/// Requests in arrival order as `METHOD /path`.
pub async fn request_log(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| format!("{} {}", r.method, r.url.path()))
        .collect()
}

/// JSON bodies of all `/run` calls, in order.
pub async fn run_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/run")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

/// Text of the first part of a `/run` body.
pub fn first_text(body: &Value) -> String {
    body["new_message"]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}
