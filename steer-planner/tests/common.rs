use std::sync::OnceLock;

use steer_common::observability::{LogConfig, LogFormat};
use steer_planner::adk::AdkPlanner;
use steer_planner::SessionIdentity;

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "steer-tests",
            emit_stderr: true,
            format: if std::env::var("STEER_LOG_FORMAT")
                .map(|raw| raw.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false)
            {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
            default_filter: "debug".into(),
            ..LogConfig::default()
        };

        steer_common::observability::init_logging(config).unwrap_or_default()
    });
}

pub fn planner_for(uri: &str) -> AdkPlanner {
    AdkPlanner::new(
        uri,
        SessionIdentity {
            user_id: "u_123".into(),
            session_id: "s_123".into(),
        },
        std::time::Duration::from_secs(5),
    )
    .expect("planner client")
}
