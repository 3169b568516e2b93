use crate::protocol::{Event, NewMessage, Part, RunRequest};
use crate::traits::{Planner, PlannerError, SessionIdentity};
use async_trait::async_trait;
use std::time::Duration;
use steer_config::PlannerSection;
use steer_http::{Auth, HttpClient, RequestOpts};
use tracing::{debug, info, warn};

/// [`Planner`] speaking the agent-server `/run` + session REST interface.
///
/// Transport failures are never retried: a failed exchange ends the run.
pub struct AdkPlanner {
    client: HttpClient,
    identity: SessionIdentity,
    api_token: Option<String>,
}

impl AdkPlanner {
    pub fn new(
        base_url: &str,
        identity: SessionIdentity,
        timeout: Duration,
    ) -> Result<Self, PlannerError> {
        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let client = HttpClient::new(&base)?.with_timeout(timeout);
        Ok(Self {
            client,
            identity,
            api_token: None,
        })
    }

    pub fn from_config(cfg: &PlannerSection) -> Result<Self, PlannerError> {
        let identity = SessionIdentity {
            user_id: cfg.user_id.clone(),
            session_id: cfg.session_id.clone(),
        };
        let mut planner = Self::new(&cfg.base_url, identity, cfg.timeout())?;
        planner.api_token = cfg.api_token.clone().filter(|t| !t.trim().is_empty());
        Ok(planner)
    }

    fn opts(&self) -> RequestOpts<'_> {
        RequestOpts {
            auth: self.api_token.as_deref().map(Auth::Bearer),
            ..Default::default()
        }
    }

    fn session_path(&self, app: &str) -> String {
        format!(
            "apps/{app}/users/{}/sessions/{}",
            self.identity.user_id, self.identity.session_id
        )
    }
}

#[async_trait]
impl Planner for AdkPlanner {
    fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    async fn reset_session(&self, app: &str) -> Result<(), PlannerError> {
        let path = self.session_path(app);
        self.client.delete(&path, self.opts()).await?;
        debug!(target: "planner.session", %app, "session deleted");
        Ok(())
    }

    async fn create_session(&self, app: &str) -> Result<(), PlannerError> {
        let path = self.session_path(app);
        self.client
            .post_status(&path, &serde_json::json!({}), self.opts())
            .await?;
        info!(target: "planner.session", %app, "session created");
        Ok(())
    }

    async fn run(&self, app: &str, parts: Vec<Part>) -> Result<Vec<Event>, PlannerError> {
        let n_parts = parts.len();
        let req = RunRequest {
            app_name: app,
            user_id: &self.identity.user_id,
            session_id: &self.identity.session_id,
            new_message: NewMessage::user(parts),
        };
        let events: Vec<Event> = self.client.post_json("run", &req, self.opts()).await?;
        if events.is_empty() {
            warn!(target: "planner.run", %app, "empty event list");
            return Err(PlannerError::EmptyResponse);
        }
        debug!(
            target: "planner.run",
            %app,
            parts = n_parts,
            events = events.len(),
            last_author = events.last().and_then(|e| e.author.as_deref()).unwrap_or("-"),
            "planner replied"
        );
        Ok(events)
    }
}
