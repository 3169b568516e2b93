use crate::protocol::{Event, Part};
use async_trait::async_trait;
use steer_http::HttpError;

/// The fixed `(user, session)` pair every planner app is addressed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user_id: String,
    pub session_id: String,
}

#[derive(thiserror::Error, Debug)]
pub enum PlannerError {
    /// Non-success HTTP status; `body` is a short excerpt of the response.
    #[error("planner returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("could not decode planner response: {0}")]
    Decode(String),

    #[error("Empty or invalid response from planner")]
    EmptyResponse,

    #[error("planner client setup failed: {0}")]
    Setup(String),
}

impl PlannerError {
    pub fn status(&self) -> Option<u16> {
        match self {
            PlannerError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<HttpError> for PlannerError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Api {
                status, message, ..
            } => PlannerError::Status {
                status: status.as_u16(),
                body: message.chars().take(100).collect(),
            },
            HttpError::Network(m) => PlannerError::Network(m),
            HttpError::Decode { message, .. } => PlannerError::Decode(message),
            HttpError::Url(m) | HttpError::Build(m) => PlannerError::Setup(m),
        }
    }
}

/// A stateful remote planner reached through named apps.
#[async_trait]
pub trait Planner: Send + Sync {
    fn identity(&self) -> &SessionIdentity;

    /// Drop any session `app` holds for our identity.
    async fn reset_session(&self, app: &str) -> Result<(), PlannerError>;

    /// Create a fresh session for our identity.
    async fn create_session(&self, app: &str) -> Result<(), PlannerError>;

    /// Send one user message; returns the (non-empty) event list.
    async fn run(&self, app: &str, parts: Vec<Part>) -> Result<Vec<Event>, PlannerError>;
}
