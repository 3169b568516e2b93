//! Wire types of the planner's HTTP/JSON interface.
//!
//! Outbound, every exchange is a [`RunRequest`] carrying one user message
//! made of text and inline image parts. Inbound, the planner answers with a
//! non-empty array of [`Event`]s of which only the last one matters.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use steer_common::EncodedImage;

/// Body of `POST /run`.
#[derive(Debug, Clone, Serialize)]
pub struct RunRequest<'a> {
    pub app_name: &'a str,
    pub user_id: &'a str,
    pub session_id: &'a str,
    pub new_message: NewMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub role: String,
    pub parts: Vec<Part>,
}

impl NewMessage {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: "user".into(),
            parts,
        }
    }
}

/// One part of an outbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData { inline_data: EncodedImage },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn image(image: EncodedImage) -> Self {
        Part::InlineData { inline_data: image }
    }
}

/// One event of a `/run` response. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<EventPart>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub error: Option<Value>,
}

fn render_error(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(false) => None,
        other => Some(other.to_string()),
    }
}

impl Event {
    fn first_part(&self) -> Option<&EventPart> {
        self.content.as_ref().and_then(|c| c.parts.first())
    }

    /// Text of the first content part, if non-empty.
    pub fn primary_text(&self) -> Option<&str> {
        self.first_part()
            .and_then(|p| p.text.as_deref())
            .filter(|t| !t.is_empty())
    }

    /// An error reported inside the first part, or else at the top level.
    pub fn embedded_error(&self) -> Option<String> {
        self.first_part()
            .and_then(|p| p.error.as_ref())
            .and_then(render_error)
            .or_else(|| self.error.as_ref().and_then(render_error))
    }
}
