//! Typed view of planner events.
//!
//! The planner names the sub-agent that produced each event in its `author`
//! field. [`Turn::from_events`] validates the structure of the last event and
//! [`Turn::instruction`] turns its payload into an [`ActionInstruction`].
use crate::protocol::Event;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
pub use steer_common::INVALID_SCROLL;
use steer_common::NormalizedBox;

pub const MISSING_INFORMATION: &str =
    "Information gather event from controller was missing 'information' text.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Author {
    PerformAction,
    NavigateAgent,
    ClickAgent,
    FillAgent,
    ScrollAgent,
    InformationGatherAgent,
    ConcludingAgent,
    ShowElement,
}

impl Author {
    pub const ALL: [Author; 8] = [
        Author::PerformAction,
        Author::NavigateAgent,
        Author::ClickAgent,
        Author::FillAgent,
        Author::ScrollAgent,
        Author::InformationGatherAgent,
        Author::ConcludingAgent,
        Author::ShowElement,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Author::PerformAction => "perform_action",
            Author::NavigateAgent => "navigate_agent",
            Author::ClickAgent => "click_agent",
            Author::FillAgent => "fill_agent",
            Author::ScrollAgent => "scroll_agent",
            Author::InformationGatherAgent => "information_gather_agent",
            Author::ConcludingAgent => "concluding_agent",
            Author::ShowElement => "show_element",
        }
    }

    /// Short action name used in operator and planner messages (`click`).
    pub fn action_name(self) -> &'static str {
        let tag = self.tag();
        tag.strip_suffix("_agent").unwrap_or(tag)
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Author {
    type Err = InstructionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Author::ALL
            .into_iter()
            .find(|a| a.tag() == s)
            .ok_or_else(|| InstructionError::UnknownAuthor(s.to_string()))
    }
}

/// Problems turning a planner event into something executable.
///
/// Only [`InstructionError::InvalidPayload`] is recoverable: it is reported
/// back to the planner like any failed action. Everything else ends the run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InstructionError {
    #[error("planner returned no events")]
    EmptyResponse,
    #[error("{0}")]
    PlannerReported(String),
    #[error("invalid event structure from planner (author: {0})")]
    Malformed(String),
    #[error("unknown author `{0}`")]
    UnknownAuthor(String),
    #[error("unexpected author `{0}`")]
    Unexpected(Author),
    #[error("{0}")]
    InvalidPayload(String),
}

impl InstructionError {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, InstructionError::InvalidPayload(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionInstruction {
    Navigate {
        url: String,
    },
    Click {
        bbox: NormalizedBox,
        item_description: Option<String>,
    },
    Fill {
        bbox: NormalizedBox,
        field_value: String,
        field_name: Option<String>,
    },
    Scroll {
        relative_amount: f64,
    },
    Information {
        information: String,
    },
    Conclude {
        message: Option<String>,
    },
}

#[derive(Deserialize)]
struct NavigatePayload {
    url: String,
}

#[derive(Deserialize)]
struct ClickPayload {
    #[serde(flatten)]
    bbox: NormalizedBox,
    #[serde(default)]
    item_description: Option<String>,
}

#[derive(Deserialize)]
struct FillPayload {
    #[serde(flatten)]
    bbox: NormalizedBox,
    field_value: String,
    #[serde(default)]
    field_name: Option<String>,
}

fn parse<'a, T: Deserialize<'a>>(author: Author, text: &'a str) -> Result<T, InstructionError> {
    serde_json::from_str(text).map_err(|e| {
        InstructionError::InvalidPayload(format!(
            "could not parse {} payload: {e}",
            author.action_name()
        ))
    })
}

impl ActionInstruction {
    pub fn author(&self) -> Author {
        match self {
            ActionInstruction::Navigate { .. } => Author::NavigateAgent,
            ActionInstruction::Click { .. } => Author::ClickAgent,
            ActionInstruction::Fill { .. } => Author::FillAgent,
            ActionInstruction::Scroll { .. } => Author::ScrollAgent,
            ActionInstruction::Information { .. } => Author::InformationGatherAgent,
            ActionInstruction::Conclude { .. } => Author::ConcludingAgent,
        }
    }

    /// Decode the payload an `author` sent as text.
    pub fn decode(author: Author, text: Option<&str>) -> Result<Self, InstructionError> {
        let require = || text.ok_or_else(|| InstructionError::Malformed(author.to_string()));
        match author {
            Author::ConcludingAgent => Ok(ActionInstruction::Conclude {
                message: text.map(concluding_message),
            }),
            Author::NavigateAgent => {
                let p: NavigatePayload = parse(author, require()?)?;
                Ok(ActionInstruction::Navigate { url: p.url })
            }
            Author::ClickAgent => {
                let p: ClickPayload = parse(author, require()?)?;
                Ok(ActionInstruction::Click {
                    bbox: p.bbox,
                    item_description: p.item_description,
                })
            }
            Author::FillAgent => {
                let p: FillPayload = parse(author, require()?)?;
                Ok(ActionInstruction::Fill {
                    bbox: p.bbox,
                    field_value: p.field_value,
                    field_name: p.field_name,
                })
            }
            Author::ScrollAgent => {
                let v: Value = parse(author, require()?)?;
                match v.get("relative_amount").and_then(Value::as_f64) {
                    Some(relative_amount) => Ok(ActionInstruction::Scroll { relative_amount }),
                    None => Err(InstructionError::InvalidPayload(INVALID_SCROLL.into())),
                }
            }
            Author::InformationGatherAgent => {
                let v: Value = parse(author, require()?)?;
                match v.get("information").and_then(Value::as_str) {
                    Some(info) => Ok(ActionInstruction::Information {
                        information: info.to_string(),
                    }),
                    None => Err(InstructionError::InvalidPayload(MISSING_INFORMATION.into())),
                }
            }
            Author::PerformAction | Author::ShowElement => {
                Err(InstructionError::Unexpected(author))
            }
        }
    }
}

/// Concluding payloads come as `{"concluding": "..."}` or as plain text.
fn concluding_message(text: &str) -> String {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v.get("concluding").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| text.to_string())
}

/// The structurally valid last event of a planner response.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub author: Author,
    pub text: Option<String>,
}

impl Turn {
    /// Validate the last event of `events`.
    ///
    /// An embedded error wins over everything else; then the author must be
    /// present and known, and only the concluding author may omit text.
    pub fn from_events(events: &[Event]) -> Result<Self, InstructionError> {
        let last = events.last().ok_or(InstructionError::EmptyResponse)?;
        if let Some(err) = last.embedded_error() {
            return Err(InstructionError::PlannerReported(err));
        }
        let tag = last
            .author
            .as_deref()
            .filter(|a| !a.is_empty())
            .ok_or_else(|| InstructionError::Malformed("none".into()))?;
        let author: Author = tag.parse()?;
        let text = last.primary_text().map(str::to_owned);
        if text.is_none() && author != Author::ConcludingAgent {
            return Err(InstructionError::Malformed(author.to_string()));
        }
        Ok(Self { author, text })
    }

    pub fn instruction(&self) -> Result<ActionInstruction, InstructionError> {
        ActionInstruction::decode(self.author, self.text.as_deref())
    }
}
