//! The task plan the chat app hands over when it decides to act.
use serde::{Deserialize, Serialize};

/// Goal, end state and step outline for one automation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPlan {
    pub goal_summary: String,
    pub successful_end_state: String,
    pub proposed_action_plan: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("Perform_action event missing plan text.")]
    Missing,
    #[error("could not parse plan: {0}")]
    Unparsable(String),
    #[error("Incomplete action data from perform_action author.")]
    Incomplete,
}

impl TaskPlan {
    /// Parse the text of a `perform_action` event. Every field must be a
    /// non-empty string.
    ///
    /// ```
    /// use steer_planner::TaskPlan;
    ///
    /// let plan = TaskPlan::from_event_text(Some(
    ///     r#"{"goal_summary":"search","successful_end_state":"results shown","proposed_action_plan":"1. type 2. enter"}"#,
    /// ))
    /// .unwrap();
    /// assert_eq!(plan.goal_summary, "search");
    /// ```
    pub fn from_event_text(text: Option<&str>) -> Result<Self, PlanError> {
        #[derive(Deserialize)]
        struct Loose {
            #[serde(default)]
            goal_summary: Option<String>,
            #[serde(default)]
            successful_end_state: Option<String>,
            #[serde(default)]
            proposed_action_plan: Option<String>,
        }

        let text = text.ok_or(PlanError::Missing)?;
        let loose: Loose =
            serde_json::from_str(text).map_err(|e| PlanError::Unparsable(e.to_string()))?;
        let non_empty = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
        match (
            non_empty(loose.goal_summary),
            non_empty(loose.successful_end_state),
            non_empty(loose.proposed_action_plan),
        ) {
            (Some(goal_summary), Some(successful_end_state), Some(proposed_action_plan)) => {
                Ok(Self {
                    goal_summary,
                    successful_end_state,
                    proposed_action_plan,
                })
            }
            _ => Err(PlanError::Incomplete),
        }
    }

    /// The JSON text sent as the first controller message.
    pub fn to_message_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
