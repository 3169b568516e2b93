//! Observations sent back to the planner after each action attempt.
use steer_common::{ActionResult, EncodedImage};
use steer_planner::protocol::Part;
use steer_planner::Author;

const GATHERED_PREVIEW_CHARS: usize = 150;
pub const SCREENSHOT_MISSING: &str = " (Screenshot capture failed).";

/// Report text plus the post-action screenshot.
///
/// A missing screenshot is spelled out in `text` so the planner never
/// assumes the page looks like the previous image.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub text: String,
    pub screenshot: Option<EncodedImage>,
}

/// First `max` characters of `s`, with `...` appended when cut.
pub(crate) fn preview(s: &str, max: usize) -> String {
    let mut out: String = s.chars().take(max).collect();
    if s.chars().count() > max {
        out.push_str("...");
    }
    out
}

impl Observation {
    pub fn compose(author: Author, result: &ActionResult, screenshot: Option<EncodedImage>) -> Self {
        let name = author.action_name();
        let mut text = if result.success {
            match (author, result.gathered_info.as_deref()) {
                (Author::InformationGatherAgent, gathered) => format!(
                    "Information processed and acknowledged. Gathered info: \"{}\". Here is the current page state.",
                    gathered
                        .map(|g| preview(g, GATHERED_PREVIEW_CHARS))
                        .unwrap_or_else(|| "N/A".into())
                ),
                _ => format!("Action {name} performed successfully. Here is the current page state."),
            }
        } else {
            let reason = result.error.as_deref().unwrap_or("Unknown reason");
            let mut t = format!("Action {name} failed. Reason: {reason}.");
            if matches!(author, Author::ClickAgent | Author::FillAgent) {
                t.push_str(" The intended interaction area is highlighted in red.");
            }
            t.push_str(" Here is the current page state.");
            t
        };
        if screenshot.is_none() {
            text.push_str(SCREENSHOT_MISSING);
        }
        Self { text, screenshot }
    }

    pub fn into_parts(self) -> Vec<Part> {
        let mut parts = vec![Part::text(self.text)];
        if let Some(image) = self.screenshot {
            parts.push(Part::image(image));
        }
        parts
    }
}
