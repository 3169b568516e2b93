//! Common types and utilities shared across steer crates.
//!
//! This crate defines the geometry the planner speaks in, the uniform result
//! of a page action, encoded screenshots and observability helpers. It is
//! intentionally lightweight so that every crate can depend on it.
//!
//! # Overview
//!
//! - [`geometry`]: normalized boxes and their pixel projections
//! - [`ActionResult`]: outcome of one page action
//! - [`EncodedImage`]: base64 screenshot with its mime type
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use steer_common::ActionResult;
//!
//! let failed = ActionResult::failed("No element found at click coordinates");
//! assert!(!failed.success);
//! assert_eq!(failed.error.as_deref(), Some("No element found at click coordinates"));
//! ```
use serde::{Deserialize, Serialize};

pub mod geometry;
pub mod observability;

pub use geometry::{NormalizedBox, PixelRect, Point, Viewport};

/// Reported for a scroll whose amount is missing or not a finite number.
pub const INVALID_SCROLL: &str = "Invalid scroll_data: relative_amount missing or not a number.";

/// Uniform outcome of a page action.
///
/// Failures are values, not errors: every executor converts its failure
/// paths into `success == false` with a readable `error`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Information the planner asked to record, echoed back verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gathered_info: Option<String>,
    /// Free-form note about how the action was carried out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

impl ActionResult {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    pub fn with_gathered_info(mut self, gathered: impl Into<String>) -> Self {
        self.gathered_info = Some(gathered.into());
        self
    }
}

/// A base64 encoded image, as carried in planner `inline_data` parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    pub mime_type: String,
    pub data: String,
}

impl EncodedImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}
