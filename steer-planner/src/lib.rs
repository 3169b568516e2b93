//! Client side of the remote planner.
//!
//! The planner is a set of LLM-backed apps reached over HTTP. This crate
//! exposes the wire [`protocol`], the typed [`instruction`] view of its
//! events, the [`TaskPlan`] handed over by the chat app, and the
//! [`traits::Planner`] interface with its HTTP implementation
//! [`adk::AdkPlanner`].
//!
//! # Examples
//! ```no_run
//! use steer_planner::{adk::AdkPlanner, protocol::Part, traits::Planner, Turn};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = steer_config::PlannerSection::default();
//! let planner = AdkPlanner::from_config(&cfg)?;
//! let events = planner.run(&cfg.chat_app, vec![Part::text("hello")]).await?;
//! let turn = Turn::from_events(&events)?;
//! println!("{} said {:?}", turn.author, turn.text);
//! # Ok(()) }
//! ```
pub mod adk;
pub mod instruction;
pub mod plan;
pub mod protocol;
pub mod traits;

pub use instruction::{ActionInstruction, Author, InstructionError, Turn};
pub use plan::{PlanError, TaskPlan};
pub use traits::{Planner, PlannerError, SessionIdentity};
