//! WebDriver-backed page access.
pub mod driver;
pub mod page;
