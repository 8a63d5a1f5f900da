//! Execution engine UI
//!
//! Planning and applying live in the `declarative` crate. This module
//! renders plans, drives progress bars, and asks for confirmation.

pub mod differ;
pub mod executor;

pub use differ::display_plan;
pub use executor::{BarProgress, PromptConfirm, print_summary};
