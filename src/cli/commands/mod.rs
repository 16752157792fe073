//! CLI command implementations.

pub mod analytics;
pub mod history;
pub mod initiative;
