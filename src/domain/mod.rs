//! Domain layer for the SmartSpec initiative engine
//!
//! This module contains core business logic, domain models and the ports
//! adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
