//! Adapters for external systems.

pub mod anthropic;
pub mod embeddings;
pub mod qdrant;
pub mod sqlite;
