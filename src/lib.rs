//! SmartSpec - initiative breakdowns with a revision ledger
//!
//! SmartSpec turns a business initiative (title and description) into a
//! hierarchical task breakdown suggested by a language model, lets people
//! revise and approve it, and scores every revision against the original
//! suggestion so the quality of suggestions can be tracked over time.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors and the ports adapters implement
//! - **Service Layer** (`services`): lifecycle, generation, retrieval, scoring, analytics
//! - **Adapters** (`adapters`): SQLite, Anthropic, OpenAI embeddings, Qdrant
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use smartspec::cli::AppContext;
//! use smartspec::infrastructure::config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let ctx = AppContext::build(&config).await?;
//!     let initiative = ctx
//!         .initiatives
//!         .create_initiative("Billing revamp", "Move invoicing onto the new ledger")
//!         .await?;
//!     println!("{} suggested tasks", initiative.revisions[0].metadata.total_tasks);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Config, Initiative, InitiativeStatus, Revision, RevisionKind, Task, TaskKind, TaskPriority,
};
pub use domain::ports::{InitiativeRepository, SimilarityIndex, TextGenerator};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{AnalyticsService, InitiativeService, TaskGenerator};
