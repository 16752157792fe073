pub mod analytics;
pub mod config;
pub mod initiative;
pub mod revision;
pub mod task;

pub use analytics::{PerformanceMetrics, ProcessMetrics, ProcessTrends, TimeWindow};
pub use config::{
    Config, DatabaseConfig, EmbeddingConfig, GenerationConfig, LoggingConfig, RetrievalBackend,
    RetrievalConfig,
};
pub use initiative::{Initiative, InitiativeStatus};
pub use revision::{Revision, RevisionKind, RevisionMetadata, RevisionScores};
pub use task::{
    count_tasks, total_story_points, validate_task_tree, Task, TaskKind, TaskPriority,
    TaskTreeError, MAX_TASK_DEPTH, MAX_TASK_NODES, visit_tasks,
};
