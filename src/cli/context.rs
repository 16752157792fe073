//! Process-wide wiring of adapters and services.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::adapters::anthropic::AnthropicTextGenerator;
use crate::adapters::embeddings::OpenAiEmbeddingProvider;
use crate::adapters::qdrant::QdrantIndex;
use crate::adapters::sqlite::{initialize_database, SqliteInitiativeRepository};
use crate::domain::models::{Config, RetrievalBackend, RetrievalConfig};
use crate::domain::ports::{NullSimilarityIndex, SimilarityIndex, TextGenerator};
use crate::services::{
    AnalyticsService, HistoricalRetriever, HistoryLoader, InitiativeService, TaskGenerator,
    TaskGeneratorConfig,
};

/// Every collaborator a command needs, built once at startup.
pub struct AppContext {
    pub initiatives: InitiativeService<SqliteInitiativeRepository>,
    pub analytics: AnalyticsService<SqliteInitiativeRepository>,
    pub history: HistoryLoader,
}

impl AppContext {
    pub async fn build(config: &Config) -> Result<Self> {
        let pool = initialize_database(&config.database)
            .await
            .with_context(|| format!("Failed to open database at {}", config.database.path))?;
        let repository = Arc::new(SqliteInitiativeRepository::new(pool));

        let index = build_index(&config.retrieval).await?;
        let retriever = HistoricalRetriever::new(
            index,
            Duration::from_secs(config.retrieval.timeout_secs),
        );

        let text_generator: Arc<dyn TextGenerator> = Arc::new(
            AnthropicTextGenerator::new(&config.generation)
                .context("Failed to build the Anthropic client")?,
        );
        let generator = TaskGenerator::new(
            text_generator,
            retriever.clone(),
            TaskGeneratorConfig {
                similar_limit: config.generation.similar_limit,
                timeout: Duration::from_secs(config.generation.timeout_secs),
            },
        );

        Ok(Self {
            initiatives: InitiativeService::new(Arc::clone(&repository), generator),
            analytics: AnalyticsService::new(repository),
            history: HistoryLoader::new(retriever),
        })
    }
}

async fn build_index(config: &RetrievalConfig) -> Result<Arc<dyn SimilarityIndex>> {
    match config.backend {
        RetrievalBackend::None => {
            info!("no similarity index configured, generating without history");
            Ok(Arc::new(NullSimilarityIndex::new()))
        }
        RetrievalBackend::Qdrant => {
            let embeddings = OpenAiEmbeddingProvider::new(
                config.embedding.clone(),
                Duration::from_secs(config.timeout_secs),
            )
            .context("Failed to build the embedding client")?;
            let index = QdrantIndex::new(config, Arc::new(embeddings))
                .context("Failed to build the Qdrant client")?;

            // An unreachable index only degrades generation
            if let Err(e) = index.ensure_collection().await {
                warn!(error = %e, url = %config.url, "could not prepare similarity index");
            }
            Ok(Arc::new(index))
        }
    }
}
