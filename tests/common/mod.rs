//! Shared test doubles for integration tests
//!
//! Hand-written fakes for the generation, retrieval and repository ports,
//! plus a helper that wires an `InitiativeService` over in-memory SQLite.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use smartspec::adapters::sqlite::{create_migrated_test_pool, SqliteInitiativeRepository};
use smartspec::domain::errors::{DomainError, DomainResult};
use smartspec::domain::models::{Initiative, InitiativeStatus, Revision, Task, TaskKind, TaskPriority};
use smartspec::domain::ports::{
    InitiativePayload, InitiativeRepository, ScoredPayload, SimilarityIndex, TextGenerator,
};
use smartspec::services::{HistoricalRetriever, InitiativeService, TaskGenerator, TaskGeneratorConfig};

/// Response for the single-story breakdown used across scenarios.
pub const AUTH_FLOW_RESPONSE: &str = r#"[{"type":"Story","summary":"Design auth flow","description":"","priority":"High","storyPoints":5}]"#;

/// The task `AUTH_FLOW_RESPONSE` parses to.
pub fn auth_flow_task() -> Task {
    Task::new(TaskKind::Story, "Design auth flow", TaskPriority::High, 5)
}

/// Generator that returns a fixed response and records every prompt.
pub struct ScriptedGenerator {
    response: String,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> DomainResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.response.clone())
    }
}

/// Generator whose calls always fail.
pub struct FailingGenerator;

#[async_trait]
impl TextGenerator for FailingGenerator {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn generate(&self, _prompt: &str) -> DomainResult<String> {
        Err(DomainError::Generation("model unavailable".to_string()))
    }
}

/// Generator that answers only after `delay`.
pub struct SlowGenerator {
    pub delay: Duration,
}

#[async_trait]
impl TextGenerator for SlowGenerator {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn generate(&self, _prompt: &str) -> DomainResult<String> {
        tokio::time::sleep(self.delay).await;
        Ok(AUTH_FLOW_RESPONSE.to_string())
    }
}

/// In-memory index with switchable failures.
#[derive(Default)]
pub struct FakeIndex {
    pub hits: Vec<ScoredPayload>,
    pub fail_search: bool,
    pub fail_upsert: bool,
    pub upserts: Mutex<Vec<InitiativePayload>>,
}

impl FakeIndex {
    pub fn with_hits(hits: Vec<ScoredPayload>) -> Self {
        Self {
            hits,
            ..Self::default()
        }
    }

    pub fn failing_search() -> Self {
        Self {
            fail_search: true,
            ..Self::default()
        }
    }

    pub fn failing_upsert() -> Self {
        Self {
            fail_upsert: true,
            ..Self::default()
        }
    }

    pub fn upserted(&self) -> Vec<InitiativePayload> {
        self.upserts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SimilarityIndex for FakeIndex {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn search(&self, _query: &str, limit: usize) -> DomainResult<Vec<ScoredPayload>> {
        if self.fail_search {
            return Err(DomainError::Retrieval("index offline".to_string()));
        }
        Ok(self.hits.iter().take(limit).cloned().collect())
    }

    async fn upsert(&self, _id: &str, _text: &str, payload: &InitiativePayload) -> DomainResult<()> {
        if self.fail_upsert {
            return Err(DomainError::Retrieval("index offline".to_string()));
        }
        self.upserts.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

/// Repository wrapper that counts writes and can inject a competing write.
pub struct CountingRepository {
    pub inner: SqliteInitiativeRepository,
    saves: AtomicUsize,
    race_next_save: AtomicBool,
}

impl CountingRepository {
    pub fn new(inner: SqliteInitiativeRepository) -> Self {
        Self {
            inner,
            saves: AtomicUsize::new(0),
            race_next_save: AtomicBool::new(false),
        }
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make the next save lose a race against another writer.
    pub fn race_next_save(&self) {
        self.race_next_save.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl InitiativeRepository for CountingRepository {
    async fn save(&self, initiative: &Initiative) -> DomainResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.race_next_save.swap(false, Ordering::SeqCst) {
            if let Some(current) = self.inner.find_by_id(initiative.id).await? {
                self.inner.save(&current).await?;
            }
        }
        self.inner.save(initiative).await
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Initiative>> {
        self.inner.find_by_id(id).await
    }

    async fn find_all(&self) -> DomainResult<Vec<Initiative>> {
        self.inner.find_all().await
    }

    async fn find_by_status(&self, status: InitiativeStatus) -> DomainResult<Vec<Initiative>> {
        self.inner.find_by_status(status).await
    }

    async fn find_revisions(&self, initiative_id: Uuid) -> DomainResult<Vec<Revision>> {
        self.inner.find_revisions(initiative_id).await
    }
}

/// Everything a lifecycle test needs to drive and inspect the service.
pub struct Harness {
    pub service: InitiativeService<CountingRepository>,
    pub repository: Arc<CountingRepository>,
    pub index: Arc<FakeIndex>,
}

pub async fn repository() -> SqliteInitiativeRepository {
    let pool = create_migrated_test_pool()
        .await
        .expect("Failed to create test database");
    SqliteInitiativeRepository::new(pool)
}

pub async fn harness(generator: Arc<dyn TextGenerator>, index: FakeIndex) -> Harness {
    harness_with_config(generator, index, TaskGeneratorConfig::default()).await
}

pub async fn harness_with_config(
    generator: Arc<dyn TextGenerator>,
    index: FakeIndex,
    config: TaskGeneratorConfig,
) -> Harness {
    let repository = Arc::new(CountingRepository::new(repository().await));
    let index = Arc::new(index);
    let retriever = HistoricalRetriever::new(index.clone(), Duration::from_secs(1));
    let generator = TaskGenerator::new(generator, retriever, config);

    Harness {
        service: InitiativeService::new(Arc::clone(&repository), generator),
        repository,
        index,
    }
}

/// Setup test logging, ignoring a subscriber installed by another test.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
