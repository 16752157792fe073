//! Task generator: initiative text in, validated task tree out.
//!
//! Similar past initiatives are looked up first and rendered into the
//! prompt as context. A failed lookup only costs that context; any failure
//! after it (model call, deadline, parse, schema) is a single
//! `DomainError::Generation`.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use super::extract_json_from_response;
use super::historical_retriever::{format_context, HistoricalRetriever};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{count_tasks, total_story_points, validate_task_tree, Task};
use crate::domain::ports::TextGenerator;

/// Settings for a [`TaskGenerator`].
#[derive(Debug, Clone)]
pub struct TaskGeneratorConfig {
    /// How many similar initiatives to include as context.
    pub similar_limit: usize,
    /// Deadline for one generation call.
    pub timeout: Duration,
}

impl Default for TaskGeneratorConfig {
    fn default() -> Self {
        Self {
            similar_limit: 3,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Totals and context info for a generated breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationMetadata {
    pub total_tasks: usize,
    pub total_story_points: u32,
    /// Number of similar initiatives that were offered as context.
    pub similar_initiatives: usize,
}

/// A parsed and validated breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedTasks {
    pub tasks: Vec<Task>,
    pub metadata: GenerationMetadata,
}

/// Accepted response shapes: a bare array or `{"tasks": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum TaskEnvelope {
    List(Vec<Task>),
    Wrapped { tasks: Vec<Task> },
}

impl TaskEnvelope {
    fn into_tasks(self) -> Vec<Task> {
        match self {
            Self::List(tasks) | Self::Wrapped { tasks } => tasks,
        }
    }
}

pub struct TaskGenerator {
    generator: Arc<dyn TextGenerator>,
    retriever: HistoricalRetriever,
    config: TaskGeneratorConfig,
}

impl TaskGenerator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        retriever: HistoricalRetriever,
        config: TaskGeneratorConfig,
    ) -> Self {
        Self {
            generator,
            retriever,
            config,
        }
    }

    pub fn retriever(&self) -> &HistoricalRetriever {
        &self.retriever
    }

    /// Generate a task breakdown for `initiative_text`.
    pub async fn generate(&self, initiative_text: &str) -> DomainResult<GeneratedTasks> {
        let similar = match self
            .retriever
            .find_similar(initiative_text, self.config.similar_limit)
            .await
        {
            Ok(similar) => similar,
            Err(e) => {
                tracing::warn!(error = %e, "historical retrieval failed, generating without context");
                Vec::new()
            }
        };

        let prompt = build_prompt(initiative_text, &format_context(&similar));

        tracing::debug!(
            generator = self.generator.name(),
            similar = similar.len(),
            prompt_len = prompt.len(),
            "requesting task breakdown"
        );

        let response = tokio::time::timeout(self.config.timeout, self.generator.generate(&prompt))
            .await
            .map_err(|_| {
                DomainError::Generation(format!(
                    "{} call timed out after {:?}",
                    self.generator.name(),
                    self.config.timeout
                ))
            })?
            .map_err(|e| match e {
                DomainError::Generation(_) => e,
                other => DomainError::Generation(other.to_string()),
            })?;

        let tasks = parse_tasks(&response)?;
        let metadata = GenerationMetadata {
            total_tasks: count_tasks(&tasks),
            total_story_points: total_story_points(&tasks),
            similar_initiatives: similar.len(),
        };

        tracing::debug!(
            total_tasks = metadata.total_tasks,
            total_story_points = metadata.total_story_points,
            "task breakdown generated"
        );

        Ok(GeneratedTasks { tasks, metadata })
    }
}

/// Parse and validate a model response into a task forest.
pub fn parse_tasks(response: &str) -> DomainResult<Vec<Task>> {
    let json_str = extract_json_from_response(response);

    let tasks = serde_json::from_str::<TaskEnvelope>(&json_str)
        .map_err(|e| {
            DomainError::Generation(format!("response is not a valid task list: {e}"))
        })?
        .into_tasks();

    if tasks.is_empty() {
        return Err(DomainError::Generation(
            "response contained no tasks".to_string(),
        ));
    }

    validate_task_tree(&tasks).map_err(|e| DomainError::Generation(e.to_string()))?;
    Ok(tasks)
}

fn build_prompt(initiative_text: &str, context: &str) -> String {
    format!(
        r#"You are an experienced agile delivery lead breaking a business initiative into tracker work items.

## Initiative
{initiative_text}

## Similar Past Initiatives
{context}

## Instructions
Break the initiative down into Stories, Tasks and Bugs. Use the past initiatives above as a guide to scope and estimation when they are relevant.

- Every item needs a short summary and a description.
- priority is one of Highest, High, Medium, Low, Lowest.
- storyPoints is an integer from 1 to 13.
- Nest subtasks under their parent, at most 4 levels deep.

## Required Output Format (JSON)
```json
[
  {{
    "type": "Story|Task|Bug",
    "summary": "Short title",
    "description": "What needs to be done",
    "priority": "Highest|High|Medium|Low|Lowest",
    "storyPoints": 5,
    "subtasks": []
  }}
]
```

IMPORTANT: Output ONLY the JSON array, no other text."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{InitiativePayload, ScoredPayload, SimilarityIndex};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const ONE_STORY: &str = r#"[{"type":"Story","summary":"Design auth flow","description":"","priority":"High","storyPoints":5}]"#;

    struct ScriptedGenerator {
        response: DomainResult<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn ok(response: &str) -> Self {
            Self {
                response: Ok(response.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn generate(&self, prompt: &str) -> DomainResult<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(DomainError::Generation(e.to_string())),
            }
        }
    }

    /// Answers only after `delay`.
    struct SlowGenerator {
        delay: Duration,
    }

    #[async_trait]
    impl TextGenerator for SlowGenerator {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn generate(&self, _prompt: &str) -> DomainResult<String> {
            tokio::time::sleep(self.delay).await;
            Ok(ONE_STORY.to_string())
        }
    }

    struct FailingIndex;

    #[async_trait]
    impl SimilarityIndex for FailingIndex {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn search(&self, _q: &str, _limit: usize) -> DomainResult<Vec<ScoredPayload>> {
            Err(DomainError::Retrieval("connection refused".to_string()))
        }

        async fn upsert(&self, _id: &str, _t: &str, _p: &InitiativePayload) -> DomainResult<()> {
            Ok(())
        }
    }

    fn task_generator(
        generator: Arc<ScriptedGenerator>,
        index: Arc<dyn SimilarityIndex>,
    ) -> TaskGenerator {
        TaskGenerator::new(
            generator,
            HistoricalRetriever::new(index, Duration::from_secs(1)),
            TaskGeneratorConfig::default(),
        )
    }

    #[test]
    fn test_parse_plain_and_fenced() {
        assert_eq!(parse_tasks(ONE_STORY).unwrap().len(), 1);

        let fenced = format!("Here you go:\n```json\n{ONE_STORY}\n```");
        assert_eq!(parse_tasks(&fenced).unwrap()[0].summary, "Design auth flow");

        let wrapped = format!(r#"{{"tasks": {ONE_STORY}}}"#);
        assert_eq!(parse_tasks(&wrapped).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_rejects_schema_violations() {
        let bad_points = r#"[{"type":"Task","summary":"x","description":"","priority":"Low","storyPoints":21}]"#;
        let bad_kind = r#"[{"type":"Epic","summary":"x","description":"","priority":"Low","storyPoints":2}]"#;
        let bad_priority = r#"[{"type":"Task","summary":"x","description":"","priority":"Urgent","storyPoints":2}]"#;
        let missing_summary = r#"[{"type":"Task","description":"","priority":"Low","storyPoints":2}]"#;

        for input in [bad_points, bad_kind, bad_priority, missing_summary, "[]", "not json"] {
            let err = parse_tasks(input).unwrap_err();
            assert!(matches!(err, DomainError::Generation(_)), "{input}");
        }
    }

    #[test]
    fn test_parse_rejects_deep_trees() {
        let mut json = r#"{"type":"Task","summary":"leaf","description":"","priority":"Low","storyPoints":1}"#.to_string();
        for _ in 0..5 {
            json = format!(
                r#"{{"type":"Task","summary":"n","description":"","priority":"Low","storyPoints":1,"subtasks":[{json}]}}"#
            );
        }
        let err = parse_tasks(&format!("[{json}]")).unwrap_err();
        assert!(err.to_string().contains("depth"));
    }

    #[tokio::test]
    async fn test_generate_computes_totals_and_sends_context() {
        let generator = Arc::new(ScriptedGenerator::ok(ONE_STORY));
        let tg = task_generator(generator.clone(), Arc::new(crate::domain::ports::NullSimilarityIndex));

        let result = tg.generate("Build Auth\nOAuth2 with social login").await.unwrap();
        assert_eq!(result.metadata.total_tasks, 1);
        assert_eq!(result.metadata.total_story_points, 5);
        assert_eq!(result.metadata.similar_initiatives, 0);

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("OAuth2 with social login"));
        assert!(prompts[0].contains(super::super::historical_retriever::NO_SIMILAR_INITIATIVES));
    }

    #[tokio::test]
    async fn test_retrieval_failure_degrades_to_no_context() {
        let generator = Arc::new(ScriptedGenerator::ok(ONE_STORY));
        let tg = task_generator(generator.clone(), Arc::new(FailingIndex));

        let result = tg.generate("Build Auth").await.unwrap();
        assert_eq!(result.tasks.len(), 1);
        assert_eq!(generator.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_generator_failure_is_generation_error() {
        let generator = Arc::new(ScriptedGenerator {
            response: Err(DomainError::Generation("overloaded".to_string())),
            prompts: Mutex::new(Vec::new()),
        });
        let tg = task_generator(generator, Arc::new(crate::domain::ports::NullSimilarityIndex));

        let err = tg.generate("Build Auth").await.unwrap_err();
        assert!(matches!(err, DomainError::Generation(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_deadline_is_generation_error() {
        let tg = TaskGenerator::new(
            Arc::new(SlowGenerator {
                delay: Duration::from_secs(5),
            }),
            HistoricalRetriever::new(
                Arc::new(crate::domain::ports::NullSimilarityIndex),
                Duration::from_secs(1),
            ),
            TaskGeneratorConfig {
                timeout: Duration::from_millis(50),
                ..TaskGeneratorConfig::default()
            },
        );

        let err = tg.generate("Build Auth").await.unwrap_err();
        assert!(matches!(err, DomainError::Generation(_)));
        assert!(err.to_string().contains("timed out"));
    }
}
