//! Bulk loading of past initiatives into the similarity index.

use std::path::Path;

use super::historical_retriever::HistoricalRetriever;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::InitiativePayload;

/// Outcome of a bulk load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    /// `(id, reason)` for every record that was skipped.
    pub failed: Vec<(String, String)>,
}

pub struct HistoryLoader {
    retriever: HistoricalRetriever,
}

impl HistoryLoader {
    pub fn new(retriever: HistoricalRetriever) -> Self {
        Self { retriever }
    }

    /// Index every record, continuing past individual failures.
    pub async fn load(&self, records: &[InitiativePayload]) -> LoadReport {
        let mut report = LoadReport::default();

        for record in records {
            if record.id.trim().is_empty() || record.title.trim().is_empty() {
                report
                    .failed
                    .push((record.id.clone(), "id and title are required".to_string()));
                continue;
            }

            match self.retriever.remember(record).await {
                Ok(()) => {
                    tracing::debug!(id = %record.id, title = %record.title, "indexed initiative");
                    report.loaded += 1;
                }
                Err(e) => {
                    tracing::warn!(id = %record.id, error = %e, "failed to index initiative");
                    report.failed.push((record.id.clone(), e.to_string()));
                }
            }
        }

        tracing::info!(
            loaded = report.loaded,
            failed = report.failed.len(),
            "historical initiatives loaded"
        );
        report
    }

    /// Read a JSON array of records from `path` and index them.
    pub async fn load_file(&self, path: &Path) -> DomainResult<LoadReport> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            DomainError::ValidationFailed(format!("cannot read {}: {e}", path.display()))
        })?;
        let records = parse_records(&content)?;
        Ok(self.load(&records).await)
    }
}

/// Parse a JSON array of historical initiatives.
pub fn parse_records(content: &str) -> DomainResult<Vec<InitiativePayload>> {
    serde_json::from_str(content)
        .map_err(|e| DomainError::ValidationFailed(format!("invalid initiative records: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{ScoredPayload, SimilarityIndex};
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingIndex {
        upserts: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl SimilarityIndex for RecordingIndex {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn search(&self, _q: &str, _limit: usize) -> DomainResult<Vec<ScoredPayload>> {
            Ok(Vec::new())
        }

        async fn upsert(&self, id: &str, text: &str, _p: &InitiativePayload) -> DomainResult<()> {
            if id == "boom" {
                return Err(DomainError::Retrieval("rejected".to_string()));
            }
            self.upserts.lock().unwrap().push((id.to_string(), text.to_string()));
            Ok(())
        }
    }

    fn loader(index: Arc<RecordingIndex>) -> HistoryLoader {
        HistoryLoader::new(HistoricalRetriever::new(index, Duration::from_secs(1)))
    }

    #[tokio::test]
    async fn test_load_continues_past_failures() {
        let index = Arc::new(RecordingIndex::default());
        let records = vec![
            InitiativePayload::new("1", "Payments", "Card checkout"),
            InitiativePayload::new("boom", "Broken", "x"),
            InitiativePayload::new("", "No id", "x"),
            InitiativePayload::new("2", "Search", "Full text search"),
        ];

        let report = loader(index.clone()).load(&records).await;
        assert_eq!(report.loaded, 2);
        assert_eq!(report.failed.len(), 2);

        let upserts = index.upserts.lock().unwrap();
        assert_eq!(upserts[0], ("1".to_string(), "Payments\nCard checkout".to_string()));
    }

    #[tokio::test]
    async fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id":"7","title":"Audit log","description":"Track changes","category":"Compliance","priority":"High"}}]"#
        )
        .unwrap();

        let index = Arc::new(RecordingIndex::default());
        let report = loader(index.clone()).load_file(file.path()).await.unwrap();
        assert_eq!(report.loaded, 1);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_parse_records_rejects_garbage() {
        assert!(matches!(
            parse_records("{not json"),
            Err(DomainError::ValidationFailed(_))
        ));
    }
}
