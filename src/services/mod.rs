//! Application services for the initiative lifecycle.

pub mod analytics_service;
pub mod historical_retriever;
pub mod history_loader;
pub mod initiative_service;
pub mod revision_ledger;
pub mod task_generator;

pub use analytics_service::AnalyticsService;
pub use historical_retriever::HistoricalRetriever;
pub use history_loader::{HistoryLoader, LoadReport};
pub use initiative_service::InitiativeService;
pub use revision_ledger::{accuracy, edit_distance};
pub use task_generator::{GeneratedTasks, TaskGenerator, TaskGeneratorConfig};

/// Extract the JSON document from a model response.
///
/// Handles fenced code blocks (with or without a `json` tag) and prose
/// around a bare array or object.
pub fn extract_json_from_response(response: &str) -> String {
    let trimmed = response.trim();

    for fence in ["```json", "```"] {
        if let Some(start) = trimmed.find(fence) {
            let body = &trimmed[start + fence.len()..];
            if let Some(end) = body.find("```") {
                return body[..end].trim().to_string();
            }
        }
    }

    // First bracket that opens a complete JSON value; earlier brackets in
    // prose (e.g. "[draft]") are skipped.
    for (start, _) in trimmed.match_indices(|c: char| c == '[' || c == '{') {
        let mut values =
            serde_json::Deserializer::from_str(&trimmed[start..]).into_iter::<serde_json::Value>();
        if let Some(Ok(_)) = values.next() {
            let end = start + values.byte_offset();
            return trimmed[start..end].to_string();
        }
    }

    trimmed.to_string()
}
