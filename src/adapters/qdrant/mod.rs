//! Qdrant similarity index over the REST API.
//!
//! Each past initiative is stored as one point: the embedding of its
//! title and description as the vector, and the initiative fields plus the
//! embedded text and an insertion timestamp as the payload.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::RetrievalConfig;
use crate::domain::ports::{EmbeddingProvider, InitiativePayload, ScoredPayload, SimilarityIndex};

/// Similarity index backed by a Qdrant collection.
pub struct QdrantIndex {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
    embeddings: Arc<dyn EmbeddingProvider>,
}

impl QdrantIndex {
    pub fn new(config: &RetrievalConfig, embeddings: Arc<dyn EmbeddingProvider>) -> DomainResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DomainError::Retrieval(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            collection: config.collection.clone(),
            embeddings,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/collections/{}{}", self.base_url, self.collection, path);
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    /// Create the collection when it does not exist yet.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub async fn ensure_collection(&self) -> DomainResult<()> {
        let response = self
            .request(reqwest::Method::GET, "")
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => {
                debug!("collection already exists");
                Ok(())
            }
            StatusCode::NOT_FOUND => {
                let body = CreateCollection {
                    vectors: VectorParams {
                        size: self.embeddings.dimension(),
                        distance: "Cosine",
                    },
                };
                let response = self
                    .request(reqwest::Method::PUT, "")
                    .json(&body)
                    .send()
                    .await
                    .map_err(transport_error)?;
                check_status(response).await?;
                info!(dimension = self.embeddings.dimension(), "created collection");
                Ok(())
            }
            _ => check_status(response).await.map(|_| ()),
        }
    }
}

/// Qdrant point ids must be unsigned integers or UUIDs. Other ids map to a
/// stable name-based UUID.
fn point_id(id: &str) -> Uuid {
    Uuid::parse_str(id).unwrap_or_else(|_| Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()))
}

fn transport_error(err: reqwest::Error) -> DomainError {
    DomainError::Retrieval(format!("Qdrant request failed: {err}"))
}

async fn check_status(response: reqwest::Response) -> DomainResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unable to read response body".to_string());
    Err(DomainError::Retrieval(format!("Qdrant returned {status}: {body}")))
}

#[async_trait]
impl SimilarityIndex for QdrantIndex {
    fn name(&self) -> &'static str {
        "qdrant"
    }

    #[instrument(skip(self, query), fields(collection = %self.collection))]
    async fn search(&self, query: &str, limit: usize) -> DomainResult<Vec<ScoredPayload>> {
        let vector = self.embeddings.embed(query).await?;
        let response = self
            .request(reqwest::Method::POST, "/points/search")
            .json(&SearchRequest {
                vector,
                limit,
                with_payload: true,
            })
            .send()
            .await
            .map_err(transport_error)?;

        // A missing collection is an empty index, not a failure.
        if response.status() == StatusCode::NOT_FOUND {
            debug!("collection not found, returning no matches");
            return Ok(Vec::new());
        }

        let body: SearchResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| DomainError::Retrieval(format!("Failed to parse search response: {e}")))?;

        let hits = body
            .result
            .into_iter()
            .filter_map(|hit| {
                let payload = hit.payload?;
                serde_json::from_value::<InitiativePayload>(payload)
                    .ok()
                    .map(|payload| ScoredPayload {
                        payload,
                        score: hit.score,
                    })
            })
            .collect::<Vec<_>>();

        debug!(hits = hits.len(), "search complete");
        Ok(hits)
    }

    #[instrument(skip(self, text, payload), fields(collection = %self.collection))]
    async fn upsert(&self, id: &str, text: &str, payload: &InitiativePayload) -> DomainResult<()> {
        let vector = self.embeddings.embed(text).await?;
        let point = Point {
            id: point_id(id),
            vector,
            payload: StoredPayload {
                initiative: payload,
                text,
                timestamp: Utc::now().to_rfc3339(),
            },
        };

        let response = self
            .request(reqwest::Method::PUT, "/points?wait=true")
            .json(&UpsertRequest { points: vec![point] })
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await?;

        debug!(id, "upserted point");
        Ok(())
    }
}

// -- Qdrant REST request/response types --

#[derive(Debug, Serialize)]
struct CreateCollection {
    vectors: VectorParams,
}

#[derive(Debug, Serialize)]
struct VectorParams {
    size: usize,
    distance: &'static str,
}

#[derive(Debug, Serialize)]
struct SearchRequest {
    vector: Vec<f32>,
    limit: usize,
    with_payload: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    score: f32,
    #[serde(default)]
    payload: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    points: Vec<Point<'a>>,
}

#[derive(Debug, Serialize)]
struct Point<'a> {
    id: Uuid,
    vector: Vec<f32>,
    payload: StoredPayload<'a>,
}

#[derive(Debug, Serialize)]
struct StoredPayload<'a> {
    #[serde(flatten)]
    initiative: &'a InitiativePayload,
    text: &'a str,
    timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    struct ConstantEmbeddings;

    #[async_trait]
    impl EmbeddingProvider for ConstantEmbeddings {
        fn name(&self) -> &'static str {
            "constant"
        }

        fn dimension(&self) -> usize {
            3
        }

        async fn embed(&self, _text: &str) -> DomainResult<Vec<f32>> {
            Ok(vec![0.5, 0.5, 0.0])
        }
    }

    fn index(url: &str) -> QdrantIndex {
        let config = RetrievalConfig {
            url: url.to_string(),
            api_key: Some("qdrant-key".to_string()),
            collection: "initiatives".to_string(),
            ..RetrievalConfig::default()
        };
        QdrantIndex::new(&config, Arc::new(ConstantEmbeddings)).unwrap()
    }

    #[test]
    fn test_point_id_is_stable() {
        let uuid = Uuid::new_v4();
        assert_eq!(point_id(&uuid.to_string()), uuid);
        assert_eq!(point_id("init-1"), point_id("init-1"));
        assert_ne!(point_id("init-1"), point_id("init-2"));
    }

    #[tokio::test]
    async fn test_ensure_collection_creates_when_missing() {
        let mut server = mockito::Server::new_async().await;
        let get = server
            .mock("GET", "/collections/initiatives")
            .match_header("api-key", "qdrant-key")
            .with_status(404)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/collections/initiatives")
            .match_body(Matcher::Json(serde_json::json!({
                "vectors": {"size": 3, "distance": "Cosine"}
            })))
            .with_status(200)
            .with_body(r#"{"result":true,"status":"ok"}"#)
            .create_async()
            .await;

        index(&server.url()).ensure_collection().await.unwrap();
        get.assert_async().await;
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_ensure_collection_skips_existing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/collections/initiatives")
            .with_status(200)
            .with_body(r#"{"result":{},"status":"ok"}"#)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/collections/initiatives")
            .expect(0)
            .create_async()
            .await;

        index(&server.url()).ensure_collection().await.unwrap();
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_decodes_payloads() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/collections/initiatives/points/search")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "limit": 2,
                "with_payload": true
            })))
            .with_status(200)
            .with_body(
                r#"{"result":[
                    {"id":"a","score":0.91,"payload":{"id":"h1","title":"Billing","description":"Invoices","category":"finance","text":"Billing\nInvoices","timestamp":"2024-01-01T00:00:00Z"}},
                    {"id":"b","score":0.40,"payload":null}
                ],"status":"ok"}"#,
            )
            .create_async()
            .await;

        let hits = index(&server.url()).search("billing", 2).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].payload.id, "h1");
        assert_eq!(hits[0].payload.category.as_deref(), Some("finance"));
        assert!((hits[0].score - 0.91).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_search_missing_collection_is_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/collections/initiatives/points/search")
            .with_status(404)
            .create_async()
            .await;

        let hits = index(&server.url()).search("anything", 3).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_sends_flattened_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/collections/initiatives/points")
            .match_query(Matcher::UrlEncoded("wait".into(), "true".into()))
            .match_body(Matcher::PartialJson(serde_json::json!({
                "points": [{
                    "id": point_id("h1").to_string(),
                    "payload": {"id": "h1", "title": "Billing", "text": "Billing\nInvoices"}
                }]
            })))
            .with_status(200)
            .with_body(r#"{"result":{"status":"completed"},"status":"ok"}"#)
            .create_async()
            .await;

        let payload = InitiativePayload::new("h1", "Billing", "Invoices");
        index(&server.url())
            .upsert("h1", &payload.embedding_text(), &payload)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_retrieval_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/collections/initiatives/points")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let payload = InitiativePayload::new("h1", "Billing", "Invoices");
        let err = index(&server.url())
            .upsert("h1", "text", &payload)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Retrieval(_)));
    }
}
