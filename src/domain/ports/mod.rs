//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - InitiativeRepository: persistence of initiatives and their revisions
//! - TextGenerator: language model completion
//! - SimilarityIndex: vector search over past initiatives
//! - EmbeddingProvider: text embeddings used by index adapters

pub mod embedding;
pub mod initiative_repository;
pub mod null_index;
pub mod similarity_index;
pub mod text_generator;

pub use embedding::EmbeddingProvider;
pub use initiative_repository::InitiativeRepository;
pub use null_index::NullSimilarityIndex;
pub use similarity_index::{InitiativePayload, ScoredPayload, SimilarityIndex};
pub use text_generator::TextGenerator;
