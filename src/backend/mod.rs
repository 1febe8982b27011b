// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! External collaborator interfaces
//!
//! The core never reaches ambient/global state: the embedding model, the
//! storage engine, and the index facility are constructor-injected behind
//! these traits so the rest of the crate stays testable with fakes.

pub mod memory;

use crate::core::filter::Predicate;
use crate::core::types::StoredDocument;
use crate::index::IndexConfig;
use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryBackend;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),
}

/// Embedding model collaborator. Both calls may suspend.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, BackendError>;

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError>;
}

/// Storage engine collaborator holding the document collection.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Insert records, replacing any record with the same document id.
    async fn insert(&self, documents: Vec<StoredDocument>) -> Result<(), BackendError>;

    /// Return up to `limit` records whose metadata satisfies the predicate,
    /// in stable retrieval order.
    async fn query_by_predicate(
        &self,
        predicate: &Predicate,
        limit: usize,
    ) -> Result<Vec<StoredDocument>, BackendError>;

    async fn delete(&self, ids: &[String]) -> Result<(), BackendError>;

    async fn delete_all(&self) -> Result<(), BackendError>;

    async fn exists(&self, id: &str) -> Result<bool, BackendError>;
}

/// Accelerator-index collaborator. Correctness of search never depends on
/// it; it only speeds up nearest-neighbor retrieval.
#[async_trait]
pub trait IndexBackend: Send + Sync {
    async fn create_index(&self, config: &IndexConfig) -> Result<(), BackendError>;

    async fn drop_index(&self, name: &str) -> Result<(), BackendError>;
}
