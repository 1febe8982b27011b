// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Document store: ingest, deterministic ids, deletion
//!
//! The store owns the collection's documents and mediates every read and
//! write through the injected storage collaborator. Ids are derived from a
//! hash of caller-supplied id material or, absent that, the document
//! content, so re-inserting identical content is an idempotent upsert.

use crate::backend::{BackendError, Embedder, VectorBackend};
use crate::core::distance::{DistanceError, DistanceStrategy};
use crate::core::filter::{FilterError, Predicate};
use crate::core::types::{derive_id, Document, DocumentInput, StoredDocument};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Duplicate document id: {0}")]
    DuplicateId(String),

    #[error(transparent)]
    Distance(#[from] DistanceError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// What `add` does when an explicitly-identified document collides with an
/// existing id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Collision fails with [`StoreError::DuplicateId`].
    #[default]
    Error,
    /// Collision overwrites the stored document.
    Upsert,
}

/// Outward configuration surface of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionConfig {
    pub table_name: String,
    /// Embedding dimension; every stored vector must have this length.
    pub dimension: usize,
    pub distance_strategy: DistanceStrategy,
    /// Fallback label only; not functional.
    pub default_query: String,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        CollectionConfig {
            table_name: "documents".to_string(),
            dimension: 384,
            distance_strategy: DistanceStrategy::DotProduct,
            default_query: String::new(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

/// Owns the document set of one collection.
///
/// Holds no cross-call mutable state beyond the collection handle; all
/// persistence goes through the injected [`VectorBackend`].
pub struct DocumentStore {
    backend: Arc<dyn VectorBackend>,
    embedder: Arc<dyn Embedder>,
    config: CollectionConfig,
}

impl DocumentStore {
    pub fn new(
        backend: Arc<dyn VectorBackend>,
        embedder: Arc<dyn Embedder>,
        config: CollectionConfig,
    ) -> Self {
        DocumentStore {
            backend,
            embedder,
            config,
        }
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Ingest a batch of documents, returning the assigned ids in input
    /// order.
    ///
    /// Missing embeddings are computed in one embedder batch. Validation
    /// failures surface before anything reaches the backend; whether the
    /// backend applies the final insert atomically is its own business, so
    /// callers must treat a multi-document add as non-atomic.
    pub async fn add(&self, inputs: Vec<DocumentInput>) -> Result<Vec<String>, StoreError> {
        // One embedder round-trip for everything that needs a vector.
        let pending: Vec<String> = inputs
            .iter()
            .filter(|input| input.embedding.is_none())
            .map(|input| input.content.clone())
            .collect();
        let mut computed = if pending.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed_documents(&pending).await?
        }
        .into_iter();

        let mut records = Vec::with_capacity(inputs.len());
        let mut ids = Vec::with_capacity(inputs.len());
        let mut batch_ids: HashSet<String> = HashSet::with_capacity(inputs.len());

        for input in inputs {
            let embedding = match input.embedding {
                Some(embedding) => embedding,
                None => computed.next().ok_or_else(|| {
                    BackendError::Embedding("embedder returned too few vectors".to_string())
                })?,
            };

            if embedding.len() != self.config.dimension {
                return Err(DistanceError::DimensionMismatch {
                    expected: self.config.dimension,
                    actual: embedding.len(),
                }
                .into());
            }

            let explicit = input.id.is_some();
            let id = match &input.id {
                Some(material) => derive_id(material),
                None => derive_id(&input.content),
            };

            // Content-derived ids upsert by construction: same content,
            // same id. Explicit ids honor the collection's policy, both
            // against stored documents and earlier inputs in this batch.
            if explicit
                && self.config.duplicate_policy == DuplicatePolicy::Error
                && (batch_ids.contains(&id) || self.backend.exists(&id).await?)
            {
                return Err(StoreError::DuplicateId(id));
            }
            if explicit {
                batch_ids.insert(id.clone());
            }

            records.push(StoredDocument {
                document: Document {
                    id: id.clone(),
                    content: input.content,
                    metadata: input.metadata,
                },
                embedding,
            });
            ids.push(id);
        }

        debug!(table = %self.config.table_name, count = records.len(), "inserting documents");
        self.backend.insert(records).await?;
        Ok(ids)
    }

    /// Delete by ids, or everything when `delete_all` is set. Neither
    /// argument is a no-op.
    pub async fn delete(&self, ids: Option<&[String]>, delete_all: bool) -> Result<(), StoreError> {
        if delete_all {
            debug!(table = %self.config.table_name, "clearing collection");
            self.backend.delete_all().await?;
            return Ok(());
        }

        match ids {
            Some(ids) if !ids.is_empty() => {
                debug!(table = %self.config.table_name, count = ids.len(), "deleting documents");
                self.backend.delete(ids).await?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Read path for the similarity engine: candidates restricted by a
    /// compiled predicate, in the backend's stable retrieval order.
    pub async fn candidates(
        &self,
        predicate: &Predicate,
        limit: usize,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        Ok(self.backend.query_by_predicate(predicate, limit).await?)
    }

    pub async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.backend.exists(id).await?)
    }
}
