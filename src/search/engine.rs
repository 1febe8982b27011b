// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Similarity-ranking engine
//!
//! Compiles the filter once, pulls the predicate-restricted candidate set
//! from the document store's read path, scores every candidate with the
//! collection's distance strategy, and returns the best k. Sorting is
//! stable, so equal scores keep their retrieval order.

use crate::backend::BackendError;
use crate::core::distance::DistanceError;
use crate::core::filter::{FilterError, FilterNode};
use crate::core::types::{Document, SearchResult};
use crate::store::{DocumentStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Distance(#[from] DistanceError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<StoreError> for SearchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Distance(e) => SearchError::Distance(e),
            StoreError::Filter(e) => SearchError::Filter(e),
            StoreError::Backend(e) => SearchError::Backend(e),
            StoreError::DuplicateId(id) => {
                SearchError::InvalidArgument(format!("duplicate id: {}", id))
            }
        }
    }
}

pub struct SimilarityEngine {
    store: Arc<DocumentStore>,
}

impl SimilarityEngine {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        SimilarityEngine { store }
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// Top-k search by query vector, best match first.
    pub async fn search_by_vector(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&FilterNode>,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let scored = self.scored_candidates(query, k, filter).await?;
        Ok(scored
            .into_iter()
            .map(|(document, score, _)| SearchResult { document, score })
            .collect())
    }

    /// Like [`search_by_vector`], but keeps each hit's embedding. The MMR
    /// reranker needs the vectors for its diversity term.
    ///
    /// [`search_by_vector`]: SimilarityEngine::search_by_vector
    pub async fn search_by_vector_with_embeddings(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&FilterNode>,
    ) -> Result<Vec<(Document, f32, Vec<f32>)>, SearchError> {
        self.scored_candidates(query, k, filter).await
    }

    /// Text-query variant: embeds the text, then delegates to the vector
    /// form.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&FilterNode>,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let vector = self.store.embedder().embed_query(query).await?;
        self.search_by_vector(&vector, k, filter).await
    }

    async fn scored_candidates(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&FilterNode>,
    ) -> Result<Vec<(Document, f32, Vec<f32>)>, SearchError> {
        if k == 0 {
            return Err(SearchError::InvalidArgument(
                "k must be positive".to_string(),
            ));
        }

        let config = self.store.config();
        if query.len() != config.dimension {
            return Err(DistanceError::DimensionMismatch {
                expected: config.dimension,
                actual: query.len(),
            }
            .into());
        }

        let predicate = FilterNode::compile_opt(filter)?;
        let candidates = self.store.candidates(&predicate, usize::MAX).await?;
        debug!(
            table = %config.table_name,
            candidates = candidates.len(),
            k,
            "scoring candidates"
        );

        let strategy = config.distance_strategy;
        let mut scored = Vec::with_capacity(candidates.len());
        for row in candidates {
            let score = strategy.score(query, &row.embedding)?;
            scored.push((row.document, score, row.embedding));
        }

        // Stable sort keeps retrieval order for equal scores.
        let ordering = strategy.ordering();
        scored.sort_by(|a, b| ordering.compare(a.1, b.1));
        scored.truncate(k);
        Ok(scored)
    }
}
