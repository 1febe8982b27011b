// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use crate::backend::{BackendError, IndexBackend, VectorBackend};
use crate::core::filter::Predicate;
use crate::core::types::StoredDocument;
use crate::index::IndexConfig;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-process backend used by tests and embedded deployments.
///
/// Rows keep insertion order so that retrieval order, and therefore
/// equal-score tie-breaking upstream, is deterministic. Inserting an id
/// that already exists replaces the row in place.
#[derive(Default)]
pub struct MemoryBackend {
    rows: Arc<RwLock<Vec<StoredDocument>>>,
    indexes: DashMap<String, IndexConfig>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    pub fn index(&self, name: &str) -> Option<IndexConfig> {
        self.indexes.get(name).map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl VectorBackend for MemoryBackend {
    async fn insert(&self, documents: Vec<StoredDocument>) -> Result<(), BackendError> {
        let mut rows = self.rows.write().await;
        for document in documents {
            match rows
                .iter_mut()
                .find(|row| row.document.id == document.document.id)
            {
                Some(existing) => *existing = document,
                None => rows.push(document),
            }
        }
        Ok(())
    }

    async fn query_by_predicate(
        &self,
        predicate: &Predicate,
        limit: usize,
    ) -> Result<Vec<StoredDocument>, BackendError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|row| predicate.matches(&row.document.metadata))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn delete(&self, ids: &[String]) -> Result<(), BackendError> {
        let mut rows = self.rows.write().await;
        rows.retain(|row| !ids.contains(&row.document.id));
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), BackendError> {
        self.rows.write().await.clear();
        Ok(())
    }

    async fn exists(&self, id: &str) -> Result<bool, BackendError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().any(|row| row.document.id == id))
    }
}

#[async_trait]
impl IndexBackend for MemoryBackend {
    async fn create_index(&self, config: &IndexConfig) -> Result<(), BackendError> {
        self.indexes.insert(config.name.clone(), config.clone());
        Ok(())
    }

    async fn drop_index(&self, name: &str) -> Result<(), BackendError> {
        self.indexes.remove(name);
        Ok(())
    }
}
