// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared fixtures for integration tests

use async_trait::async_trait;
use doc_vector_store::backend::{BackendError, Embedder, MemoryBackend};
use doc_vector_store::core::types::{DocumentInput, Metadata};
use doc_vector_store::store::{CollectionConfig, DocumentStore};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

/// Deterministic embedder for tests.
///
/// Texts can be programmed to exact vectors; anything else gets a non-zero
/// vector derived from its content hash, so unrelated texts score
/// arbitrarily but reproducibly.
pub struct FakeEmbedder {
    dim: usize,
    table: HashMap<String, Vec<f32>>,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        FakeEmbedder {
            dim,
            table: HashMap::new(),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        assert_eq!(vector.len(), self.dim, "programmed vector has wrong dim");
        self.table.insert(text.to_string(), vector);
        self
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        if let Some(vector) = self.table.get(text) {
            return vector.clone();
        }
        let digest = Sha256::digest(text.as_bytes());
        digest
            .iter()
            .cycle()
            .take(self.dim)
            .map(|&b| b as f32 / 255.0 + 0.01)
            .collect()
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, BackendError> {
        Ok(self.embed(text))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }
}

pub fn collection(
    embedder: FakeEmbedder,
    config: CollectionConfig,
) -> (Arc<MemoryBackend>, Arc<DocumentStore>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("doc_vector_store=debug")
        .with_test_writer()
        .try_init();

    let backend = Arc::new(MemoryBackend::new());
    let store = Arc::new(DocumentStore::new(
        backend.clone(),
        Arc::new(embedder),
        config,
    ));
    (backend, store)
}

pub fn meta(value: serde_json::Value) -> Metadata {
    serde_json::from_value(value).unwrap()
}

pub fn doc(content: &str, metadata: serde_json::Value) -> DocumentInput {
    DocumentInput::new(content).with_metadata(meta(metadata))
}
