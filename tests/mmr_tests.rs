// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Integration tests for MMR reranking through the similarity engine

mod common;

use async_trait::async_trait;
use common::{collection, FakeEmbedder};
use doc_vector_store::backend::{BackendError, VectorBackend};
use doc_vector_store::core::distance::DistanceStrategy;
use doc_vector_store::core::filter::Predicate;
use doc_vector_store::core::types::{DocumentInput, StoredDocument};
use doc_vector_store::search::{MmrSearch, SearchError, SimilarityEngine};
use doc_vector_store::store::{CollectionConfig, DocumentStore};
use std::sync::Arc;

fn config(dim: usize) -> CollectionConfig {
    CollectionConfig {
        dimension: dim,
        distance_strategy: DistanceStrategy::DotProduct,
        ..Default::default()
    }
}

async fn seeded_engine() -> (Arc<DocumentStore>, SimilarityEngine) {
    let (_, store) = collection(FakeEmbedder::new(3), config(3));
    let engine = SimilarityEngine::new(store.clone());

    store
        .add(vec![
            DocumentInput::new("closest").with_embedding(vec![1.0, 0.0, 0.0]),
            DocumentInput::new("near duplicate").with_embedding(vec![0.98, 0.02, 0.0]),
            DocumentInput::new("related").with_embedding(vec![0.7, 0.3, 0.0]),
            DocumentInput::new("off topic").with_embedding(vec![0.0, 0.0, 1.0]),
        ])
        .await
        .unwrap();

    (store, engine)
}

#[tokio::test]
async fn test_lambda_one_degenerates_to_plain_search() {
    let (_, engine) = seeded_engine().await;
    let query = [1.0, 0.0, 0.0];

    let options = MmrSearch {
        k: 2,
        fetch_k: 4,
        lambda: 1.0,
        filter: None,
    };
    let reranked = engine.rerank_by_vector(&query, &options).await.unwrap();
    let plain = engine.search_by_vector(&query, 2, None).await.unwrap();

    assert_eq!(reranked.len(), 2);
    let plain_docs: Vec<_> = plain.into_iter().map(|result| result.document).collect();
    assert_eq!(reranked, plain_docs);
}

#[tokio::test]
async fn test_lambda_zero_never_picks_near_duplicates() {
    let (_, engine) = seeded_engine().await;
    let query = [1.0, 0.0, 0.0];

    let options = MmrSearch {
        k: 2,
        fetch_k: 4,
        lambda: 0.0,
        filter: None,
    };
    let reranked = engine.rerank_by_vector(&query, &options).await.unwrap();

    assert_eq!(reranked.len(), 2);
    let contents: Vec<&str> = reranked.iter().map(|doc| doc.content.as_str()).collect();
    // The dissimilar alternative must displace the near-duplicate.
    assert!(contents.contains(&"off topic"));
    assert!(!(contents.contains(&"closest") && contents.contains(&"near duplicate")));
}

#[tokio::test]
async fn test_rerank_with_scores_reports_query_similarity() {
    let (_, engine) = seeded_engine().await;
    let query = [1.0, 0.0, 0.0];

    let options = MmrSearch {
        k: 2,
        fetch_k: 4,
        lambda: 1.0,
        filter: None,
    };
    let results = engine
        .rerank_by_vector_with_scores(&query, &options)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].document.content, "closest");
    // Dot-product score of the query against [1, 0, 0].
    assert!((results[0].score - 1.0).abs() < 1e-6);
    assert!(results[0].score >= results[1].score);
}

#[tokio::test]
async fn test_fetch_k_smaller_than_k_is_rejected() {
    let (_, engine) = seeded_engine().await;

    let options = MmrSearch {
        k: 5,
        fetch_k: 2,
        lambda: 0.5,
        filter: None,
    };
    let result = engine.rerank_by_vector(&[1.0, 0.0, 0.0], &options).await;
    assert!(matches!(result, Err(SearchError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_lambda_out_of_range_is_rejected() {
    let (_, engine) = seeded_engine().await;

    let options = MmrSearch {
        k: 2,
        fetch_k: 4,
        lambda: 1.5,
        filter: None,
    };
    let result = engine.rerank_by_vector(&[1.0, 0.0, 0.0], &options).await;
    assert!(matches!(result, Err(SearchError::InvalidArgument(_))));
}

/// Backend that fails every call, so any query reaching it is visible as a
/// `Backend` error instead of `InvalidArgument`.
struct UnreachableBackend;

#[async_trait]
impl VectorBackend for UnreachableBackend {
    async fn insert(&self, _documents: Vec<StoredDocument>) -> Result<(), BackendError> {
        Err(BackendError::Storage("unexpected insert".to_string()))
    }

    async fn query_by_predicate(
        &self,
        _predicate: &Predicate,
        _limit: usize,
    ) -> Result<Vec<StoredDocument>, BackendError> {
        Err(BackendError::Storage("unexpected query".to_string()))
    }

    async fn delete(&self, _ids: &[String]) -> Result<(), BackendError> {
        Err(BackendError::Storage("unexpected delete".to_string()))
    }

    async fn delete_all(&self) -> Result<(), BackendError> {
        Err(BackendError::Storage("unexpected delete_all".to_string()))
    }

    async fn exists(&self, _id: &str) -> Result<bool, BackendError> {
        Err(BackendError::Storage("unexpected exists".to_string()))
    }
}

#[tokio::test]
async fn test_invalid_lambda_never_contacts_backend() {
    let store = Arc::new(DocumentStore::new(
        Arc::new(UnreachableBackend),
        Arc::new(FakeEmbedder::new(3)),
        config(3),
    ));
    let engine = SimilarityEngine::new(store);

    let options = MmrSearch {
        k: 2,
        fetch_k: 4,
        lambda: -0.1,
        filter: None,
    };
    let result = engine.rerank_by_vector(&[1.0, 0.0, 0.0], &options).await;
    assert!(matches!(result, Err(SearchError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_rerank_by_text_query() {
    let embedder = FakeEmbedder::new(3)
        .with("soccer news", vec![1.0, 0.0, 0.0])
        .with("sports?", vec![0.9, 0.1, 0.0]);
    let (_, store) = collection(embedder, config(3));
    let engine = SimilarityEngine::new(store.clone());

    store
        .add(vec![DocumentInput::new("soccer news")])
        .await
        .unwrap();

    let options = MmrSearch {
        k: 1,
        fetch_k: 1,
        lambda: 0.5,
        filter: None,
    };
    let reranked = engine.rerank("sports?", &options).await.unwrap();
    assert_eq!(reranked.len(), 1);
    assert_eq!(reranked[0].content, "soccer news");
}

#[test]
fn test_default_options() {
    let options = MmrSearch::default();
    assert_eq!(options.k, 10);
    assert_eq!(options.fetch_k, 20);
    assert!((options.lambda - 0.5).abs() < f32::EPSILON);
    assert!(options.filter.is_none());
}
