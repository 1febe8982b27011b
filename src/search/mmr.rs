// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Max-marginal-relevance reranking
//!
//! Greedy selection over the engine's top-`fetch_k` candidates, balancing
//! relevance to the query against diversity among already-selected results:
//!
//! `mmr = lambda * sim(query, c) - (1 - lambda) * max sim(c, selected)`
//!
//! `lambda = 1` degenerates to pure similarity ranking; `lambda = 0`
//! maximizes diversity irrespective of relevance. Candidate-to-candidate
//! similarity is cosine over the fetched embeddings.

use crate::core::distance::cosine_similarity;
use crate::core::filter::FilterNode;
use crate::core::types::{Document, SearchResult};
use crate::search::engine::{SearchError, SimilarityEngine};

/// Options for an MMR search.
#[derive(Debug, Clone)]
pub struct MmrSearch {
    /// Number of results to return.
    pub k: usize,
    /// Number of candidates fetched before reranking; must be >= `k`.
    pub fetch_k: usize,
    /// Relevance/diversity balance in `0..=1`.
    pub lambda: f32,
    pub filter: Option<FilterNode>,
}

impl Default for MmrSearch {
    fn default() -> Self {
        MmrSearch {
            k: 10,
            fetch_k: 20,
            lambda: 0.5,
            filter: None,
        }
    }
}

impl MmrSearch {
    fn validate(&self) -> Result<(), SearchError> {
        if self.k == 0 {
            return Err(SearchError::InvalidArgument(
                "k must be positive".to_string(),
            ));
        }
        if self.fetch_k < self.k {
            return Err(SearchError::InvalidArgument(format!(
                "fetch_k ({}) must be >= k ({})",
                self.fetch_k, self.k
            )));
        }
        check_lambda(self.lambda)?;
        Ok(())
    }
}

fn check_lambda(lambda: f32) -> Result<(), SearchError> {
    if (0.0..=1.0).contains(&lambda) {
        Ok(())
    } else {
        Err(SearchError::InvalidArgument(format!(
            "lambda must be within 0..=1, got {}",
            lambda
        )))
    }
}

/// Greedy MMR selection over candidate embeddings.
///
/// Returns the indices of the selected candidates in selection order.
/// Ties go to the first-seen candidate in fetched order. Selects fewer
/// than `k` when the candidate set is smaller.
pub fn mmr_select(
    query: &[f32],
    candidates: &[Vec<f32>],
    k: usize,
    lambda: f32,
) -> Result<Vec<usize>, SearchError> {
    check_lambda(lambda)?;

    let mut query_sim = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        query_sim.push(cosine_similarity(query, candidate)?);
    }

    let mut selected: Vec<usize> = Vec::with_capacity(k.min(candidates.len()));
    let mut remaining: Vec<usize> = (0..candidates.len()).collect();

    while selected.len() < k && !remaining.is_empty() {
        let mut best_pos = 0;
        let mut best_score = f32::NEG_INFINITY;

        for (pos, &idx) in remaining.iter().enumerate() {
            let mut max_selected_sim: f32 = 0.0;
            for &chosen in &selected {
                let sim = cosine_similarity(&candidates[idx], &candidates[chosen])?;
                max_selected_sim = max_selected_sim.max(sim);
            }
            let score = lambda * query_sim[idx] - (1.0 - lambda) * max_selected_sim;
            // Strict comparison: equal scores keep the earlier candidate.
            if score > best_score {
                best_score = score;
                best_pos = pos;
            }
        }

        selected.push(remaining.remove(best_pos));
    }

    Ok(selected)
}

impl SimilarityEngine {
    /// Diversity-aware search by query vector.
    pub async fn rerank_by_vector(
        &self,
        query: &[f32],
        options: &MmrSearch,
    ) -> Result<Vec<Document>, SearchError> {
        Ok(self
            .rerank_by_vector_with_scores(query, options)
            .await?
            .into_iter()
            .map(|result| result.document)
            .collect())
    }

    /// Scored variant: each selected document is paired with its
    /// similarity-to-query score from the ranking step.
    pub async fn rerank_by_vector_with_scores(
        &self,
        query: &[f32],
        options: &MmrSearch,
    ) -> Result<Vec<SearchResult>, SearchError> {
        options.validate()?;

        let fetched = self
            .search_by_vector_with_embeddings(query, options.fetch_k, options.filter.as_ref())
            .await?;
        let embeddings: Vec<Vec<f32>> = fetched.iter().map(|(_, _, e)| e.clone()).collect();
        let picks = mmr_select(query, &embeddings, options.k, options.lambda)?;

        let mut fetched: Vec<Option<(Document, f32, Vec<f32>)>> =
            fetched.into_iter().map(Some).collect();
        Ok(picks
            .into_iter()
            .map(|idx| {
                let (document, score, _) = fetched[idx].take().expect("indices are unique");
                SearchResult { document, score }
            })
            .collect())
    }

    /// Text-query variant: embeds the text, then delegates to the vector
    /// form.
    pub async fn rerank(
        &self,
        query: &str,
        options: &MmrSearch,
    ) -> Result<Vec<Document>, SearchError> {
        let vector = self.store().embedder().embed_query(query).await?;
        self.rerank_by_vector(&vector, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mmr_select_lambda_one_is_pure_similarity() {
        let query = vec![1.0, 0.0];
        let candidates = vec![
            vec![0.9, 0.1],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.5, 0.5],
        ];

        let picks = mmr_select(&query, &candidates, 2, 1.0).unwrap();
        assert_eq!(picks, vec![1, 0]);
    }

    #[test]
    fn test_mmr_select_lambda_zero_avoids_near_duplicates() {
        let query = vec![1.0, 0.0];
        // Candidates 0 and 1 are near-duplicates; candidate 2 is orthogonal.
        let candidates = vec![vec![1.0, 0.0], vec![0.999, 0.001], vec![0.0, 1.0]];

        let picks = mmr_select(&query, &candidates, 2, 0.0).unwrap();
        assert_eq!(picks[0], 0);
        assert_eq!(picks[1], 2);
    }

    #[test]
    fn test_mmr_select_fewer_candidates_than_k() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![1.0, 0.0]];

        let picks = mmr_select(&query, &candidates, 5, 0.5).unwrap();
        assert_eq!(picks, vec![0]);
    }

    #[test]
    fn test_mmr_select_rejects_bad_lambda() {
        let result = mmr_select(&[1.0], &[], 1, 1.5);
        assert!(matches!(result, Err(SearchError::InvalidArgument(_))));
    }

    #[test]
    fn test_mmr_select_tie_break_first_seen() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![1.0, 0.0], vec![2.0, 0.0]];

        // Identical direction, identical cosine similarity: first wins.
        let picks = mmr_select(&query, &candidates, 1, 1.0).unwrap();
        assert_eq!(picks, vec![0]);
    }
}
