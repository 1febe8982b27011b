// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Accelerator index lifecycle
//!
//! The index is an optional nearest-neighbor accelerator; search results
//! are correct with or without it. The manager validates parameters before
//! touching the external collaborator and tracks per-name state through
//! `Absent -> Creating -> Ready`, with `Ready -> Absent` on drop. A backend
//! call either fully succeeds or leaves the recorded state unchanged.

use crate::backend::{BackendError, IndexBackend};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Index already exists: {0}")]
    IndexExists(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndexType {
    Ivf,
    Hnsw,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub name: String,
    pub index_type: IndexType,
    /// Partition count for the accelerator; must be positive.
    pub neighbor_partitions: u32,
    /// Target recall percentage, 0..=100.
    pub target_accuracy: u8,
}

impl IndexConfig {
    pub fn new(name: impl Into<String>, index_type: IndexType) -> Self {
        IndexConfig {
            name: name.into(),
            index_type,
            neighbor_partitions: 64,
            target_accuracy: 90,
        }
    }

    fn validate(&self) -> Result<(), IndexError> {
        if self.name.is_empty() {
            return Err(IndexError::InvalidArgument(
                "index name must not be empty".to_string(),
            ));
        }
        if self.neighbor_partitions == 0 {
            return Err(IndexError::InvalidArgument(
                "neighbor_partitions must be positive".to_string(),
            ));
        }
        if self.target_accuracy > 100 {
            return Err(IndexError::InvalidArgument(format!(
                "target_accuracy must be within 0..=100, got {}",
                self.target_accuracy
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexState {
    #[default]
    Absent,
    Creating,
    Ready,
}

/// What `create_index` does when an index of the same name is already
/// `Ready`. The choice is an explicit deployment decision, never inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistingIndexPolicy {
    /// Re-creation returns success without contacting the backend.
    #[default]
    Noop,
    /// Re-creation fails with [`IndexError::IndexExists`].
    Error,
}

pub struct IndexManager {
    backend: Arc<dyn IndexBackend>,
    policy: ExistingIndexPolicy,
    states: RwLock<HashMap<String, IndexState>>,
}

impl IndexManager {
    pub fn new(backend: Arc<dyn IndexBackend>) -> Self {
        Self::with_policy(backend, ExistingIndexPolicy::default())
    }

    pub fn with_policy(backend: Arc<dyn IndexBackend>, policy: ExistingIndexPolicy) -> Self {
        IndexManager {
            backend,
            policy,
            states: RwLock::new(HashMap::new()),
        }
    }

    pub async fn state(&self, name: &str) -> IndexState {
        self.states
            .read()
            .await
            .get(name)
            .copied()
            .unwrap_or_default()
    }

    /// Create an accelerator index.
    ///
    /// Parameters are validated before the collaborator is contacted, so an
    /// invalid config never produces a partially-created index.
    pub async fn create_index(&self, config: IndexConfig) -> Result<(), IndexError> {
        config.validate()?;

        {
            let mut states = self.states.write().await;
            match states.get(&config.name).copied().unwrap_or_default() {
                IndexState::Absent => {
                    states.insert(config.name.clone(), IndexState::Creating);
                }
                IndexState::Creating | IndexState::Ready => {
                    return match self.policy {
                        ExistingIndexPolicy::Noop => {
                            debug!(index = %config.name, "index already exists, skipping");
                            Ok(())
                        }
                        ExistingIndexPolicy::Error => {
                            Err(IndexError::IndexExists(config.name.clone()))
                        }
                    };
                }
            }
        }

        match self.backend.create_index(&config).await {
            Ok(()) => {
                self.states
                    .write()
                    .await
                    .insert(config.name.clone(), IndexState::Ready);
                info!(index = %config.name, "index created");
                Ok(())
            }
            Err(err) => {
                self.states.write().await.remove(&config.name);
                Err(err.into())
            }
        }
    }

    /// Drop an index. On success the name goes back to `Absent`.
    pub async fn drop_index(&self, name: &str) -> Result<(), IndexError> {
        self.backend.drop_index(name).await?;
        self.states.write().await.remove(name);
        info!(index = %name, "index dropped");
        Ok(())
    }
}
