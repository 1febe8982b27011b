// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

pub mod engine;
pub mod mmr;

pub use engine::{SearchError, SimilarityEngine};
pub use mmr::{mmr_select, MmrSearch};
