// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

pub mod distance;
pub mod filter;
pub mod types;

pub use distance::{DistanceError, DistanceStrategy, ScoreOrder};
pub use filter::{FilterError, FilterNode, Operator, Predicate};
pub use types::{
    derive_id, Document, DocumentInput, MetaValue, Metadata, Scalar, SearchResult,
    StoredDocument,
};
