// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

pub mod backend;
pub mod core;
pub mod index;
pub mod search;
pub mod store;
