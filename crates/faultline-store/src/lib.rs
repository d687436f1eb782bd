// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Indexed persistence for Faultline.
//!
//! This crate holds the relational side of the hybrid storage design: apps,
//! crash groups, the searchable crash index, alert rules, and the settings
//! bag, all in SQLite via `sqlx`. The full crash payloads (stack traces and
//! breadcrumbs) live in `faultline-blobstore`; crashes read back from here
//! carry only the indexed projection.

pub mod error;
pub mod pool;
pub mod sqlite;
pub mod store;
pub mod testing;

pub use error::{Result, StoreError};
pub use pool::{create_pool, migrate};
pub use sqlite::SqliteCrashStore;
pub use store::{CrashFilter, CrashStore, GroupFilter, GroupSort, SortOrder, DEFAULT_PAGE_LIMIT};
