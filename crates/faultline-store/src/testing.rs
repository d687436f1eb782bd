// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Test helpers shared by this crate and its dependents.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::pool::migrate;

/// In-memory pool with the full schema applied.
///
/// Capped at one connection: every connection to `:memory:` gets its own
/// database, so a larger pool would scatter the schema.
pub async fn create_test_pool() -> SqlitePool {
	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.connect(":memory:")
		.await
		.unwrap();
	migrate(&pool).await.unwrap();
	pool
}
