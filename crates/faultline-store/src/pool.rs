// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteSynchronous};

use crate::error::{Result, StoreError};

/// Create a SqlitePool with WAL mode and common settings.
///
/// # Arguments
/// * `database_url` - SQLite connection string (e.g., "sqlite:./faultline.db")
///
/// # Errors
/// Returns `StoreError::Internal` if the URL is invalid or the connection fails.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| StoreError::Internal(format!("invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.create_if_missing(true);

	let pool = SqlitePool::connect_with(options).await?;

	tracing::debug!("database pool created");
	Ok(pool)
}

const MIGRATIONS: &[&str] = &[
	r#"
	CREATE TABLE IF NOT EXISTS apps (
		id TEXT PRIMARY KEY,
		name TEXT NOT NULL,
		api_key_hash TEXT UNIQUE NOT NULL,
		created_at TEXT NOT NULL,
		retention_days INTEGER DEFAULT 30
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS crash_groups (
		id TEXT PRIMARY KEY,
		app_id TEXT NOT NULL,
		fingerprint TEXT NOT NULL,
		error_type TEXT,
		error_message TEXT,
		first_seen TEXT NOT NULL,
		last_seen TEXT NOT NULL,
		occurrence_count INTEGER DEFAULT 1,
		status TEXT DEFAULT 'open',
		assigned_to TEXT,
		notes TEXT,
		FOREIGN KEY (app_id) REFERENCES apps(id),
		UNIQUE(app_id, fingerprint)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS crashes (
		id TEXT PRIMARY KEY,
		app_id TEXT NOT NULL,
		app_version TEXT,
		platform TEXT,
		os_version TEXT,
		device_model TEXT,
		error_type TEXT,
		error_message TEXT,
		fingerprint TEXT NOT NULL,
		group_id TEXT,
		user_id TEXT,
		environment TEXT,
		created_at TEXT NOT NULL,
		blob_path TEXT,
		metadata TEXT,
		FOREIGN KEY (app_id) REFERENCES apps(id),
		FOREIGN KEY (group_id) REFERENCES crash_groups(id)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS alerts (
		id TEXT PRIMARY KEY,
		app_id TEXT NOT NULL,
		type TEXT NOT NULL,
		config TEXT,
		enabled INTEGER DEFAULT 1,
		created_at TEXT NOT NULL,
		FOREIGN KEY (app_id) REFERENCES apps(id)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS settings (
		key TEXT PRIMARY KEY,
		value TEXT NOT NULL
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_crashes_app_id ON crashes(app_id)",
	"CREATE INDEX IF NOT EXISTS idx_crashes_group_id ON crashes(group_id)",
	"CREATE INDEX IF NOT EXISTS idx_crashes_created_at ON crashes(created_at)",
	"CREATE INDEX IF NOT EXISTS idx_crashes_fingerprint ON crashes(fingerprint)",
	"CREATE INDEX IF NOT EXISTS idx_crash_groups_app_id ON crash_groups(app_id)",
	"CREATE INDEX IF NOT EXISTS idx_crash_groups_fingerprint ON crash_groups(app_id, fingerprint)",
	"CREATE INDEX IF NOT EXISTS idx_crash_groups_status ON crash_groups(status)",
];

/// Apply the schema. Safe to run at every boot.
#[tracing::instrument(skip(pool))]
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
	for statement in MIGRATIONS {
		sqlx::query(statement).execute(pool).await?;
	}
	tracing::debug!("database schema up to date");
	Ok(())
}
