// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Date-sharded file storage for full crash payloads.
//!
//! The indexed store keeps only the searchable projection of a crash; the
//! complete record (stack trace, breadcrumbs, metadata) is written here as
//! pretty-printed JSON under `{app_id}/{YYYY-MM-DD}/{crash_id}.json`. The
//! date partitioning makes retention a directory-level delete instead of a
//! file-by-file scan.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::instrument;

use faultline_core::{AppId, Crash};

/// Format of the date shard directories.
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BlobStoreError>;

/// Storage usage for one application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageStats {
	pub total_files: u64,
	pub total_bytes: u64,
}

/// Append-only store of full crash records on the local filesystem.
pub struct BlobStore {
	root: PathBuf,
}

impl BlobStore {
	/// Open the store, creating the root directory if needed.
	///
	/// An unwritable root is a boot-time failure; the service must refuse to
	/// start rather than run without payload storage.
	pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
		let root = root.into();
		fs::create_dir_all(&root).await?;
		Ok(Self { root })
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Write the full crash record; returns the relative path.
	#[instrument(skip(self, crash), fields(crash_id = %crash.id, app_id = %crash.app_id))]
	pub async fn write(&self, crash: &Crash) -> Result<String> {
		let date = crash.created_at.date_naive().format(DATE_FORMAT);
		let relative = format!("{}/{}/{}.json", crash.app_id, date, crash.id);

		let path = self.root.join(&relative);
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).await?;
		}

		let data = serde_json::to_vec_pretty(crash)?;
		fs::write(&path, data).await?;

		tracing::debug!(path = %relative, "crash payload written");
		Ok(relative)
	}

	/// Read a crash record back by its relative path.
	///
	/// Returns `None` when the file does not exist (e.g. after retention
	/// removed the partition).
	#[instrument(skip(self))]
	pub async fn read(&self, relative: &str) -> Result<Option<Crash>> {
		let path = self.root.join(relative);
		let data = match fs::read(&path).await {
			Ok(data) => data,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(e.into()),
		};

		Ok(Some(serde_json::from_slice(&data)?))
	}

	/// Delete a crash record; silently succeeds if it is already gone.
	/// Newly empty ancestor directories are pruned up to (not including)
	/// the root.
	#[instrument(skip(self))]
	pub async fn delete(&self, relative: &str) -> Result<()> {
		let path = self.root.join(relative);
		match fs::remove_file(&path).await {
			Ok(()) => {}
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
			Err(e) => return Err(e.into()),
		}

		if let Some(parent) = path.parent() {
			self.prune_empty_dirs(parent).await;
		}
		Ok(())
	}

	/// Delete every date partition for `app_id` older than `cutoff`.
	/// Returns the number of files removed.
	#[instrument(skip(self), fields(app_id = %app_id, cutoff = %cutoff))]
	pub async fn delete_partitions_before(&self, app_id: AppId, cutoff: NaiveDate) -> Result<u64> {
		let app_dir = self.root.join(app_id.to_string());
		let mut entries = match fs::read_dir(&app_dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
			Err(e) => return Err(e.into()),
		};

		let cutoff_name = cutoff.format(DATE_FORMAT).to_string();
		let mut deleted = 0u64;

		while let Some(entry) = entries.next_entry().await? {
			if !entry.file_type().await?.is_dir() {
				continue;
			}
			let name = entry.file_name();
			let Some(name) = name.to_str() else {
				continue;
			};
			// Shard names sort lexicographically in date order.
			if name >= cutoff_name.as_str() {
				continue;
			}

			let dir = entry.path();
			deleted += count_files(&dir).await?;
			fs::remove_dir_all(&dir).await?;
		}

		Ok(deleted)
	}

	/// Relative paths of all payloads for `app_id` with shard dates in
	/// `[from, to]`.
	#[instrument(skip(self), fields(app_id = %app_id))]
	pub async fn list_in_range(
		&self,
		app_id: AppId,
		from: NaiveDate,
		to: NaiveDate,
	) -> Result<Vec<String>> {
		let app = app_id.to_string();
		let app_dir = self.root.join(&app);
		let mut entries = match fs::read_dir(&app_dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(e.into()),
		};

		let from_name = from.format(DATE_FORMAT).to_string();
		let to_name = to.format(DATE_FORMAT).to_string();
		let mut paths = Vec::new();

		while let Some(entry) = entries.next_entry().await? {
			if !entry.file_type().await?.is_dir() {
				continue;
			}
			let name = entry.file_name();
			let Some(name) = name.to_str() else {
				continue;
			};
			if name < from_name.as_str() || name > to_name.as_str() {
				continue;
			}

			let mut files = fs::read_dir(entry.path()).await?;
			while let Some(file) = files.next_entry().await? {
				let file_name = file.file_name();
				let Some(file_name) = file_name.to_str() else {
					continue;
				};
				if file.file_type().await?.is_file() && file_name.ends_with(".json") {
					paths.push(format!("{app}/{name}/{file_name}"));
				}
			}
		}

		paths.sort();
		Ok(paths)
	}

	/// File count and total size of all payloads stored for `app_id`.
	#[instrument(skip(self), fields(app_id = %app_id))]
	pub async fn stats(&self, app_id: AppId) -> Result<StorageStats> {
		let app_dir = self.root.join(app_id.to_string());
		let mut stats = StorageStats::default();
		let mut shards = match fs::read_dir(&app_dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(stats),
			Err(e) => return Err(e.into()),
		};

		while let Some(shard) = shards.next_entry().await? {
			if !shard.file_type().await?.is_dir() {
				continue;
			}
			let mut files = fs::read_dir(shard.path()).await?;
			while let Some(file) = files.next_entry().await? {
				let metadata = file.metadata().await?;
				if metadata.is_file() {
					stats.total_files += 1;
					stats.total_bytes += metadata.len();
				}
			}
		}

		Ok(stats)
	}

	async fn prune_empty_dirs(&self, start: &Path) {
		let mut dir = start.to_path_buf();
		while dir != self.root && dir.starts_with(&self.root) {
			match fs::read_dir(&dir).await {
				Ok(mut entries) => match entries.next_entry().await {
					Ok(None) => {
						if fs::remove_dir(&dir).await.is_err() {
							break;
						}
					}
					_ => break,
				},
				Err(_) => break,
			}
			match dir.parent() {
				Some(parent) => dir = parent.to_path_buf(),
				None => break,
			}
		}
	}
}

async fn count_files(dir: &Path) -> Result<u64> {
	let mut entries = fs::read_dir(dir).await?;
	let mut count = 0u64;
	while let Some(entry) = entries.next_entry().await? {
		if entry.file_type().await?.is_file() {
			count += 1;
		}
	}
	Ok(count)
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{Duration, TimeZone, Utc};
	use faultline_core::{CrashId, GroupId, StackFrame};

	fn make_crash(app_id: AppId) -> Crash {
		Crash {
			id: CrashId::new(),
			app_id,
			app_version: "1.0.0".to_string(),
			platform: "flutter".to_string(),
			os_version: String::new(),
			device_model: String::new(),
			error_type: "FormatException".to_string(),
			error_message: "Unexpected character".to_string(),
			stack_trace: vec![StackFrame {
				file_name: "a.dart".to_string(),
				line_number: 10,
				method_name: "parse".to_string(),
				..Default::default()
			}],
			fingerprint: "abcdef0123456789".to_string(),
			group_id: GroupId::new(),
			user_id: "user-7".to_string(),
			environment: "production".to_string(),
			created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap(),
			blob_path: String::new(),
			metadata: serde_json::Map::new(),
			breadcrumbs: Vec::new(),
		}
	}

	async fn setup() -> (tempfile::TempDir, BlobStore) {
		let dir = tempfile::tempdir().unwrap();
		let store = BlobStore::open(dir.path().join("crashes")).await.unwrap();
		(dir, store)
	}

	#[tokio::test]
	async fn write_then_read_preserves_the_record() {
		let (_dir, store) = setup().await;
		let app_id = AppId::new();
		let crash = make_crash(app_id);

		let relative = store.write(&crash).await.unwrap();
		assert_eq!(
			relative,
			format!("{}/2025-06-01/{}.json", app_id, crash.id)
		);

		let read_back = store.read(&relative).await.unwrap().unwrap();
		assert_eq!(read_back.id, crash.id);
		assert_eq!(read_back.error_message, crash.error_message);
		assert_eq!(read_back.stack_trace.len(), 1);
		assert_eq!(read_back.stack_trace[0].method_name, "parse");
	}

	#[tokio::test]
	async fn read_missing_returns_none() {
		let (_dir, store) = setup().await;
		let missing = store.read("nope/2025-01-01/gone.json").await.unwrap();
		assert!(missing.is_none());
	}

	#[tokio::test]
	async fn delete_is_idempotent_and_prunes_empty_dirs() {
		let (_dir, store) = setup().await;
		let crash = make_crash(AppId::new());
		let relative = store.write(&crash).await.unwrap();

		store.delete(&relative).await.unwrap();
		assert!(store.read(&relative).await.unwrap().is_none());
		// Date and app directories are gone; the root survives.
		assert!(!store.root().join(crash.app_id.to_string()).exists());
		assert!(store.root().exists());

		// Second delete is a no-op.
		store.delete(&relative).await.unwrap();
	}

	#[tokio::test]
	async fn delete_keeps_nonempty_directories() {
		let (_dir, store) = setup().await;
		let app_id = AppId::new();
		let first = make_crash(app_id);
		let second = make_crash(app_id);

		let first_path = store.write(&first).await.unwrap();
		store.write(&second).await.unwrap();

		store.delete(&first_path).await.unwrap();
		// The shard still holds the second payload.
		assert!(store.root().join(app_id.to_string()).join("2025-06-01").exists());
	}

	#[tokio::test]
	async fn partitions_before_cutoff_are_removed() {
		let (_dir, store) = setup().await;
		let app_id = AppId::new();

		let mut old = make_crash(app_id);
		old.created_at = old.created_at - Duration::days(40);
		let mut older = make_crash(app_id);
		older.created_at = older.created_at - Duration::days(41);
		let recent = make_crash(app_id);

		store.write(&old).await.unwrap();
		store.write(&older).await.unwrap();
		let recent_path = store.write(&recent).await.unwrap();

		let cutoff = recent.created_at.date_naive() - Duration::days(30);
		let deleted = store.delete_partitions_before(app_id, cutoff).await.unwrap();

		assert_eq!(deleted, 2);
		assert!(store.read(&recent_path).await.unwrap().is_some());
		let shards = std::fs::read_dir(store.root().join(app_id.to_string()))
			.unwrap()
			.count();
		assert_eq!(shards, 1);
	}

	#[tokio::test]
	async fn partition_delete_for_unknown_app_is_zero() {
		let (_dir, store) = setup().await;
		let deleted = store
			.delete_partitions_before(AppId::new(), Utc::now().date_naive())
			.await
			.unwrap();
		assert_eq!(deleted, 0);
	}

	#[tokio::test]
	async fn list_in_range_filters_by_shard_date() {
		let (_dir, store) = setup().await;
		let app_id = AppId::new();

		let mut old = make_crash(app_id);
		old.created_at = old.created_at - Duration::days(10);
		let recent = make_crash(app_id);

		store.write(&old).await.unwrap();
		let recent_path = store.write(&recent).await.unwrap();

		let day = recent.created_at.date_naive();
		let listed = store.list_in_range(app_id, day, day).await.unwrap();
		assert_eq!(listed, vec![recent_path]);
	}

	#[tokio::test]
	async fn stats_count_files_and_bytes() {
		let (_dir, store) = setup().await;
		let app_id = AppId::new();
		store.write(&make_crash(app_id)).await.unwrap();
		store.write(&make_crash(app_id)).await.unwrap();

		let stats = store.stats(app_id).await.unwrap();
		assert_eq!(stats.total_files, 2);
		assert!(stats.total_bytes > 0);

		let empty = store.stats(AppId::new()).await.unwrap();
		assert_eq!(empty.total_files, 0);
	}
}
