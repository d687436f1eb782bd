// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background retention sweeper.
//!
//! Runs one sweep immediately at start, then at a fixed interval. Each sweep
//! walks every registered app, computes its cutoff from the per-app
//! retention window (or the system default), and bulk-deletes expired rows
//! from the indexed store and expired date partitions from the blob store.
//! A failure for one app never stops the sweep for the rest, and a whole
//! sweep is bounded by a deadline so a wedged store cannot hang the worker.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use faultline_blobstore::BlobStore;
use faultline_core::AppId;
use faultline_store::CrashStore;

/// Upper bound on a single sweep.
const SWEEP_DEADLINE: Duration = Duration::from_secs(30 * 60);

/// Periodic worker enforcing per-app retention across both stores.
pub struct RetentionSweeper {
	store: Arc<dyn CrashStore>,
	blobs: Arc<BlobStore>,
	default_days: i64,
	interval: Duration,
	shutdown_tx: broadcast::Sender<()>,
	worker: Mutex<Option<JoinHandle<()>>>,
}

impl RetentionSweeper {
	pub fn new(
		store: Arc<dyn CrashStore>,
		blobs: Arc<BlobStore>,
		default_days: i64,
		interval: Duration,
	) -> Self {
		let (shutdown_tx, _) = broadcast::channel(1);
		Self {
			store,
			blobs,
			default_days,
			interval,
			shutdown_tx,
			worker: Mutex::new(None),
		}
	}

	/// Start the worker: sweep once now, then on every tick.
	pub async fn start(&self) {
		let store = Arc::clone(&self.store);
		let blobs = Arc::clone(&self.blobs);
		let default_days = self.default_days;
		let interval = self.interval;
		let mut shutdown_rx = self.shutdown_tx.subscribe();

		let handle = tokio::spawn(async move {
			run_sweep(&store, &blobs, default_days).await;

			loop {
				tokio::select! {
					_ = tokio::time::sleep(interval) => {
						run_sweep(&store, &blobs, default_days).await;
					}
					_ = shutdown_rx.recv() => {
						info!("shutting down retention sweeper");
						break;
					}
				}
			}
		});

		*self.worker.lock().await = Some(handle);
		info!(interval_secs = self.interval.as_secs(), "retention sweeper started");
	}

	/// Signal the worker and wait for it to exit.
	pub async fn stop(&self) {
		let _ = self.shutdown_tx.send(());
		if let Some(handle) = self.worker.lock().await.take() {
			let _ = handle.await;
		}
		info!("retention sweeper stopped");
	}

	/// Trigger a sweep without waiting for the next tick.
	pub fn run_now(&self) {
		let store = Arc::clone(&self.store);
		let blobs = Arc::clone(&self.blobs);
		let default_days = self.default_days;
		tokio::spawn(async move {
			run_sweep(&store, &blobs, default_days).await;
		});
	}

	/// Delete all stored records for one app, used when the app is removed.
	/// The cutoff sits one hour in the future so nothing survives.
	#[instrument(skip(self), fields(app_id = %app_id))]
	pub async fn cleanup_app(&self, app_id: AppId) -> faultline_store::Result<()> {
		let cutoff = Utc::now() + ChronoDuration::hours(1);
		self.store.delete_crashes_before(app_id, cutoff).await?;
		if let Err(e) = self
			.blobs
			.delete_partitions_before(app_id, cutoff.date_naive())
			.await
		{
			error!(app_id = %app_id, error = %e, "failed to delete crash payloads");
		}
		Ok(())
	}
}

/// One bounded sweep over every app.
async fn run_sweep(store: &Arc<dyn CrashStore>, blobs: &Arc<BlobStore>, default_days: i64) {
	match tokio::time::timeout(SWEEP_DEADLINE, sweep_all_apps(store, blobs, default_days)).await {
		Ok(()) => {}
		Err(_) => warn!("retention sweep hit its deadline and was cancelled"),
	}
}

async fn sweep_all_apps(store: &Arc<dyn CrashStore>, blobs: &Arc<BlobStore>, default_days: i64) {
	info!("starting retention sweep");
	let started = std::time::Instant::now();

	let apps = match store.list_apps().await {
		Ok(apps) => apps,
		Err(e) => {
			error!(error = %e, "failed to list apps for retention sweep");
			return;
		}
	};

	let mut total_rows = 0u64;
	let mut total_files = 0u64;

	for app in apps {
		let retention_days = app.effective_retention_days(default_days);
		let cutoff = Utc::now() - ChronoDuration::days(retention_days);

		let rows = match store.delete_crashes_before(app.id, cutoff).await {
			Ok(rows) => rows,
			Err(e) => {
				error!(app_id = %app.id, error = %e, "failed to delete expired crash rows");
				0
			}
		};
		total_rows += rows;

		let files = match blobs
			.delete_partitions_before(app.id, cutoff.date_naive())
			.await
		{
			Ok(files) => files,
			Err(e) => {
				error!(app_id = %app.id, error = %e, "failed to delete expired crash payloads");
				0
			}
		};
		total_files += files;

		if rows > 0 || files > 0 {
			info!(
				app_id = %app.id,
				retention_days,
				rows_deleted = rows,
				files_deleted = files,
				"cleaned up expired crashes for app"
			);
		}
	}

	info!(
		duration_ms = started.elapsed().as_millis() as u64,
		total_rows_deleted = total_rows,
		total_files_deleted = total_files,
		"retention sweep completed"
	);
}
