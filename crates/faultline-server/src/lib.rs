// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Service composition for Faultline.
//!
//! [`Service::start`] owns the boot order: open and migrate the indexed
//! store, open the blob root, start the alerter with the persisted rule
//! set, then start the retention sweeper. A failure in any of these refuses
//! to start the service rather than running degraded. [`Service::shutdown`]
//! reverses the order: stop the sweeper, close the alerter, close the pool.

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tracing::info;

use faultline_alerts::{Alerter, AlerterConfig, SmtpConfig};
use faultline_blobstore::BlobStore;
use faultline_config::Config;
use faultline_ingest::Ingestor;
use faultline_retention::RetentionSweeper;
use faultline_store::{create_pool, migrate, CrashStore, SqliteCrashStore};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
	#[error("store error: {0}")]
	Store(#[from] faultline_store::StoreError),

	#[error("blob store error: {0}")]
	Blob(#[from] faultline_blobstore::BlobStoreError),

	#[error("alerter error: {0}")]
	Alert(#[from] faultline_alerts::AlertError),
}

/// The assembled service. Owns every core component; collaborators such as
/// the transport layer borrow them through the public fields.
pub struct Service {
	pub store: Arc<SqliteCrashStore>,
	pub blobs: Arc<BlobStore>,
	pub alerter: Arc<Alerter>,
	pub ingestor: Ingestor,
	sweeper: RetentionSweeper,
	pool: SqlitePool,
}

impl Service {
	/// Boot the service. Any failure here is fatal by design.
	pub async fn start(config: &Config) -> Result<Self, ServiceError> {
		let pool = create_pool(&config.storage.index_path).await?;
		migrate(&pool).await?;
		let store = Arc::new(SqliteCrashStore::new(pool.clone()));

		let blobs = Arc::new(BlobStore::open(config.storage.blob_root.clone()).await?);

		let alerter = Arc::new(Alerter::new(AlerterConfig {
			queue_capacity: config.alerts.queue_capacity,
			webhook_timeout_secs: config.alerts.webhook_timeout_secs,
			smtp: config.alerts.smtp.as_ref().map(|s| SmtpConfig {
				host: s.host.clone(),
				port: s.port,
				username: s.username.clone(),
				password: s.password.clone(),
				from: s.from.clone(),
				use_tls: s.use_tls,
			}),
			chat_webhook_url: config.alerts.chat_webhook_url.clone(),
		})?);
		let rules = store.list_alert_rules(None).await?;
		alerter.set_rules(rules).await;

		let sweeper = RetentionSweeper::new(
			store.clone(),
			Arc::clone(&blobs),
			config.retention.default_days,
			Duration::from_secs(config.retention.cleanup_interval_secs),
		);
		sweeper.start().await;

		let ingestor = Ingestor::new(store.clone(), Arc::clone(&blobs), Arc::clone(&alerter));

		info!("faultline service started");
		Ok(Self {
			store,
			blobs,
			alerter,
			ingestor,
			sweeper,
			pool,
		})
	}

	pub fn sweeper(&self) -> &RetentionSweeper {
		&self.sweeper
	}

	/// Ordered shutdown: retention worker first, then the alerter, then the
	/// database pool.
	pub async fn shutdown(self) {
		self.sweeper.stop().await;
		self.alerter.close().await;
		self.pool.close().await;
		info!("faultline service stopped");
	}
}
