// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The crash submission pipeline.
//!
//! [`Ingestor::submit`] orchestrates one submission end to end: validate,
//! materialize the crash record, fingerprint it, upsert its group, persist
//! the full payload to the blob store, index the row, and hand the event to
//! the alerter. Group upsert and row insert failures abort the request; a
//! blob write failure is recovered by indexing the crash with an empty blob
//! path; the alerter is never waited on.

pub mod api_key;
pub mod error;

pub use api_key::{generate_api_key, hash_api_key, verify_api_key, KEY_PREFIX};
pub use error::{IngestError, Result};

use std::sync::Arc;

use chrono::Utc;
use tracing::{instrument, warn};

use faultline_alerts::{Alerter, AlertEvent, AlertEventKind};
use faultline_blobstore::BlobStore;
use faultline_core::{
	compute_fingerprint, App, Crash, CrashId, CrashSubmission, GroupId, SubmissionReceipt,
	ENVIRONMENT_PRODUCTION,
};
use faultline_store::CrashStore;

/// Orchestrates crash submissions. Borrows its collaborators; the service
/// composition layer owns them.
pub struct Ingestor {
	store: Arc<dyn CrashStore>,
	blobs: Arc<BlobStore>,
	alerter: Arc<Alerter>,
}

impl Ingestor {
	pub fn new(store: Arc<dyn CrashStore>, blobs: Arc<BlobStore>, alerter: Arc<Alerter>) -> Self {
		Self {
			store,
			blobs,
			alerter,
		}
	}

	/// Ingest one crash submission for an authenticated app.
	#[instrument(skip(self, app, submission), fields(app_id = %app.id, error_type = %submission.error_type))]
	pub async fn submit(
		&self,
		app: &App,
		submission: CrashSubmission,
	) -> Result<SubmissionReceipt> {
		validate(&submission)?;

		let mut crash = materialize(app, submission);
		crash.fingerprint = compute_fingerprint(&crash.error_type, &crash.stack_trace);

		let (group, is_new_group) = self.store.get_or_create_group(&crash).await?;
		crash.group_id = group.id;

		// Blob storage is secondary: index the crash either way.
		match self.blobs.write(&crash).await {
			Ok(path) => crash.blob_path = path,
			Err(e) => {
				warn!(crash_id = %crash.id, error = %e, "failed to write crash payload");
			}
		}

		self.store.insert_crash(&crash).await?;

		let kind = if is_new_group {
			AlertEventKind::NewGroup
		} else {
			AlertEventKind::NewCrash
		};
		self.alerter.notify(AlertEvent {
			kind,
			app_id: app.id,
			crash: crash.clone(),
			group,
			is_new_group,
		});

		Ok(SubmissionReceipt {
			id: crash.id,
			group_id: crash.group_id,
			fingerprint: crash.fingerprint,
			is_new_group,
		})
	}
}

// A missing stack_trace field is rejected structurally when the envelope is
// deserialized; an empty trace is allowed for message-style events.
fn validate(submission: &CrashSubmission) -> Result<()> {
	for (field, value) in [
		("app_version", &submission.app_version),
		("platform", &submission.platform),
		("error_type", &submission.error_type),
		("error_message", &submission.error_message),
	] {
		if value.is_empty() {
			return Err(IngestError::Validation(format!("{field} is required")));
		}
	}
	Ok(())
}

fn materialize(app: &App, submission: CrashSubmission) -> Crash {
	let environment = if submission.environment.is_empty() {
		ENVIRONMENT_PRODUCTION.to_string()
	} else {
		submission.environment
	};

	Crash {
		id: CrashId::new(),
		app_id: app.id,
		app_version: submission.app_version,
		platform: submission.platform,
		os_version: submission.os_version,
		device_model: submission.device_model,
		error_type: submission.error_type,
		error_message: submission.error_message,
		stack_trace: submission.stack_trace,
		fingerprint: String::new(),
		// Pre-generated; replaced by the group's actual ID after the upsert.
		group_id: GroupId::new(),
		user_id: submission.user_id,
		environment,
		created_at: Utc::now(),
		blob_path: String::new(),
		metadata: submission.metadata,
		breadcrumbs: submission.breadcrumbs,
	}
}
