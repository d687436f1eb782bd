// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error taxonomy for the submission pipeline.

use thiserror::Error;

/// Errors surfaced to the caller of [`crate::Ingestor::submit`].
///
/// `Validation` maps to a 4xx-class response at the transport layer;
/// everything else is 5xx-class.
#[derive(Debug, Error)]
pub enum IngestError {
	/// The submission is missing a required field.
	#[error("validation failed: {0}")]
	Validation(String),

	/// The indexed store rejected the group upsert or crash insert.
	#[error("storage error: {0}")]
	Store(#[from] faultline_store::StoreError),
}

impl IngestError {
	/// Whether the caller is at fault (4xx) rather than the service (5xx).
	pub fn is_validation(&self) -> bool {
		matches!(self, Self::Validation(_))
	}
}

/// Result type for ingestion.
pub type Result<T> = std::result::Result<T, IngestError>;
