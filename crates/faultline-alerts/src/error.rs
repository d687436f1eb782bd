// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for alert dispatch.

use thiserror::Error;

use crate::smtp::SmtpError;

/// Errors that can occur while dispatching an alert.
#[derive(Debug, Error)]
pub enum AlertError {
	/// A rule's config map is missing a field its sink requires.
	#[error("invalid sink config: {0}")]
	SinkConfig(String),

	#[error("webhook request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("webhook returned status {0}")]
	HttpStatus(u16),

	#[error("SMTP error: {0}")]
	Smtp(#[from] SmtpError),

	#[error("SMTP not configured")]
	SmtpNotConfigured,

	#[error("chat webhook URL not configured")]
	ChatNotConfigured,

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Result type for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;
