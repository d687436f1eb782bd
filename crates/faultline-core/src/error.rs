// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types shared across the core domain model.

use thiserror::Error;

/// Errors produced by the core types.
#[derive(Debug, Error)]
pub enum CoreError {
	#[error("invalid group status: {0}")]
	InvalidGroupStatus(String),

	#[error("invalid breadcrumb level: {0}")]
	InvalidBreadcrumbLevel(String),

	#[error("invalid channel kind: {0}")]
	InvalidChannelKind(String),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
