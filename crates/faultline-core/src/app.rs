// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Registered application entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::AppId;

/// A registered application that may submit crash reports.
///
/// The API key is disclosed exactly once, at creation; only its SHA-256 hex
/// digest is stored, and the digest is never serialized back to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
	pub id: AppId,
	pub name: String,
	#[serde(skip_serializing, default)]
	pub api_key_hash: String,
	pub created_at: DateTime<Utc>,
	/// Whole days; a non-positive value means "use the system default".
	pub retention_days: i64,
}

impl App {
	/// Effective retention window, substituting the system default when the
	/// per-app value is non-positive.
	pub fn effective_retention_days(&self, default_days: i64) -> i64 {
		if self.retention_days > 0 {
			self.retention_days
		} else {
			default_days
		}
	}
}
