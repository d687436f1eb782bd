// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Aggregate statistics returned for a single application.

use serde::{Deserialize, Serialize};

use crate::ids::{AppId, GroupId};

/// Aggregate crash statistics for one application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppStats {
	pub app_id: AppId,
	pub total_crashes: i64,
	pub total_groups: i64,
	pub open_groups: i64,
	pub crashes_last_24h: i64,
	pub crashes_last_7d: i64,
	pub crashes_last_30d: i64,
	/// Top five groups by occurrence count.
	pub top_errors: Vec<ErrorSummary>,
	/// One point per day with at least one crash in the last 30 days.
	pub crash_trend: Vec<TrendPoint>,
}

/// A group summarized for the "top errors" listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorSummary {
	pub group_id: GroupId,
	pub error_type: String,
	pub error_message: String,
	pub count: i64,
}

/// Crash count for a single calendar day, formatted `YYYY-MM-DD`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPoint {
	pub date: String,
	pub count: i64,
}
