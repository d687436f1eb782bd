// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Storage trait for indexed crash data.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use faultline_core::{
	AlertRule, AlertRuleId, App, AppId, AppStats, Crash, CrashGroup, CrashId, GroupId, GroupStatus,
};

use crate::error::Result;

/// Page size applied when a filter does not request one.
pub const DEFAULT_PAGE_LIMIT: i64 = 50;

/// Storage trait for all indexed operations.
///
/// `get_or_create_group` is the one atomic primitive: concurrent submissions
/// with the same `(app, fingerprint)` serialize on the unique constraint and
/// exactly one caller observes `is_new = true`.
#[async_trait]
pub trait CrashStore: Send + Sync {
	// App operations
	async fn create_app(&self, app: &App) -> Result<()>;
	async fn get_app(&self, id: AppId) -> Result<Option<App>>;
	async fn get_app_by_key_hash(&self, api_key_hash: &str) -> Result<Option<App>>;
	/// Newest first.
	async fn list_apps(&self) -> Result<Vec<App>>;
	/// Only `name` and `retention_days` are mutable.
	async fn update_app(&self, app: &App) -> Result<()>;
	/// Cascades to crashes, groups, and alert rules in one transaction.
	async fn delete_app(&self, id: AppId) -> Result<bool>;

	// Crash operations
	async fn insert_crash(&self, crash: &Crash) -> Result<()>;
	async fn get_crash(&self, id: CrashId) -> Result<Option<Crash>>;
	/// Returns the page plus the total matched count.
	async fn list_crashes(&self, filter: &CrashFilter) -> Result<(Vec<Crash>, i64)>;
	async fn delete_crash(&self, id: CrashId) -> Result<bool>;
	/// Bulk delete for retention; returns the number of rows removed.
	async fn delete_crashes_before(&self, app_id: AppId, cutoff: DateTime<Utc>) -> Result<u64>;

	// Group operations
	async fn get_or_create_group(&self, crash: &Crash) -> Result<(CrashGroup, bool)>;
	async fn get_group(&self, id: GroupId) -> Result<Option<CrashGroup>>;
	async fn list_groups(&self, filter: &GroupFilter) -> Result<(Vec<CrashGroup>, i64)>;
	/// Updates the mutable fields: status, assignee, notes.
	async fn update_group(&self, group: &CrashGroup) -> Result<()>;
	async fn increment_group_count(&self, id: GroupId) -> Result<()>;

	// Alert rule operations
	async fn create_alert_rule(&self, rule: &AlertRule) -> Result<()>;
	async fn get_alert_rule(&self, id: AlertRuleId) -> Result<Option<AlertRule>>;
	/// `None` lists rules across every app.
	async fn list_alert_rules(&self, app_id: Option<AppId>) -> Result<Vec<AlertRule>>;
	async fn update_alert_rule(&self, rule: &AlertRule) -> Result<()>;
	async fn delete_alert_rule(&self, id: AlertRuleId) -> Result<bool>;

	// Settings
	async fn get_setting(&self, key: &str) -> Result<Option<String>>;
	async fn set_setting(&self, key: &str, value: &str) -> Result<()>;

	// Stats
	async fn app_stats(&self, app_id: AppId) -> Result<AppStats>;
}

/// Filters for listing crashes. Unset fields are wildcards; the date range
/// is inclusive on both ends.
#[derive(Debug, Clone, Default)]
pub struct CrashFilter {
	pub app_id: Option<AppId>,
	pub group_id: Option<GroupId>,
	pub platform: Option<String>,
	pub environment: Option<String>,
	pub error_type: Option<String>,
	pub user_id: Option<String>,
	pub from: Option<DateTime<Utc>>,
	pub to: Option<DateTime<Utc>>,
	/// Case-sensitive substring match over error type and message.
	pub search: Option<String>,
	pub offset: i64,
	/// 0 means [`DEFAULT_PAGE_LIMIT`].
	pub limit: i64,
}

/// Filters and ordering for listing crash groups.
#[derive(Debug, Clone, Default)]
pub struct GroupFilter {
	pub app_id: Option<AppId>,
	pub status: Option<GroupStatus>,
	pub error_type: Option<String>,
	pub search: Option<String>,
	pub offset: i64,
	pub limit: i64,
	pub sort_by: GroupSort,
	pub sort_order: SortOrder,
}

/// Sortable columns for group listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GroupSort {
	FirstSeen,
	#[default]
	LastSeen,
	OccurrenceCount,
}

impl GroupSort {
	/// The fixed set of columns keeps the interpolated ORDER BY safe.
	pub fn column(self) -> &'static str {
		match self {
			Self::FirstSeen => "first_seen",
			Self::LastSeen => "last_seen",
			Self::OccurrenceCount => "occurrence_count",
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
	Asc,
	#[default]
	Desc,
}

impl SortOrder {
	pub fn keyword(self) -> &'static str {
		match self {
			Self::Asc => "ASC",
			Self::Desc => "DESC",
		}
	}
}
