// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite implementation of the crash store.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tracing::instrument;

use faultline_core::{
	AlertRule, AlertRuleId, App, AppId, AppStats, Crash, CrashGroup, CrashId, ErrorSummary,
	GroupId, GroupStatus, TrendPoint,
};

use crate::error::{Result, StoreError};
use crate::store::{CrashFilter, CrashStore, GroupFilter, DEFAULT_PAGE_LIMIT};

const APP_COLUMNS: &str = "id, name, api_key_hash, created_at, retention_days";
const GROUP_COLUMNS: &str = "id, app_id, fingerprint, error_type, error_message, \
	first_seen, last_seen, occurrence_count, status, assigned_to, notes";
const CRASH_COLUMNS: &str = "id, app_id, app_version, platform, os_version, device_model, \
	error_type, error_message, fingerprint, group_id, user_id, environment, created_at, \
	blob_path, COALESCE(metadata, '{}') AS metadata";
const ALERT_COLUMNS: &str = "id, app_id, type, COALESCE(config, '{}') AS config, enabled, created_at";

/// SQLite-backed [`CrashStore`].
#[derive(Clone)]
pub struct SqliteCrashStore {
	pool: SqlitePool,
}

impl SqliteCrashStore {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

#[async_trait]
impl CrashStore for SqliteCrashStore {
	#[instrument(skip(self, app), fields(app_id = %app.id, name = %app.name))]
	async fn create_app(&self, app: &App) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO apps (id, name, api_key_hash, created_at, retention_days)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(app.id.to_string())
		.bind(&app.name)
		.bind(&app.api_key_hash)
		.bind(app.created_at.to_rfc3339())
		.bind(app.retention_days)
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[instrument(skip(self), fields(app_id = %id))]
	async fn get_app(&self, id: AppId) -> Result<Option<App>> {
		let row = sqlx::query_as::<_, AppRow>(&format!(
			"SELECT {APP_COLUMNS} FROM apps WHERE id = ?"
		))
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self, api_key_hash))]
	async fn get_app_by_key_hash(&self, api_key_hash: &str) -> Result<Option<App>> {
		let row = sqlx::query_as::<_, AppRow>(&format!(
			"SELECT {APP_COLUMNS} FROM apps WHERE api_key_hash = ?"
		))
		.bind(api_key_hash)
		.fetch_optional(&self.pool)
		.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self))]
	async fn list_apps(&self) -> Result<Vec<App>> {
		let rows = sqlx::query_as::<_, AppRow>(&format!(
			"SELECT {APP_COLUMNS} FROM apps ORDER BY created_at DESC"
		))
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(TryInto::try_into).collect()
	}

	#[instrument(skip(self, app), fields(app_id = %app.id))]
	async fn update_app(&self, app: &App) -> Result<()> {
		sqlx::query("UPDATE apps SET name = ?, retention_days = ? WHERE id = ?")
			.bind(&app.name)
			.bind(app.retention_days)
			.bind(app.id.to_string())
			.execute(&self.pool)
			.await?;

		Ok(())
	}

	#[instrument(skip(self), fields(app_id = %id))]
	async fn delete_app(&self, id: AppId) -> Result<bool> {
		let app_id = id.to_string();
		let mut tx = self.pool.begin().await?;

		sqlx::query("DELETE FROM alerts WHERE app_id = ?")
			.bind(&app_id)
			.execute(&mut *tx)
			.await?;
		sqlx::query("DELETE FROM crashes WHERE app_id = ?")
			.bind(&app_id)
			.execute(&mut *tx)
			.await?;
		sqlx::query("DELETE FROM crash_groups WHERE app_id = ?")
			.bind(&app_id)
			.execute(&mut *tx)
			.await?;
		let result = sqlx::query("DELETE FROM apps WHERE id = ?")
			.bind(&app_id)
			.execute(&mut *tx)
			.await?;

		tx.commit().await?;
		Ok(result.rows_affected() > 0)
	}

	#[instrument(skip(self, crash), fields(crash_id = %crash.id, fingerprint = %crash.fingerprint))]
	async fn insert_crash(&self, crash: &Crash) -> Result<()> {
		let metadata_json = serde_json::to_string(&crash.metadata)?;

		sqlx::query(
			r#"
			INSERT INTO crashes (
				id, app_id, app_version, platform, os_version, device_model,
				error_type, error_message, fingerprint, group_id, user_id,
				environment, created_at, blob_path, metadata
			)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(crash.id.to_string())
		.bind(crash.app_id.to_string())
		.bind(&crash.app_version)
		.bind(&crash.platform)
		.bind(&crash.os_version)
		.bind(&crash.device_model)
		.bind(&crash.error_type)
		.bind(&crash.error_message)
		.bind(&crash.fingerprint)
		.bind(crash.group_id.to_string())
		.bind(&crash.user_id)
		.bind(&crash.environment)
		.bind(crash.created_at.to_rfc3339())
		.bind(&crash.blob_path)
		.bind(metadata_json)
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[instrument(skip(self), fields(crash_id = %id))]
	async fn get_crash(&self, id: CrashId) -> Result<Option<Crash>> {
		let row = sqlx::query_as::<_, CrashRow>(&format!(
			"SELECT {CRASH_COLUMNS} FROM crashes WHERE id = ?"
		))
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self, filter))]
	async fn list_crashes(&self, filter: &CrashFilter) -> Result<(Vec<Crash>, i64)> {
		let mut conditions: Vec<&str> = Vec::new();
		let mut args: Vec<String> = Vec::new();

		if let Some(app_id) = filter.app_id {
			conditions.push("app_id = ?");
			args.push(app_id.to_string());
		}
		if let Some(group_id) = filter.group_id {
			conditions.push("group_id = ?");
			args.push(group_id.to_string());
		}
		if let Some(platform) = &filter.platform {
			conditions.push("platform = ?");
			args.push(platform.clone());
		}
		if let Some(environment) = &filter.environment {
			conditions.push("environment = ?");
			args.push(environment.clone());
		}
		if let Some(error_type) = &filter.error_type {
			conditions.push("error_type = ?");
			args.push(error_type.clone());
		}
		if let Some(user_id) = &filter.user_id {
			conditions.push("user_id = ?");
			args.push(user_id.clone());
		}
		if let Some(from) = filter.from {
			conditions.push("created_at >= ?");
			args.push(from.to_rfc3339());
		}
		if let Some(to) = filter.to {
			conditions.push("created_at <= ?");
			args.push(to.to_rfc3339());
		}
		if let Some(search) = &filter.search {
			// instr() keeps the match case-sensitive, unlike LIKE.
			conditions.push("(instr(error_type, ?) > 0 OR instr(error_message, ?) > 0)");
			args.push(search.clone());
			args.push(search.clone());
		}

		let where_clause = render_where(&conditions);

		let count_sql = format!("SELECT COUNT(*) FROM crashes {where_clause}");
		let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
		for arg in &args {
			count_query = count_query.bind(arg);
		}
		let total = count_query.fetch_one(&self.pool).await?;

		let limit = if filter.limit > 0 {
			filter.limit
		} else {
			DEFAULT_PAGE_LIMIT
		};
		let page_sql = format!(
			"SELECT {CRASH_COLUMNS} FROM crashes {where_clause} \
			 ORDER BY created_at DESC LIMIT ? OFFSET ?"
		);
		let mut page_query = sqlx::query_as::<_, CrashRow>(&page_sql);
		for arg in &args {
			page_query = page_query.bind(arg);
		}
		let rows = page_query
			.bind(limit)
			.bind(filter.offset)
			.fetch_all(&self.pool)
			.await?;

		let crashes = rows
			.into_iter()
			.map(TryInto::try_into)
			.collect::<Result<Vec<_>>>()?;
		Ok((crashes, total))
	}

	#[instrument(skip(self), fields(crash_id = %id))]
	async fn delete_crash(&self, id: CrashId) -> Result<bool> {
		let result = sqlx::query("DELETE FROM crashes WHERE id = ?")
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}

	#[instrument(skip(self), fields(app_id = %app_id, cutoff = %cutoff))]
	async fn delete_crashes_before(&self, app_id: AppId, cutoff: DateTime<Utc>) -> Result<u64> {
		let result = sqlx::query("DELETE FROM crashes WHERE app_id = ? AND created_at < ?")
			.bind(app_id.to_string())
			.bind(cutoff.to_rfc3339())
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected())
	}

	#[instrument(skip(self, crash), fields(app_id = %crash.app_id, fingerprint = %crash.fingerprint))]
	async fn get_or_create_group(&self, crash: &Crash) -> Result<(CrashGroup, bool)> {
		loop {
			let mut tx = self.pool.begin().await?;

			let existing = sqlx::query_as::<_, GroupRow>(&format!(
				"SELECT {GROUP_COLUMNS} FROM crash_groups WHERE app_id = ? AND fingerprint = ?"
			))
			.bind(crash.app_id.to_string())
			.bind(&crash.fingerprint)
			.fetch_optional(&mut *tx)
			.await?;

			if let Some(row) = existing {
				sqlx::query(
					r#"
					UPDATE crash_groups
					SET last_seen = MAX(last_seen, ?), occurrence_count = occurrence_count + 1
					WHERE id = ?
					"#,
				)
				.bind(crash.created_at.to_rfc3339())
				.bind(&row.id)
				.execute(&mut *tx)
				.await?;
				tx.commit().await?;

				let mut group: CrashGroup = row.try_into()?;
				group.last_seen = group.last_seen.max(crash.created_at);
				group.occurrence_count += 1;
				return Ok((group, false));
			}

			let group = CrashGroup {
				id: crash.group_id,
				app_id: crash.app_id,
				fingerprint: crash.fingerprint.clone(),
				error_type: crash.error_type.clone(),
				error_message: crash.error_message.clone(),
				first_seen: crash.created_at,
				last_seen: crash.created_at,
				occurrence_count: 1,
				status: GroupStatus::Open,
				assigned_to: None,
				notes: None,
			};

			let inserted = sqlx::query(
				r#"
				INSERT INTO crash_groups (
					id, app_id, fingerprint, error_type, error_message,
					first_seen, last_seen, occurrence_count, status
				)
				VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
				"#,
			)
			.bind(group.id.to_string())
			.bind(group.app_id.to_string())
			.bind(&group.fingerprint)
			.bind(&group.error_type)
			.bind(&group.error_message)
			.bind(group.first_seen.to_rfc3339())
			.bind(group.last_seen.to_rfc3339())
			.bind(group.occurrence_count)
			.bind(group.status.to_string())
			.execute(&mut *tx)
			.await;

			match inserted {
				Ok(_) => {
					tx.commit().await?;
					return Ok((group, true));
				}
				// A concurrent submission created the group between our
				// select and insert; re-read it on the next pass.
				Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
					drop(tx);
					continue;
				}
				Err(e) => return Err(e.into()),
			}
		}
	}

	#[instrument(skip(self), fields(group_id = %id))]
	async fn get_group(&self, id: GroupId) -> Result<Option<CrashGroup>> {
		let row = sqlx::query_as::<_, GroupRow>(&format!(
			"SELECT {GROUP_COLUMNS} FROM crash_groups WHERE id = ?"
		))
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self, filter))]
	async fn list_groups(&self, filter: &GroupFilter) -> Result<(Vec<CrashGroup>, i64)> {
		let mut conditions: Vec<&str> = Vec::new();
		let mut args: Vec<String> = Vec::new();

		if let Some(app_id) = filter.app_id {
			conditions.push("app_id = ?");
			args.push(app_id.to_string());
		}
		if let Some(status) = filter.status {
			conditions.push("status = ?");
			args.push(status.to_string());
		}
		if let Some(error_type) = &filter.error_type {
			conditions.push("error_type = ?");
			args.push(error_type.clone());
		}
		if let Some(search) = &filter.search {
			conditions.push("(instr(error_type, ?) > 0 OR instr(error_message, ?) > 0)");
			args.push(search.clone());
			args.push(search.clone());
		}

		let where_clause = render_where(&conditions);

		let count_sql = format!("SELECT COUNT(*) FROM crash_groups {where_clause}");
		let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
		for arg in &args {
			count_query = count_query.bind(arg);
		}
		let total = count_query.fetch_one(&self.pool).await?;

		let limit = if filter.limit > 0 {
			filter.limit
		} else {
			DEFAULT_PAGE_LIMIT
		};
		let page_sql = format!(
			"SELECT {GROUP_COLUMNS} FROM crash_groups {where_clause} \
			 ORDER BY {} {} LIMIT ? OFFSET ?",
			filter.sort_by.column(),
			filter.sort_order.keyword(),
		);
		let mut page_query = sqlx::query_as::<_, GroupRow>(&page_sql);
		for arg in &args {
			page_query = page_query.bind(arg);
		}
		let rows = page_query
			.bind(limit)
			.bind(filter.offset)
			.fetch_all(&self.pool)
			.await?;

		let groups = rows
			.into_iter()
			.map(TryInto::try_into)
			.collect::<Result<Vec<_>>>()?;
		Ok((groups, total))
	}

	#[instrument(skip(self, group), fields(group_id = %group.id))]
	async fn update_group(&self, group: &CrashGroup) -> Result<()> {
		sqlx::query("UPDATE crash_groups SET status = ?, assigned_to = ?, notes = ? WHERE id = ?")
			.bind(group.status.to_string())
			.bind(&group.assigned_to)
			.bind(&group.notes)
			.bind(group.id.to_string())
			.execute(&self.pool)
			.await?;

		Ok(())
	}

	#[instrument(skip(self), fields(group_id = %id))]
	async fn increment_group_count(&self, id: GroupId) -> Result<()> {
		sqlx::query(
			r#"
			UPDATE crash_groups
			SET occurrence_count = occurrence_count + 1, last_seen = MAX(last_seen, ?)
			WHERE id = ?
			"#,
		)
		.bind(Utc::now().to_rfc3339())
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[instrument(skip(self, rule), fields(rule_id = %rule.id, channel = %rule.channel))]
	async fn create_alert_rule(&self, rule: &AlertRule) -> Result<()> {
		let config_json = serde_json::to_string(&rule.config)?;

		sqlx::query(
			r#"
			INSERT INTO alerts (id, app_id, type, config, enabled, created_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(rule.id.to_string())
		.bind(rule.app_id.map(|a| a.to_string()).unwrap_or_default())
		.bind(rule.channel.to_string())
		.bind(config_json)
		.bind(rule.enabled as i64)
		.bind(rule.created_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[instrument(skip(self), fields(rule_id = %id))]
	async fn get_alert_rule(&self, id: AlertRuleId) -> Result<Option<AlertRule>> {
		let row = sqlx::query_as::<_, AlertRow>(&format!(
			"SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?"
		))
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self))]
	async fn list_alert_rules(&self, app_id: Option<AppId>) -> Result<Vec<AlertRule>> {
		let rows = match app_id {
			Some(app_id) => {
				sqlx::query_as::<_, AlertRow>(&format!(
					"SELECT {ALERT_COLUMNS} FROM alerts WHERE app_id = ? ORDER BY created_at DESC"
				))
				.bind(app_id.to_string())
				.fetch_all(&self.pool)
				.await?
			}
			None => {
				sqlx::query_as::<_, AlertRow>(&format!(
					"SELECT {ALERT_COLUMNS} FROM alerts ORDER BY created_at DESC"
				))
				.fetch_all(&self.pool)
				.await?
			}
		};

		rows.into_iter().map(TryInto::try_into).collect()
	}

	#[instrument(skip(self, rule), fields(rule_id = %rule.id))]
	async fn update_alert_rule(&self, rule: &AlertRule) -> Result<()> {
		let config_json = serde_json::to_string(&rule.config)?;

		sqlx::query("UPDATE alerts SET type = ?, config = ?, enabled = ? WHERE id = ?")
			.bind(rule.channel.to_string())
			.bind(config_json)
			.bind(rule.enabled as i64)
			.bind(rule.id.to_string())
			.execute(&self.pool)
			.await?;

		Ok(())
	}

	#[instrument(skip(self), fields(rule_id = %id))]
	async fn delete_alert_rule(&self, id: AlertRuleId) -> Result<bool> {
		let result = sqlx::query("DELETE FROM alerts WHERE id = ?")
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}

	#[instrument(skip(self, key, value))]
	async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO settings (key, value) VALUES (?, ?)
			ON CONFLICT(key) DO UPDATE SET value = excluded.value
			"#,
		)
		.bind(key)
		.bind(value)
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[instrument(skip(self, key))]
	async fn get_setting(&self, key: &str) -> Result<Option<String>> {
		let value = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?")
			.bind(key)
			.fetch_optional(&self.pool)
			.await?;

		Ok(value)
	}

	#[instrument(skip(self), fields(app_id = %app_id))]
	async fn app_stats(&self, app_id: AppId) -> Result<AppStats> {
		let app = app_id.to_string();
		let now = Utc::now();

		let total_crashes =
			sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM crashes WHERE app_id = ?")
				.bind(&app)
				.fetch_one(&self.pool)
				.await?;

		let total_groups =
			sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM crash_groups WHERE app_id = ?")
				.bind(&app)
				.fetch_one(&self.pool)
				.await?;

		let open_groups = sqlx::query_scalar::<_, i64>(
			"SELECT COUNT(*) FROM crash_groups WHERE app_id = ? AND status = 'open'",
		)
		.bind(&app)
		.fetch_one(&self.pool)
		.await?;

		let mut window_counts = [0i64; 3];
		for (slot, window) in window_counts.iter_mut().zip([
			Duration::hours(24),
			Duration::days(7),
			Duration::days(30),
		]) {
			*slot = sqlx::query_scalar::<_, i64>(
				"SELECT COUNT(*) FROM crashes WHERE app_id = ? AND created_at >= ?",
			)
			.bind(&app)
			.bind((now - window).to_rfc3339())
			.fetch_one(&self.pool)
			.await?;
		}

		let top_rows = sqlx::query_as::<_, (String, String, String, i64)>(
			r#"
			SELECT id, error_type, error_message, occurrence_count FROM crash_groups
			WHERE app_id = ? ORDER BY occurrence_count DESC, last_seen DESC LIMIT 5
			"#,
		)
		.bind(&app)
		.fetch_all(&self.pool)
		.await?;

		let top_errors = top_rows
			.into_iter()
			.map(|(id, error_type, error_message, count)| {
				Ok(ErrorSummary {
					group_id: id.parse().map(GroupId)?,
					error_type,
					error_message,
					count,
				})
			})
			.collect::<Result<Vec<_>>>()?;

		let trend_rows = sqlx::query_as::<_, (String, i64)>(
			r#"
			SELECT DATE(created_at) AS date, COUNT(*) AS count FROM crashes
			WHERE app_id = ? AND created_at >= ? GROUP BY DATE(created_at) ORDER BY date
			"#,
		)
		.bind(&app)
		.bind((now - Duration::days(30)).to_rfc3339())
		.fetch_all(&self.pool)
		.await?;

		let crash_trend = trend_rows
			.into_iter()
			.map(|(date, count)| TrendPoint { date, count })
			.collect();

		Ok(AppStats {
			app_id,
			total_crashes,
			total_groups,
			open_groups,
			crashes_last_24h: window_counts[0],
			crashes_last_7d: window_counts[1],
			crashes_last_30d: window_counts[2],
			top_errors,
			crash_trend,
		})
	}
}

fn render_where(conditions: &[&str]) -> String {
	if conditions.is_empty() {
		String::new()
	} else {
		format!("WHERE {}", conditions.join(" AND "))
	}
}

// ============================================================================
// Row types for SQLite
// ============================================================================

#[derive(Debug, sqlx::FromRow)]
struct AppRow {
	id: String,
	name: String,
	api_key_hash: String,
	created_at: String,
	retention_days: i64,
}

impl TryFrom<AppRow> for App {
	type Error = StoreError;

	fn try_from(row: AppRow) -> Result<Self> {
		Ok(App {
			id: row.id.parse()?,
			name: row.name,
			api_key_hash: row.api_key_hash,
			created_at: parse_datetime(&row.created_at)?,
			retention_days: row.retention_days,
		})
	}
}

#[derive(Debug, sqlx::FromRow)]
struct GroupRow {
	id: String,
	app_id: String,
	fingerprint: String,
	error_type: String,
	error_message: String,
	first_seen: String,
	last_seen: String,
	occurrence_count: i64,
	status: String,
	assigned_to: Option<String>,
	notes: Option<String>,
}

impl TryFrom<GroupRow> for CrashGroup {
	type Error = StoreError;

	fn try_from(row: GroupRow) -> Result<Self> {
		Ok(CrashGroup {
			id: row.id.parse()?,
			app_id: row.app_id.parse()?,
			fingerprint: row.fingerprint,
			error_type: row.error_type,
			error_message: row.error_message,
			first_seen: parse_datetime(&row.first_seen)?,
			last_seen: parse_datetime(&row.last_seen)?,
			occurrence_count: row.occurrence_count,
			status: row
				.status
				.parse()
				.map_err(|_| StoreError::Parse(format!("invalid status: {}", row.status)))?,
			assigned_to: row.assigned_to,
			notes: row.notes,
		})
	}
}

#[derive(Debug, sqlx::FromRow)]
struct CrashRow {
	id: String,
	app_id: String,
	app_version: String,
	platform: String,
	os_version: String,
	device_model: String,
	error_type: String,
	error_message: String,
	fingerprint: String,
	group_id: String,
	user_id: String,
	environment: String,
	created_at: String,
	blob_path: String,
	metadata: String,
}

impl TryFrom<CrashRow> for Crash {
	type Error = StoreError;

	fn try_from(row: CrashRow) -> Result<Self> {
		Ok(Crash {
			id: row.id.parse()?,
			app_id: row.app_id.parse()?,
			app_version: row.app_version,
			platform: row.platform,
			os_version: row.os_version,
			device_model: row.device_model,
			error_type: row.error_type,
			error_message: row.error_message,
			// The full stack trace and breadcrumbs live in the blob store.
			stack_trace: Vec::new(),
			fingerprint: row.fingerprint,
			group_id: row.group_id.parse()?,
			user_id: row.user_id,
			environment: row.environment,
			created_at: parse_datetime(&row.created_at)?,
			blob_path: row.blob_path,
			metadata: serde_json::from_str(&row.metadata)?,
			breadcrumbs: Vec::new(),
		})
	}
}

#[derive(Debug, sqlx::FromRow)]
struct AlertRow {
	id: String,
	app_id: String,
	#[sqlx(rename = "type")]
	channel: String,
	config: String,
	enabled: i64,
	created_at: String,
}

impl TryFrom<AlertRow> for AlertRule {
	type Error = StoreError;

	fn try_from(row: AlertRow) -> Result<Self> {
		let app_id = if row.app_id.is_empty() {
			None
		} else {
			Some(row.app_id.parse()?)
		};

		Ok(AlertRule {
			id: row.id.parse()?,
			app_id,
			channel: row
				.channel
				.parse()
				.map_err(|_| StoreError::Parse(format!("invalid channel: {}", row.channel)))?,
			config: serde_json::from_str(&row.config)?,
			enabled: row.enabled != 0,
			created_at: parse_datetime(&row.created_at)?,
		})
	}
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(s)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|_| StoreError::InvalidDateTime(s.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::{GroupSort, SortOrder};
	use crate::testing::create_test_pool;

	async fn setup() -> SqliteCrashStore {
		SqliteCrashStore::new(create_test_pool().await)
	}

	fn make_app(name: &str) -> App {
		App {
			id: AppId::new(),
			name: name.to_string(),
			api_key_hash: format!("hash-{}", AppId::new()),
			created_at: Utc::now(),
			retention_days: 30,
		}
	}

	fn make_crash(app_id: AppId, error_type: &str, fingerprint: &str) -> Crash {
		Crash {
			id: CrashId::new(),
			app_id,
			app_version: "1.0.0".to_string(),
			platform: "flutter".to_string(),
			os_version: "14.1".to_string(),
			device_model: "Pixel 8".to_string(),
			error_type: error_type.to_string(),
			error_message: format!("{error_type} thrown"),
			stack_trace: Vec::new(),
			fingerprint: fingerprint.to_string(),
			group_id: GroupId::new(),
			user_id: String::new(),
			environment: "production".to_string(),
			created_at: Utc::now(),
			blob_path: String::new(),
			metadata: serde_json::Map::new(),
			breadcrumbs: Vec::new(),
		}
	}

	mod apps {
		use super::*;

		#[tokio::test]
		async fn create_and_get_roundtrip() {
			let store = setup().await;
			let app = make_app("storefront");
			store.create_app(&app).await.unwrap();

			let fetched = store.get_app(app.id).await.unwrap().unwrap();
			assert_eq!(fetched.name, "storefront");
			assert_eq!(fetched.api_key_hash, app.api_key_hash);
			assert_eq!(fetched.retention_days, 30);

			let by_hash = store
				.get_app_by_key_hash(&app.api_key_hash)
				.await
				.unwrap()
				.unwrap();
			assert_eq!(by_hash.id, app.id);
		}

		#[tokio::test]
		async fn get_missing_app_returns_none() {
			let store = setup().await;
			assert!(store.get_app(AppId::new()).await.unwrap().is_none());
		}

		#[tokio::test]
		async fn list_is_newest_first() {
			let store = setup().await;
			let mut older = make_app("older");
			older.created_at = Utc::now() - Duration::hours(1);
			let newer = make_app("newer");
			store.create_app(&older).await.unwrap();
			store.create_app(&newer).await.unwrap();

			let apps = store.list_apps().await.unwrap();
			assert_eq!(apps[0].name, "newer");
			assert_eq!(apps[1].name, "older");
		}

		#[tokio::test]
		async fn update_changes_name_and_retention_only() {
			let store = setup().await;
			let mut app = make_app("storefront");
			store.create_app(&app).await.unwrap();

			app.name = "storefront-eu".to_string();
			app.retention_days = 7;
			store.update_app(&app).await.unwrap();

			let fetched = store.get_app(app.id).await.unwrap().unwrap();
			assert_eq!(fetched.name, "storefront-eu");
			assert_eq!(fetched.retention_days, 7);
		}

		#[tokio::test]
		async fn delete_cascades_to_children() {
			let store = setup().await;
			let app = make_app("storefront");
			store.create_app(&app).await.unwrap();

			let crash = make_crash(app.id, "E", "fp-cascade");
			let (group, _) = store.get_or_create_group(&crash).await.unwrap();
			store.insert_crash(&crash).await.unwrap();
			let rule = AlertRule {
				id: AlertRuleId::new(),
				app_id: Some(app.id),
				channel: faultline_core::ChannelKind::Webhook,
				config: serde_json::Map::new(),
				enabled: true,
				created_at: Utc::now(),
			};
			store.create_alert_rule(&rule).await.unwrap();

			assert!(store.delete_app(app.id).await.unwrap());
			assert!(store.get_app(app.id).await.unwrap().is_none());
			assert!(store.get_crash(crash.id).await.unwrap().is_none());
			assert!(store.get_group(group.id).await.unwrap().is_none());
			assert!(store.get_alert_rule(rule.id).await.unwrap().is_none());
		}
	}

	mod groups {
		use super::*;

		#[tokio::test]
		async fn first_submission_creates_group() {
			let store = setup().await;
			let app = make_app("storefront");
			store.create_app(&app).await.unwrap();

			let crash = make_crash(app.id, "FormatException", "fp-1");
			let (group, is_new) = store.get_or_create_group(&crash).await.unwrap();

			assert!(is_new);
			assert_eq!(group.id, crash.group_id);
			assert_eq!(group.occurrence_count, 1);
			assert_eq!(group.status, GroupStatus::Open);
			assert_eq!(group.first_seen, group.last_seen);
		}

		#[tokio::test]
		async fn second_submission_updates_group() {
			let store = setup().await;
			let app = make_app("storefront");
			store.create_app(&app).await.unwrap();

			let first = make_crash(app.id, "FormatException", "fp-1");
			let (group1, is_new1) = store.get_or_create_group(&first).await.unwrap();

			let mut second = make_crash(app.id, "FormatException", "fp-1");
			second.error_message = "a different message".to_string();
			let (group2, is_new2) = store.get_or_create_group(&second).await.unwrap();

			assert!(is_new1);
			assert!(!is_new2);
			assert_eq!(group1.id, group2.id);
			assert_eq!(group2.occurrence_count, 2);
			// Representative message stays from the first crash.
			assert_eq!(group2.error_message, first.error_message);
			assert!(group2.first_seen <= group2.last_seen);
		}

		#[tokio::test]
		async fn out_of_order_arrival_never_moves_last_seen_backwards() {
			let store = setup().await;
			let app = make_app("storefront");
			store.create_app(&app).await.unwrap();

			let recent = make_crash(app.id, "E", "fp-1");
			store.get_or_create_group(&recent).await.unwrap();

			let mut stale = make_crash(app.id, "E", "fp-1");
			stale.created_at = recent.created_at - Duration::hours(2);
			let (group, is_new) = store.get_or_create_group(&stale).await.unwrap();

			assert!(!is_new);
			assert_eq!(group.occurrence_count, 2);
			assert_eq!(group.last_seen, recent.created_at);
		}

		#[tokio::test]
		async fn concurrent_submissions_create_exactly_one_group() {
			let store = setup().await;
			let app = make_app("storefront");
			store.create_app(&app).await.unwrap();

			let mut handles = Vec::new();
			for _ in 0..10 {
				let store = store.clone();
				let crash = make_crash(app.id, "E", "fp-race");
				handles.push(tokio::spawn(async move {
					store.get_or_create_group(&crash).await.unwrap()
				}));
			}

			let mut new_count = 0;
			let mut group_ids = Vec::new();
			for handle in handles {
				let (group, is_new) = handle.await.unwrap();
				if is_new {
					new_count += 1;
				}
				group_ids.push(group.id);
			}

			assert_eq!(new_count, 1);
			assert!(group_ids.iter().all(|id| *id == group_ids[0]));

			let group = store.get_group(group_ids[0]).await.unwrap().unwrap();
			assert_eq!(group.occurrence_count, 10);
		}

		#[tokio::test]
		async fn same_fingerprint_different_apps_get_distinct_groups() {
			let store = setup().await;
			let app1 = make_app("one");
			let app2 = make_app("two");
			store.create_app(&app1).await.unwrap();
			store.create_app(&app2).await.unwrap();

			let (g1, new1) = store
				.get_or_create_group(&make_crash(app1.id, "E", "fp-shared"))
				.await
				.unwrap();
			let (g2, new2) = store
				.get_or_create_group(&make_crash(app2.id, "E", "fp-shared"))
				.await
				.unwrap();

			assert!(new1 && new2);
			assert_ne!(g1.id, g2.id);
		}

		#[tokio::test]
		async fn list_filters_and_sorts() {
			let store = setup().await;
			let app = make_app("storefront");
			store.create_app(&app).await.unwrap();

			for (error_type, fp, count) in
				[("TypeError", "fp-a", 3), ("FormatException", "fp-b", 1)]
			{
				for _ in 0..count {
					store
						.get_or_create_group(&make_crash(app.id, error_type, fp))
						.await
						.unwrap();
				}
			}

			let (all, total) = store
				.list_groups(&GroupFilter {
					app_id: Some(app.id),
					sort_by: GroupSort::OccurrenceCount,
					sort_order: SortOrder::Desc,
					..Default::default()
				})
				.await
				.unwrap();
			assert_eq!(total, 2);
			assert_eq!(all[0].error_type, "TypeError");
			assert_eq!(all[0].occurrence_count, 3);

			let (found, total) = store
				.list_groups(&GroupFilter {
					app_id: Some(app.id),
					search: Some("Format".to_string()),
					..Default::default()
				})
				.await
				.unwrap();
			assert_eq!(total, 1);
			assert_eq!(found[0].error_type, "FormatException");

			let (by_status, _) = store
				.list_groups(&GroupFilter {
					app_id: Some(app.id),
					status: Some(GroupStatus::Resolved),
					..Default::default()
				})
				.await
				.unwrap();
			assert!(by_status.is_empty());
		}

		#[tokio::test]
		async fn update_changes_triage_fields() {
			let store = setup().await;
			let app = make_app("storefront");
			store.create_app(&app).await.unwrap();

			let (mut group, _) = store
				.get_or_create_group(&make_crash(app.id, "E", "fp-1"))
				.await
				.unwrap();

			group.status = GroupStatus::Resolved;
			group.assigned_to = Some("dev@example.com".to_string());
			group.notes = Some("fixed in 1.0.1".to_string());
			store.update_group(&group).await.unwrap();

			let fetched = store.get_group(group.id).await.unwrap().unwrap();
			assert_eq!(fetched.status, GroupStatus::Resolved);
			assert_eq!(fetched.assigned_to.as_deref(), Some("dev@example.com"));
			assert_eq!(fetched.notes.as_deref(), Some("fixed in 1.0.1"));
		}

		#[tokio::test]
		async fn increment_bumps_count_and_last_seen() {
			let store = setup().await;
			let app = make_app("storefront");
			store.create_app(&app).await.unwrap();

			let mut crash = make_crash(app.id, "E", "fp-1");
			crash.created_at = Utc::now() - Duration::hours(1);
			let (group, _) = store.get_or_create_group(&crash).await.unwrap();

			store.increment_group_count(group.id).await.unwrap();

			let fetched = store.get_group(group.id).await.unwrap().unwrap();
			assert_eq!(fetched.occurrence_count, 2);
			assert!(fetched.last_seen > fetched.first_seen);
		}
	}

	mod crashes {
		use super::*;

		#[tokio::test]
		async fn insert_and_get_roundtrip() {
			let store = setup().await;
			let app = make_app("storefront");
			store.create_app(&app).await.unwrap();

			let mut crash = make_crash(app.id, "E", "fp-1");
			crash.blob_path = format!("{}/2025-06-01/{}.json", app.id, crash.id);
			crash
				.metadata
				.insert("build".to_string(), serde_json::json!("nightly"));
			store.get_or_create_group(&crash).await.unwrap();
			store.insert_crash(&crash).await.unwrap();

			let fetched = store.get_crash(crash.id).await.unwrap().unwrap();
			assert_eq!(fetched.fingerprint, "fp-1");
			assert_eq!(fetched.blob_path, crash.blob_path);
			assert_eq!(fetched.metadata["build"], "nightly");
		}

		#[tokio::test]
		async fn list_applies_filters() {
			let store = setup().await;
			let app = make_app("storefront");
			store.create_app(&app).await.unwrap();

			let mut ios = make_crash(app.id, "TypeError", "fp-a");
			ios.platform = "ios".to_string();
			ios.environment = "staging".to_string();
			let android = make_crash(app.id, "FormatException", "fp-b");
			for crash in [&ios, &android] {
				store.get_or_create_group(crash).await.unwrap();
				store.insert_crash(crash).await.unwrap();
			}

			let (found, total) = store
				.list_crashes(&CrashFilter {
					app_id: Some(app.id),
					platform: Some("ios".to_string()),
					..Default::default()
				})
				.await
				.unwrap();
			assert_eq!(total, 1);
			assert_eq!(found[0].id, ios.id);

			let (found, _) = store
				.list_crashes(&CrashFilter {
					app_id: Some(app.id),
					environment: Some("staging".to_string()),
					..Default::default()
				})
				.await
				.unwrap();
			assert_eq!(found[0].id, ios.id);

			let (found, _) = store
				.list_crashes(&CrashFilter {
					group_id: Some(android.group_id),
					..Default::default()
				})
				.await
				.unwrap();
			assert_eq!(found[0].id, android.id);
		}

		#[tokio::test]
		async fn search_is_case_sensitive() {
			let store = setup().await;
			let app = make_app("storefront");
			store.create_app(&app).await.unwrap();

			let crash = make_crash(app.id, "FormatException", "fp-1");
			store.get_or_create_group(&crash).await.unwrap();
			store.insert_crash(&crash).await.unwrap();

			let (_, hits) = store
				.list_crashes(&CrashFilter {
					search: Some("Format".to_string()),
					..Default::default()
				})
				.await
				.unwrap();
			assert_eq!(hits, 1);

			let (_, misses) = store
				.list_crashes(&CrashFilter {
					search: Some("format".to_string()),
					..Default::default()
				})
				.await
				.unwrap();
			assert_eq!(misses, 0);
		}

		#[tokio::test]
		async fn date_range_is_inclusive() {
			let store = setup().await;
			let app = make_app("storefront");
			store.create_app(&app).await.unwrap();

			let crash = make_crash(app.id, "E", "fp-1");
			store.get_or_create_group(&crash).await.unwrap();
			store.insert_crash(&crash).await.unwrap();

			let (_, total) = store
				.list_crashes(&CrashFilter {
					from: Some(crash.created_at),
					to: Some(crash.created_at),
					..Default::default()
				})
				.await
				.unwrap();
			assert_eq!(total, 1);
		}

		#[tokio::test]
		async fn pagination_returns_total_alongside_page() {
			let store = setup().await;
			let app = make_app("storefront");
			store.create_app(&app).await.unwrap();

			for i in 0..5 {
				let mut crash = make_crash(app.id, "E", "fp-1");
				crash.created_at = Utc::now() - Duration::minutes(i);
				store.get_or_create_group(&crash).await.unwrap();
				store.insert_crash(&crash).await.unwrap();
			}

			let (page, total) = store
				.list_crashes(&CrashFilter {
					app_id: Some(app.id),
					limit: 2,
					offset: 2,
					..Default::default()
				})
				.await
				.unwrap();
			assert_eq!(total, 5);
			assert_eq!(page.len(), 2);
			// Newest first.
			assert!(page[0].created_at > page[1].created_at);
		}

		#[tokio::test]
		async fn bulk_delete_removes_only_expired_rows() {
			let store = setup().await;
			let app = make_app("storefront");
			store.create_app(&app).await.unwrap();

			let mut old = make_crash(app.id, "E", "fp-1");
			old.created_at = Utc::now() - Duration::days(40);
			let (group, _) = store.get_or_create_group(&old).await.unwrap();
			store.insert_crash(&old).await.unwrap();

			let mut recent = make_crash(app.id, "E", "fp-1");
			recent.group_id = group.id;
			store.get_or_create_group(&recent).await.unwrap();
			store.insert_crash(&recent).await.unwrap();

			let cutoff = Utc::now() - Duration::days(30);
			let deleted = store.delete_crashes_before(app.id, cutoff).await.unwrap();

			assert_eq!(deleted, 1);
			assert!(store.get_crash(old.id).await.unwrap().is_none());
			assert!(store.get_crash(recent.id).await.unwrap().is_some());
			// Groups survive retention with their lifetime counts untouched.
			let survivor = store.get_group(group.id).await.unwrap().unwrap();
			assert_eq!(survivor.occurrence_count, 2);
		}
	}

	mod alert_rules {
		use super::*;
		use faultline_core::ChannelKind;

		fn make_rule(app_id: Option<AppId>, channel: ChannelKind) -> AlertRule {
			AlertRule {
				id: AlertRuleId::new(),
				app_id,
				channel,
				config: serde_json::json!({"url": "https://hooks.example.com/x"})
					.as_object()
					.cloned()
					.unwrap(),
				enabled: true,
				created_at: Utc::now(),
			}
		}

		#[tokio::test]
		async fn crud_roundtrip() {
			let store = setup().await;
			let app = make_app("storefront");
			store.create_app(&app).await.unwrap();

			let global = make_rule(None, ChannelKind::Chat);
			let scoped = make_rule(Some(app.id), ChannelKind::Webhook);
			store.create_alert_rule(&global).await.unwrap();
			store.create_alert_rule(&scoped).await.unwrap();

			let all = store.list_alert_rules(None).await.unwrap();
			assert_eq!(all.len(), 2);

			let for_app = store.list_alert_rules(Some(app.id)).await.unwrap();
			assert_eq!(for_app.len(), 1);
			assert_eq!(for_app[0].id, scoped.id);

			let fetched = store.get_alert_rule(global.id).await.unwrap().unwrap();
			assert!(fetched.app_id.is_none());
			assert_eq!(fetched.config["url"], "https://hooks.example.com/x");

			let mut updated = scoped.clone();
			updated.enabled = false;
			store.update_alert_rule(&updated).await.unwrap();
			let fetched = store.get_alert_rule(scoped.id).await.unwrap().unwrap();
			assert!(!fetched.enabled);

			assert!(store.delete_alert_rule(global.id).await.unwrap());
			assert!(store.get_alert_rule(global.id).await.unwrap().is_none());
		}
	}

	mod settings {
		use super::*;

		#[tokio::test]
		async fn set_get_and_overwrite() {
			let store = setup().await;
			assert!(store.get_setting("dashboard_password").await.unwrap().is_none());

			store.set_setting("dashboard_password", "abc").await.unwrap();
			assert_eq!(
				store.get_setting("dashboard_password").await.unwrap().as_deref(),
				Some("abc")
			);

			store.set_setting("dashboard_password", "def").await.unwrap();
			assert_eq!(
				store.get_setting("dashboard_password").await.unwrap().as_deref(),
				Some("def")
			);
		}
	}

	mod stats {
		use super::*;

		#[tokio::test]
		async fn aggregates_counts_windows_and_trend() {
			let store = setup().await;
			let app = make_app("storefront");
			store.create_app(&app).await.unwrap();

			// Two today, one two days ago, one outside every window.
			let mut crashes = vec![
				make_crash(app.id, "TypeError", "fp-a"),
				make_crash(app.id, "TypeError", "fp-a"),
				make_crash(app.id, "FormatException", "fp-b"),
				make_crash(app.id, "StateError", "fp-c"),
			];
			crashes[2].created_at = Utc::now() - Duration::days(2);
			crashes[3].created_at = Utc::now() - Duration::days(45);
			for crash in &crashes {
				store.get_or_create_group(crash).await.unwrap();
				store.insert_crash(crash).await.unwrap();
			}

			let (mut resolved, _) = store
				.list_groups(&GroupFilter {
					app_id: Some(app.id),
					error_type: Some("StateError".to_string()),
					..Default::default()
				})
				.await
				.unwrap();
			let mut stale_group = resolved.remove(0);
			stale_group.status = GroupStatus::Resolved;
			store.update_group(&stale_group).await.unwrap();

			let stats = store.app_stats(app.id).await.unwrap();
			assert_eq!(stats.total_crashes, 4);
			assert_eq!(stats.total_groups, 3);
			assert_eq!(stats.open_groups, 2);
			assert_eq!(stats.crashes_last_24h, 2);
			assert_eq!(stats.crashes_last_7d, 3);
			assert_eq!(stats.crashes_last_30d, 3);

			// Top errors ranked by occurrence count.
			assert_eq!(stats.top_errors[0].error_type, "TypeError");
			assert_eq!(stats.top_errors[0].count, 2);

			// Trend only contains days with crashes inside the window.
			assert_eq!(stats.crash_trend.len(), 2);
			assert!(stats.crash_trend[0].date < stats.crash_trend[1].date);
		}

		#[tokio::test]
		async fn top_errors_ties_break_by_last_seen() {
			let store = setup().await;
			let app = make_app("storefront");
			store.create_app(&app).await.unwrap();

			let mut earlier = make_crash(app.id, "Earlier", "fp-a");
			earlier.created_at = Utc::now() - Duration::hours(3);
			let later = make_crash(app.id, "Later", "fp-b");
			for crash in [&earlier, &later] {
				store.get_or_create_group(crash).await.unwrap();
				store.insert_crash(crash).await.unwrap();
			}

			let stats = store.app_stats(app.id).await.unwrap();
			assert_eq!(stats.top_errors.len(), 2);
			assert_eq!(stats.top_errors[0].error_type, "Later");
		}
	}
}
