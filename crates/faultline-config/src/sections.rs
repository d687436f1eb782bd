// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections: storage, retention, alerts, logging.
//!
//! Each section has a fully resolved runtime struct plus a partial `*Layer`
//! used while merging sources; a later source's set fields overwrite an
//! earlier one's.

use serde::{Deserialize, Serialize};

/// Storage paths (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
	/// SQLite database location.
	pub index_path: String,
	/// Root directory for crash payload files.
	pub blob_root: String,
}

impl Default for StorageConfig {
	fn default() -> Self {
		Self {
			index_path: "sqlite:./data/faultline.db".to_string(),
			blob_root: "./data/crashes".to_string(),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageConfigLayer {
	pub index_path: Option<String>,
	pub blob_root: Option<String>,
}

impl StorageConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.index_path.is_some() {
			self.index_path = other.index_path;
		}
		if other.blob_root.is_some() {
			self.blob_root = other.blob_root;
		}
	}

	pub fn finalize(self) -> StorageConfig {
		let defaults = StorageConfig::default();
		StorageConfig {
			index_path: self.index_path.unwrap_or(defaults.index_path),
			blob_root: self.blob_root.unwrap_or(defaults.blob_root),
		}
	}
}

/// Retention settings (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq)]
pub struct RetentionConfig {
	pub default_days: i64,
	pub cleanup_interval_secs: u64,
}

impl Default for RetentionConfig {
	fn default() -> Self {
		Self {
			default_days: 30,
			cleanup_interval_secs: 86_400,
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetentionConfigLayer {
	pub default_days: Option<i64>,
	pub cleanup_interval_secs: Option<u64>,
}

impl RetentionConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.default_days.is_some() {
			self.default_days = other.default_days;
		}
		if other.cleanup_interval_secs.is_some() {
			self.cleanup_interval_secs = other.cleanup_interval_secs;
		}
	}

	pub fn finalize(self) -> RetentionConfig {
		let defaults = RetentionConfig::default();
		RetentionConfig {
			default_days: self.default_days.unwrap_or(defaults.default_days),
			cleanup_interval_secs: self
				.cleanup_interval_secs
				.unwrap_or(defaults.cleanup_interval_secs),
		}
	}
}

/// SMTP settings for email alerts. The section is optional as a whole; a
/// config without a host sends no email.
#[derive(Debug, Clone, PartialEq)]
pub struct SmtpSettings {
	pub host: String,
	pub port: u16,
	pub username: Option<String>,
	pub password: Option<String>,
	pub from: String,
	pub use_tls: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SmtpConfigLayer {
	pub host: Option<String>,
	pub port: Option<u16>,
	pub username: Option<String>,
	pub password: Option<String>,
	pub from: Option<String>,
	pub use_tls: Option<bool>,
}

impl SmtpConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.host.is_some() {
			self.host = other.host;
		}
		if other.port.is_some() {
			self.port = other.port;
		}
		if other.username.is_some() {
			self.username = other.username;
		}
		if other.password.is_some() {
			self.password = other.password;
		}
		if other.from.is_some() {
			self.from = other.from;
		}
		if other.use_tls.is_some() {
			self.use_tls = other.use_tls;
		}
	}

	/// `None` unless both a host and a from address are present.
	pub fn finalize(self) -> Option<SmtpSettings> {
		let host = self.host.filter(|h| !h.is_empty())?;
		let from = self.from.filter(|f| !f.is_empty())?;
		Some(SmtpSettings {
			host,
			port: self.port.unwrap_or(587),
			username: self.username,
			password: self.password,
			from,
			use_tls: self.use_tls.unwrap_or(true),
		})
	}
}

/// Alerting settings (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq)]
pub struct AlertsConfig {
	pub queue_capacity: usize,
	pub webhook_timeout_secs: u64,
	pub smtp: Option<SmtpSettings>,
	pub chat_webhook_url: Option<String>,
}

impl Default for AlertsConfig {
	fn default() -> Self {
		Self {
			queue_capacity: 100,
			webhook_timeout_secs: 10,
			smtp: None,
			chat_webhook_url: None,
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AlertsConfigLayer {
	pub queue_capacity: Option<usize>,
	pub webhook_timeout_secs: Option<u64>,
	#[serde(default)]
	pub smtp: SmtpConfigLayer,
	pub chat_webhook_url: Option<String>,
}

impl AlertsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.queue_capacity.is_some() {
			self.queue_capacity = other.queue_capacity;
		}
		if other.webhook_timeout_secs.is_some() {
			self.webhook_timeout_secs = other.webhook_timeout_secs;
		}
		self.smtp.merge(other.smtp);
		if other.chat_webhook_url.is_some() {
			self.chat_webhook_url = other.chat_webhook_url;
		}
	}

	pub fn finalize(self) -> AlertsConfig {
		AlertsConfig {
			queue_capacity: self.queue_capacity.unwrap_or(100),
			webhook_timeout_secs: self.webhook_timeout_secs.unwrap_or(10),
			smtp: self.smtp.finalize(),
			chat_webhook_url: self.chat_webhook_url.filter(|u| !u.is_empty()),
		}
	}
}

/// Logging settings (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
	/// tracing-subscriber EnvFilter directive, e.g. "info" or
	/// "faultline=debug,sqlx=warn".
	pub filter: String,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			filter: "info".to_string(),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfigLayer {
	pub filter: Option<String>,
}

impl LoggingConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.filter.is_some() {
			self.filter = other.filter;
		}
	}

	pub fn finalize(self) -> LoggingConfig {
		LoggingConfig {
			filter: self.filter.unwrap_or_else(|| "info".to_string()),
		}
	}
}
