// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, TOML file, environment variables.

use std::path::PathBuf;

use tracing::debug;

use crate::error::ConfigError;
use crate::ConfigLayer;

/// Source precedence levels (higher overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		Ok(ConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// The conventional location next to the working directory.
	pub fn default_location() -> Self {
		Self::new("faultline.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "no config file, skipping");
			return Ok(ConfigLayer::default());
		}

		let contents = std::fs::read_to_string(&self.path)
			.map_err(|e| ConfigError::Io(self.path.display().to_string(), e))?;
		let layer = toml::from_str(&contents)
			.map_err(|e| ConfigError::Toml(self.path.display().to_string(), e))?;

		debug!(path = %self.path.display(), "loaded config file");
		Ok(layer)
	}
}

/// Environment variable source (`FAULTLINE_*`).
pub struct EnvSource;

impl EnvSource {
	fn var(name: &str) -> Option<String> {
		std::env::var(name).ok().filter(|v| !v.is_empty())
	}

	fn parsed_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
		match Self::var(name) {
			None => Ok(None),
			Some(raw) => raw
				.parse()
				.map(Some)
				.map_err(|_| ConfigError::InvalidValue(name.to_string(), raw)),
		}
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		let mut layer = ConfigLayer::default();

		layer.storage.index_path = Self::var("FAULTLINE_STORAGE_INDEX_PATH");
		layer.storage.blob_root = Self::var("FAULTLINE_STORAGE_BLOB_ROOT");

		layer.retention.default_days = Self::parsed_var("FAULTLINE_RETENTION_DEFAULT_DAYS")?;
		layer.retention.cleanup_interval_secs =
			Self::parsed_var("FAULTLINE_RETENTION_CLEANUP_INTERVAL_SECS")?;

		layer.alerts.queue_capacity = Self::parsed_var("FAULTLINE_ALERTS_QUEUE_CAPACITY")?;
		layer.alerts.webhook_timeout_secs =
			Self::parsed_var("FAULTLINE_ALERTS_WEBHOOK_TIMEOUT_SECS")?;
		layer.alerts.chat_webhook_url = Self::var("FAULTLINE_CHAT_WEBHOOK_URL");
		layer.alerts.smtp.host = Self::var("FAULTLINE_SMTP_HOST");
		layer.alerts.smtp.port = Self::parsed_var("FAULTLINE_SMTP_PORT")?;
		layer.alerts.smtp.username = Self::var("FAULTLINE_SMTP_USERNAME");
		layer.alerts.smtp.password = Self::var("FAULTLINE_SMTP_PASSWORD");
		layer.alerts.smtp.from = Self::var("FAULTLINE_SMTP_FROM");
		layer.alerts.smtp.use_tls = Self::parsed_var("FAULTLINE_SMTP_USE_TLS")?;

		layer.logging.filter = Self::var("FAULTLINE_LOG_FILTER");

		Ok(layer)
	}
}
