// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration for the Faultline server.
//!
//! Settings come from three layered sources with fixed precedence:
//! built-in defaults, then `faultline.toml`, then `FAULTLINE_*` environment
//! variables. Each section resolves independently; see [`sections`] for the
//! recognized options and their defaults.

pub mod error;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use sections::{
	AlertsConfig, AlertsConfigLayer, LoggingConfig, LoggingConfigLayer, RetentionConfig,
	RetentionConfigLayer, SmtpConfigLayer, SmtpSettings, StorageConfig, StorageConfigLayer,
};
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use serde::{Deserialize, Serialize};
use tracing::info;

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
	pub storage: StorageConfig,
	pub retention: RetentionConfig,
	pub alerts: AlertsConfig,
	pub logging: LoggingConfig,
}

/// Partial configuration as parsed from one source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigLayer {
	#[serde(default)]
	pub storage: StorageConfigLayer,
	#[serde(default)]
	pub retention: RetentionConfigLayer,
	#[serde(default)]
	pub alerts: AlertsConfigLayer,
	#[serde(default)]
	pub logging: LoggingConfigLayer,
}

impl ConfigLayer {
	pub fn merge(&mut self, other: Self) {
		self.storage.merge(other.storage);
		self.retention.merge(other.retention);
		self.alerts.merge(other.alerts);
		self.logging.merge(other.logging);
	}

	pub fn finalize(self) -> Config {
		Config {
			storage: self.storage.finalize(),
			retention: self.retention.finalize(),
			alerts: self.alerts.finalize(),
			logging: self.logging.finalize(),
		}
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`FAULTLINE_*`)
/// 2. Config file (`faultline.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<Config, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::default_location()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<Config, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<Config, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ConfigLayer::default();
	for source in sources {
		merged.merge(source.load()?);
	}

	let config = merged.finalize();
	info!(
		index_path = %config.storage.index_path,
		blob_root = %config.storage.blob_root,
		retention_days = config.retention.default_days,
		smtp_configured = config.alerts.smtp.is_some(),
		chat_configured = config.alerts.chat_webhook_url.is_some(),
		"configuration loaded"
	);
	Ok(config)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn defaults_alone_resolve() {
		let config = ConfigLayer::default().finalize();
		assert_eq!(config.retention.default_days, 30);
		assert_eq!(config.alerts.queue_capacity, 100);
		assert_eq!(config.alerts.webhook_timeout_secs, 10);
		assert_eq!(config.logging.filter, "info");
	}

	#[test]
	fn file_layer_overrides_defaults() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(
			file,
			r#"
			[storage]
			index_path = "sqlite:/var/lib/faultline/index.db"

			[retention]
			default_days = 14
			"#
		)
		.unwrap();

		let mut merged = ConfigLayer::default();
		merged.merge(TomlSource::new(file.path()).load().unwrap());
		let config = merged.finalize();

		assert_eq!(config.storage.index_path, "sqlite:/var/lib/faultline/index.db");
		assert_eq!(config.retention.default_days, 14);
		// Untouched sections keep their defaults.
		assert_eq!(config.storage.blob_root, "./data/crashes");
	}

	#[test]
	fn missing_file_is_an_empty_layer() {
		let layer = TomlSource::new("/nonexistent/faultline.toml").load().unwrap();
		assert_eq!(layer, ConfigLayer::default());
	}

	#[test]
	fn malformed_file_is_an_error() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, "not [valid toml").unwrap();
		assert!(TomlSource::new(file.path()).load().is_err());
	}

	#[test]
	fn sources_sort_by_precedence() {
		assert!(Precedence::Defaults < Precedence::ConfigFile);
		assert!(Precedence::ConfigFile < Precedence::Environment);
	}
}
