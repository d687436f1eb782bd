// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config file {0}: {1}")]
	Io(String, #[source] std::io::Error),

	#[error("failed to parse config file {0}: {1}")]
	Toml(String, #[source] toml::de::Error),

	#[error("invalid value for {0}: {1:?}")]
	InvalidValue(String, String),
}
