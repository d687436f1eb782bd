// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Alert rule configuration.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;
use crate::ids::{AlertRuleId, AppId};

/// An alert rule: which events, for which app, delivered over which channel.
///
/// The channel-specific settings (webhook URL, recipient address, match
/// conditions) live in the opaque `config` map and are validated when a
/// delivery is attempted, not at the rule API boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
	pub id: AlertRuleId,
	/// `None` matches every application.
	#[serde(
		default,
		deserialize_with = "empty_string_as_none",
		skip_serializing_if = "Option::is_none"
	)]
	pub app_id: Option<AppId>,
	#[serde(rename = "type")]
	pub channel: ChannelKind,
	#[serde(default)]
	pub config: serde_json::Map<String, serde_json::Value>,
	pub enabled: bool,
	pub created_at: DateTime<Utc>,
}

impl AlertRule {
	/// Whether this rule is scoped to the given app (or to all apps).
	pub fn applies_to(&self, app_id: &AppId) -> bool {
		match &self.app_id {
			None => true,
			Some(scoped) => scoped == app_id,
		}
	}
}

/// Delivery channel for an alert rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
	Webhook,
	Email,
	Chat,
}

impl fmt::Display for ChannelKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Webhook => write!(f, "webhook"),
			Self::Email => write!(f, "email"),
			Self::Chat => write!(f, "chat"),
		}
	}
}

impl FromStr for ChannelKind {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"webhook" => Ok(Self::Webhook),
			"email" => Ok(Self::Email),
			"chat" => Ok(Self::Chat),
			_ => Err(CoreError::InvalidChannelKind(s.to_string())),
		}
	}
}

// Older clients send `"app_id": ""` to mean "all apps".
fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<AppId>, D::Error>
where
	D: Deserializer<'de>,
{
	let value: Option<String> = Option::deserialize(deserializer)?;
	match value.as_deref() {
		None | Some("") => Ok(None),
		Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
	}
}
