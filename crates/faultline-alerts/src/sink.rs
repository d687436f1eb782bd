// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Alert sinks: webhook, email, and chat delivery.
//!
//! Rules carry a channel kind plus an opaque config map; the map is parsed
//! into a concrete [`AlertSink`] only when a delivery is attempted, so a
//! misconfigured rule fails at dispatch time without affecting other rules.

use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tracing::instrument;

use faultline_core::{AlertRule, ChannelKind};

use crate::error::{AlertError, Result};
use crate::event::{AlertEvent, AlertEventKind};
use crate::smtp::{SmtpClient, SmtpConfig};

/// Cap on outbound HTTP calls unless the configuration overrides it.
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

const COLOR_NEW_CRASH: &str = "#ff0000";
const COLOR_NEW_GROUP: &str = "#ff6600";

/// A rule's delivery target, parsed from its config map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertSink {
	Webhook {
		url: String,
		headers: Vec<(String, String)>,
	},
	Email {
		to: String,
	},
	Chat {
		/// Per-rule override of the process-wide chat webhook URL.
		override_url: Option<String>,
	},
}

impl AlertSink {
	/// Parse the sink for a rule, validating the channel-specific config.
	pub fn from_rule(rule: &AlertRule) -> Result<Self> {
		match rule.channel {
			ChannelKind::Webhook => {
				let url = rule
					.config
					.get("url")
					.and_then(|v| v.as_str())
					.filter(|u| !u.is_empty())
					.ok_or_else(|| AlertError::SinkConfig("webhook URL not configured".into()))?
					.to_string();

				let headers = rule
					.config
					.get("headers")
					.and_then(|v| v.as_object())
					.map(|map| {
						map.iter()
							.filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
							.collect()
					})
					.unwrap_or_default();

				Ok(Self::Webhook { url, headers })
			}
			ChannelKind::Email => {
				let to = rule
					.config
					.get("to")
					.and_then(|v| v.as_str())
					.filter(|t| !t.is_empty())
					.ok_or_else(|| AlertError::SinkConfig("email recipient not configured".into()))?
					.to_string();

				Ok(Self::Email { to })
			}
			ChannelKind::Chat => {
				let override_url = rule
					.config
					.get("webhook_url")
					.and_then(|v| v.as_str())
					.filter(|u| !u.is_empty())
					.map(str::to_string);

				Ok(Self::Chat { override_url })
			}
		}
	}
}

/// Owns the sink transports: one HTTP client with a fixed timeout, the
/// optional SMTP client, and the process-wide chat webhook URL.
pub struct Dispatcher {
	client: reqwest::Client,
	smtp: Option<SmtpClient>,
	chat_webhook_url: Option<String>,
}

impl Dispatcher {
	pub fn new(
		smtp: Option<SmtpConfig>,
		chat_webhook_url: Option<String>,
		webhook_timeout: Duration,
	) -> Result<Self> {
		let client = reqwest::Client::builder()
			.user_agent(concat!("faultline/", env!("CARGO_PKG_VERSION")))
			.timeout(webhook_timeout)
			.build()?;

		let smtp = match smtp {
			Some(config) => Some(SmtpClient::new(config)?),
			None => None,
		};

		Ok(Self {
			client,
			smtp,
			chat_webhook_url,
		})
	}

	/// Deliver one event through one rule's sink.
	#[instrument(skip(self, rule, event), fields(rule_id = %rule.id, channel = %rule.channel))]
	pub async fn dispatch(&self, rule: &AlertRule, event: &AlertEvent) -> Result<()> {
		match AlertSink::from_rule(rule)? {
			AlertSink::Webhook { url, headers } => self.send_webhook(&url, &headers, event).await,
			AlertSink::Email { to } => self.send_email(&to, event).await,
			AlertSink::Chat { override_url } => {
				let url = override_url
					.as_deref()
					.or(self.chat_webhook_url.as_deref())
					.ok_or(AlertError::ChatNotConfigured)?;
				self.send_chat(url, event).await
			}
		}
	}

	async fn send_webhook(
		&self,
		url: &str,
		headers: &[(String, String)],
		event: &AlertEvent,
	) -> Result<()> {
		let mut request = self.client.post(url).json(&webhook_payload(event));
		for (name, value) in headers {
			request = request.header(name.as_str(), value.as_str());
		}

		let response = request.send().await?;
		if !response.status().is_success() {
			return Err(AlertError::HttpStatus(response.status().as_u16()));
		}
		Ok(())
	}

	async fn send_email(&self, to: &str, event: &AlertEvent) -> Result<()> {
		let smtp = self.smtp.as_ref().ok_or(AlertError::SmtpNotConfigured)?;
		smtp.send(to, &email_subject(event), &email_body(event))
			.await?;
		Ok(())
	}

	async fn send_chat(&self, url: &str, event: &AlertEvent) -> Result<()> {
		let response = self
			.client
			.post(url)
			.json(&chat_payload(event))
			.send()
			.await?;
		if !response.status().is_success() {
			return Err(AlertError::HttpStatus(response.status().as_u16()));
		}
		Ok(())
	}
}

/// The JSON envelope POSTed to webhook sinks.
pub fn webhook_payload(event: &AlertEvent) -> serde_json::Value {
	json!({
		"event_type": event.kind.to_string(),
		"app_id": event.app_id.to_string(),
		"timestamp": Utc::now().to_rfc3339(),
		"is_new_group": event.is_new_group,
		"crash": {
			"id": event.crash.id.to_string(),
			"error_type": event.crash.error_type,
			"error_message": event.crash.error_message,
			"platform": event.crash.platform,
			"app_version": event.crash.app_version,
			"environment": event.crash.environment,
		},
		"group": {
			"id": event.group.id.to_string(),
			"fingerprint": event.group.fingerprint,
			"occurrence_count": event.group.occurrence_count,
			"first_seen": event.group.first_seen.to_rfc3339(),
			"last_seen": event.group.last_seen.to_rfc3339(),
		},
	})
}

/// The "attachments" payload POSTed to chat sinks.
pub fn chat_payload(event: &AlertEvent) -> serde_json::Value {
	let (color, title) = if event.is_new_group {
		(COLOR_NEW_GROUP, format!("NEW ERROR in {}", event.app_id))
	} else {
		(COLOR_NEW_CRASH, format!("Crash in {}", event.app_id))
	};

	json!({
		"attachments": [{
			"color": color,
			"title": title,
			"fields": [
				{"title": "Error Type", "value": event.crash.error_type, "short": true},
				{"title": "Platform", "value": event.crash.platform, "short": true},
				{"title": "App Version", "value": event.crash.app_version, "short": true},
				{"title": "Environment", "value": event.crash.environment, "short": true},
				{"title": "Occurrences", "value": event.group.occurrence_count.to_string(), "short": true},
			],
			"text": event.crash.error_message,
			"footer": "Faultline",
			"ts": event.crash.created_at.timestamp(),
		}]
	})
}

pub fn email_subject(event: &AlertEvent) -> String {
	if event.is_new_group {
		format!(
			"[Faultline] NEW ERROR in {}: {}",
			event.app_id, event.crash.error_type
		)
	} else {
		format!("[Faultline] New crash in {}", event.app_id)
	}
}

pub fn email_body(event: &AlertEvent) -> String {
	format!(
		"New crash detected in your application.\n\n\
		App ID: {}\n\
		Error Type: {}\n\
		Error Message: {}\n\
		Platform: {}\n\
		App Version: {}\n\
		Environment: {}\n\
		Time: {}\n\n\
		Group ID: {}\n\
		Is New Group: {}\n\
		Occurrence Count: {}\n",
		event.app_id,
		event.crash.error_type,
		event.crash.error_message,
		event.crash.platform,
		event.crash.app_version,
		event.crash.environment,
		event.crash.created_at.to_rfc3339(),
		event.group.id,
		event.is_new_group,
		event.group.occurrence_count,
	)
}
