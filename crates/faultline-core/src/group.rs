// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Crash group types: the aggregation entity for crashes sharing a fingerprint.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::{AppId, GroupId};

/// A group of crashes sharing one fingerprint within one application.
///
/// The representative `error_type` and `error_message` are captured from the
/// first crash of the group and never overwritten. `occurrence_count` counts
/// lifetime observations; retention never decrements it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashGroup {
	pub id: GroupId,
	pub app_id: AppId,
	pub fingerprint: String,
	pub error_type: String,
	pub error_message: String,
	pub first_seen: DateTime<Utc>,
	pub last_seen: DateTime<Utc>,
	pub occurrence_count: i64,
	pub status: GroupStatus,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub assigned_to: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
}

/// Triage status of a crash group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
	Open,
	Resolved,
	Ignored,
}

impl fmt::Display for GroupStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Open => write!(f, "open"),
			Self::Resolved => write!(f, "resolved"),
			Self::Ignored => write!(f, "ignored"),
		}
	}
}

impl FromStr for GroupStatus {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"open" => Ok(Self::Open),
			"resolved" => Ok(Self::Resolved),
			"ignored" => Ok(Self::Ignored),
			_ => Err(CoreError::InvalidGroupStatus(s.to_string())),
		}
	}
}
