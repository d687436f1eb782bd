// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Crash report types: the client submission envelope, stack frames, and
//! the fully materialized server-side crash record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::breadcrumb::Breadcrumb;
use crate::ids::{AppId, CrashId, GroupId};

/// A single frame in a stack trace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackFrame {
	#[serde(default)]
	pub file_name: String,
	/// 0 when unknown.
	#[serde(default)]
	pub line_number: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub column_number: Option<u32>,
	#[serde(default)]
	pub method_name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub class_name: Option<String>,
	/// System/runtime frames are excluded from fingerprinting.
	#[serde(default)]
	pub native: bool,
}

/// The incoming crash report as posted by a client SDK.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashSubmission {
	pub app_version: String,
	/// Conventionally one of "ios", "android", "web", "desktop", "flutter".
	pub platform: String,
	#[serde(default)]
	pub os_version: String,
	#[serde(default)]
	pub device_model: String,
	pub error_type: String,
	pub error_message: String,
	pub stack_trace: Vec<StackFrame>,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub user_id: String,
	#[serde(default)]
	pub environment: String,
	#[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
	pub metadata: serde_json::Map<String, serde_json::Value>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub breadcrumbs: Vec<Breadcrumb>,
}

/// A fully materialized crash record.
///
/// The indexed store persists the searchable columns; the blob store holds
/// the complete record including stack trace and breadcrumbs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crash {
	pub id: CrashId,
	pub app_id: AppId,
	pub app_version: String,
	pub platform: String,
	#[serde(default)]
	pub os_version: String,
	#[serde(default)]
	pub device_model: String,
	pub error_type: String,
	pub error_message: String,
	pub stack_trace: Vec<StackFrame>,
	pub fingerprint: String,
	pub group_id: GroupId,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub user_id: String,
	pub environment: String,
	pub created_at: DateTime<Utc>,
	/// Relative path into the blob store; empty if the blob write failed.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub blob_path: String,
	#[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
	pub metadata: serde_json::Map<String, serde_json::Value>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub breadcrumbs: Vec<Breadcrumb>,
}

/// Returned to the submitting client after a crash has been ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionReceipt {
	pub id: CrashId,
	pub group_id: GroupId,
	pub fingerprint: String,
	pub is_new_group: bool,
}
