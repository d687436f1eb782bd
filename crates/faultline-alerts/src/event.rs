// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Alert events produced by the ingestion path.

use std::fmt;

use serde::{Deserialize, Serialize};

use faultline_core::{AppId, Crash, CrashGroup};

/// What happened to trigger an alert evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertEventKind {
	NewCrash,
	NewGroup,
	Threshold,
}

impl fmt::Display for AlertEventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::NewCrash => write!(f, "new_crash"),
			Self::NewGroup => write!(f, "new_group"),
			Self::Threshold => write!(f, "threshold"),
		}
	}
}

/// One alertable occurrence, carrying the crash and its group as they were
/// at ingestion time.
#[derive(Debug, Clone)]
pub struct AlertEvent {
	pub kind: AlertEventKind,
	pub app_id: AppId,
	pub crash: Crash,
	pub group: CrashGroup,
	pub is_new_group: bool,
}
