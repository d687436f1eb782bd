// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Faultline crash reporting system.
//!
//! This crate provides the shared domain model for crash ingestion and
//! aggregation: crash reports, stack frames, breadcrumbs, crash groups,
//! registered applications, alert rules, and the fingerprinting algorithm
//! that collapses crashes with a shared root cause into one group. It is
//! used by the storage, ingestion, alerting, and retention crates.

pub mod alert_rule;
pub mod app;
pub mod breadcrumb;
pub mod crash;
pub mod error;
pub mod fingerprint;
pub mod group;
pub mod ids;
pub mod stats;

pub use alert_rule::{AlertRule, ChannelKind};
pub use app::App;
pub use breadcrumb::{Breadcrumb, BreadcrumbLevel};
pub use crash::{Crash, CrashSubmission, StackFrame, SubmissionReceipt};
pub use error::{CoreError, Result};
pub use fingerprint::{compute_fingerprint, summarize_message, top_frame};
pub use group::{CrashGroup, GroupStatus};
pub use ids::{AlertRuleId, AppId, CrashId, GroupId};
pub use stats::{AppStats, ErrorSummary, TrendPoint};

/// Default environment tag applied to submissions that omit one.
pub const ENVIRONMENT_PRODUCTION: &str = "production";
