// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Asynchronous alerting for Faultline.
//!
//! The [`Alerter`] owns a bounded in-memory queue drained by a single worker
//! task. Ingestion hands events over with a non-blocking [`Alerter::notify`];
//! when the queue is full the event is dropped with a warning rather than
//! ever blocking a submission. The worker matches each event against the
//! active rule set and dispatches to webhook, email, or chat sinks, each
//! bounded by its own timeout.

pub mod alerter;
pub mod error;
pub mod event;
pub mod sink;
pub mod smtp;

pub use alerter::{Alerter, AlerterConfig, DEFAULT_QUEUE_CAPACITY};
pub use error::{AlertError, Result};
pub use event::{AlertEvent, AlertEventKind};
pub use sink::{AlertSink, Dispatcher, DEFAULT_WEBHOOK_TIMEOUT};
pub use smtp::{SmtpClient, SmtpConfig, SmtpError};
