// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The alerter: bounded queue, single worker, per-rule dispatch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use faultline_core::AlertRule;

use crate::error::Result;
use crate::event::{AlertEvent, AlertEventKind};
use crate::sink::{Dispatcher, DEFAULT_WEBHOOK_TIMEOUT};
use crate::smtp::SmtpConfig;

/// Queue capacity applied when the config does not set one.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Construction-time settings for the alerter.
#[derive(Debug, Default)]
pub struct AlerterConfig {
	/// 0 means [`DEFAULT_QUEUE_CAPACITY`].
	pub queue_capacity: usize,
	/// 0 means [`DEFAULT_WEBHOOK_TIMEOUT`].
	pub webhook_timeout_secs: u64,
	pub smtp: Option<SmtpConfig>,
	pub chat_webhook_url: Option<String>,
}

/// Long-running alert fan-out component.
///
/// Events are enqueued by [`Alerter::notify`], which never blocks: a full
/// queue drops the event with a warning. A single worker drains the queue,
/// snapshots the rule list under a read lock, and dispatches each matching
/// rule through its sink. Per-rule failures are logged and isolated.
pub struct Alerter {
	rules: Arc<RwLock<Vec<AlertRule>>>,
	tx: mpsc::Sender<AlertEvent>,
	shutdown_tx: broadcast::Sender<()>,
	worker: Mutex<Option<JoinHandle<()>>>,
	dropped: AtomicU64,
}

impl Alerter {
	/// Build the sink transports and start the worker.
	pub fn new(config: AlerterConfig) -> Result<Self> {
		let capacity = if config.queue_capacity > 0 {
			config.queue_capacity
		} else {
			DEFAULT_QUEUE_CAPACITY
		};
		let webhook_timeout = if config.webhook_timeout_secs > 0 {
			std::time::Duration::from_secs(config.webhook_timeout_secs)
		} else {
			DEFAULT_WEBHOOK_TIMEOUT
		};

		let dispatcher = Dispatcher::new(config.smtp, config.chat_webhook_url, webhook_timeout)?;
		let (tx, rx) = mpsc::channel(capacity);
		let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
		let rules = Arc::new(RwLock::new(Vec::new()));

		let worker = tokio::spawn(run_worker(rx, shutdown_rx, Arc::clone(&rules), dispatcher));

		Ok(Self {
			rules,
			tx,
			shutdown_tx,
			worker: Mutex::new(Some(worker)),
			dropped: AtomicU64::new(0),
		})
	}

	/// Replace the active rule set (startup and after admin changes).
	pub async fn set_rules(&self, rules: Vec<AlertRule>) {
		*self.rules.write().await = rules;
	}

	/// Append one rule.
	pub async fn add_rule(&self, rule: AlertRule) {
		self.rules.write().await.push(rule);
	}

	/// Enqueue an event without blocking. Overflow drops the event.
	pub fn notify(&self, event: AlertEvent) {
		match self.tx.try_send(event) {
			Ok(()) => {}
			Err(TrySendError::Full(_)) => {
				self.dropped.fetch_add(1, Ordering::Relaxed);
				warn!("alert queue full, dropping event");
			}
			Err(TrySendError::Closed(_)) => {
				warn!("alerter closed, dropping event");
			}
		}
	}

	/// How many events have been dropped because the queue was full.
	pub fn dropped_events(&self) -> u64 {
		self.dropped.load(Ordering::Relaxed)
	}

	/// Stop the worker and release the sink transports.
	pub async fn close(&self) {
		let _ = self.shutdown_tx.send(());
		if let Some(worker) = self.worker.lock().await.take() {
			let _ = worker.await;
		}
		info!("alerter shut down");
	}

	#[cfg(test)]
	fn with_stalled_worker(capacity: usize) -> (Self, mpsc::Receiver<AlertEvent>) {
		let (tx, rx) = mpsc::channel(capacity);
		let (shutdown_tx, _) = broadcast::channel(1);
		(
			Self {
				rules: Arc::new(RwLock::new(Vec::new())),
				tx,
				shutdown_tx,
				worker: Mutex::new(None),
				dropped: AtomicU64::new(0),
			},
			rx,
		)
	}
}

async fn run_worker(
	mut rx: mpsc::Receiver<AlertEvent>,
	mut shutdown_rx: broadcast::Receiver<()>,
	rules: Arc<RwLock<Vec<AlertRule>>>,
	dispatcher: Dispatcher,
) {
	loop {
		tokio::select! {
			_ = shutdown_rx.recv() => break,
			event = rx.recv() => match event {
				Some(event) => process_event(&rules, &dispatcher, event).await,
				None => break,
			},
		}
	}
}

async fn process_event(
	rules: &RwLock<Vec<AlertRule>>,
	dispatcher: &Dispatcher,
	event: AlertEvent,
) {
	// Snapshot so dispatch never holds the lock.
	let snapshot = rules.read().await.clone();

	for rule in &snapshot {
		if !rule.enabled || !rule.applies_to(&event.app_id) || !rule_matches(rule, &event) {
			continue;
		}

		if let Err(e) = dispatcher.dispatch(rule, &event).await {
			error!(rule_id = %rule.id, error = %e, "failed to send alert");
		}
	}
}

/// Whether a rule's conditions accept an event.
///
/// Conditions live under the rule config's `conditions` key:
/// `on_new_group`, `on_every_crash`, and an `error_types` allow-list.
/// Threshold events match any rule that passed the enabled/app checks.
pub fn rule_matches(rule: &AlertRule, event: &AlertEvent) -> bool {
	let conditions = rule.config.get("conditions").and_then(|v| v.as_object());
	let flag = |key: &str| {
		conditions
			.and_then(|c| c.get(key))
			.and_then(|v| v.as_bool())
			.unwrap_or(false)
	};

	match event.kind {
		AlertEventKind::NewGroup => {
			if flag("on_new_group") {
				return true;
			}
		}
		AlertEventKind::NewCrash => {
			if flag("on_every_crash") {
				return true;
			}
		}
		AlertEventKind::Threshold => return true,
	}

	if let Some(error_types) = conditions
		.and_then(|c| c.get("error_types"))
		.and_then(|v| v.as_array())
	{
		return error_types
			.iter()
			.filter_map(|v| v.as_str())
			.any(|t| t == event.crash.error_type);
	}

	false
}
