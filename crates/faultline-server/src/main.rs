// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Faultline server entry point.

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use faultline_server::Service;

#[tokio::main]
async fn main() {
	// The subscriber is not up yet, so configuration failures go to stderr.
	let config = match faultline_config::load_config() {
		Ok(config) => config,
		Err(e) => {
			eprintln!("failed to load configuration: {e}");
			std::process::exit(1);
		}
	};

	let filter = EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|e| {
		eprintln!(
			"invalid log filter {:?} ({e}), falling back to \"info\"",
			config.logging.filter
		);
		EnvFilter::new("info")
	});
	tracing_subscriber::fmt().with_env_filter(filter).init();

	let service = match Service::start(&config).await {
		Ok(service) => service,
		Err(e) => {
			error!(error = %e, "failed to start service");
			std::process::exit(1);
		}
	};

	info!("faultline is running, press ctrl-c to stop");
	if let Err(e) = tokio::signal::ctrl_c().await {
		error!(error = %e, "failed to listen for shutdown signal");
	}

	service.shutdown().await;
}
