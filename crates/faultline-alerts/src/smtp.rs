// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Async SMTP client used by the email alert sink.

use std::fmt;

use lettre::{
	message::{header::ContentType, Mailbox},
	transport::smtp::authentication::Credentials,
	AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// Errors that can occur during SMTP operations.
#[derive(Debug, thiserror::Error)]
pub enum SmtpError {
	/// Failed to connect to the SMTP server.
	#[error("connection failed: {0}")]
	Connection(String),

	/// Failed to send an email message.
	#[error("send failed: {0}")]
	Send(String),

	/// Invalid email address format.
	#[error("invalid email address: {0}")]
	Address(String),
}

/// Process-wide SMTP settings consumed by the alerter.
#[derive(Clone)]
pub struct SmtpConfig {
	pub host: String,
	/// Common values: 25 (unencrypted), 465 (TLS), 587 (STARTTLS).
	pub port: u16,
	pub username: Option<String>,
	pub password: Option<String>,
	/// Address alert emails are sent from.
	pub from: String,
	/// Whether to use STARTTLS for the connection.
	pub use_tls: bool,
}

impl fmt::Debug for SmtpConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SmtpConfig")
			.field("host", &self.host)
			.field("port", &self.port)
			.field("username", &self.username)
			.field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
			.field("from", &self.from)
			.field("use_tls", &self.use_tls)
			.finish()
	}
}

/// Async SMTP client for sending plain-text alert emails.
///
/// The transport connects lazily on first send.
pub struct SmtpClient {
	transport: AsyncSmtpTransport<Tokio1Executor>,
	from_mailbox: Mailbox,
}

impl SmtpClient {
	/// Build a client from the given configuration.
	#[tracing::instrument(
		name = "smtp_client_new",
		skip(config),
		fields(host = %config.host, port = %config.port, use_tls = %config.use_tls)
	)]
	pub fn new(config: SmtpConfig) -> Result<Self, SmtpError> {
		let from_mailbox: Mailbox = config
			.from
			.parse()
			.map_err(|e| SmtpError::Address(format!("{e}")))?;

		let builder = if config.use_tls {
			AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
				.map_err(|e| SmtpError::Connection(format!("{e}")))?
		} else {
			AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
		};

		let mut builder = builder.port(config.port);

		if let (Some(username), Some(password)) = (config.username, config.password) {
			builder = builder.credentials(Credentials::new(username, password));
		}

		tracing::debug!("SMTP client initialized");

		Ok(Self {
			transport: builder.build(),
			from_mailbox,
		})
	}

	/// Send a plain-text email.
	#[tracing::instrument(
		name = "smtp_send_email",
		skip(self, body),
		fields(to = %to, subject = %subject)
	)]
	pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), SmtpError> {
		let to_mailbox: Mailbox = to.parse().map_err(|e| SmtpError::Address(format!("{e}")))?;

		let message = Message::builder()
			.from(self.from_mailbox.clone())
			.to(to_mailbox)
			.subject(subject)
			.header(ContentType::TEXT_PLAIN)
			.body(body.to_string())
			.map_err(|e| SmtpError::Send(format!("failed to build message: {e}")))?;

		self.transport
			.send(message)
			.await
			.map_err(|e| SmtpError::Send(format!("{e}")))?;

		tracing::debug!("alert email sent");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn config() -> SmtpConfig {
		SmtpConfig {
			host: "smtp.example.com".to_string(),
			port: 587,
			username: Some("user".to_string()),
			password: Some("super-secret-password".to_string()),
			from: "alerts@example.com".to_string(),
			use_tls: true,
		}
	}

	#[test]
	fn debug_does_not_leak_password() {
		let debug = format!("{:?}", config());
		assert!(!debug.contains("super-secret-password"));
		assert!(debug.contains("[REDACTED]"));
	}

	#[test]
	fn invalid_from_address_is_rejected() {
		let mut bad = config();
		bad.from = "not-an-address".to_string();
		assert!(matches!(SmtpClient::new(bad), Err(SmtpError::Address(_))));
	}

	#[test]
	fn client_builds_without_credentials() {
		let mut anon = config();
		anon.username = None;
		anon.password = None;
		anon.use_tls = false;
		assert!(SmtpClient::new(anon).is_ok());
	}
}
