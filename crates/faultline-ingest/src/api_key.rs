// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! API key generation and verification for ingestion auth.
//!
//! Keys are random, prefixed for recognizability, and stored only as SHA-256
//! hex digests. The plaintext key leaves the server exactly once, in the
//! response that creates the app.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Prefix identifying Faultline ingestion keys in config files and logs.
pub const KEY_PREFIX: &str = "flk_";

/// Generate a fresh API key; returns `(plaintext, hash)`.
pub fn generate_api_key() -> (String, String) {
	let mut bytes = [0u8; 32];
	rand::rngs::OsRng.fill_bytes(&mut bytes);
	let plaintext = format!("{KEY_PREFIX}{}", hex::encode(bytes));
	let hash = hash_api_key(&plaintext);
	(plaintext, hash)
}

/// SHA-256 hex digest of a plaintext key.
pub fn hash_api_key(key: &str) -> String {
	let mut hasher = Sha256::new();
	hasher.update(key.as_bytes());
	hex::encode(hasher.finalize())
}

/// Whether a presented key matches a stored hash.
pub fn verify_api_key(key: &str, stored_hash: &str) -> bool {
	hash_api_key(key) == stored_hash
}
