// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fingerprinting algorithm for grouping similar crashes.
//!
//! The fingerprint must stay stable across releases of the reporting
//! application (so a new build does not spawn new groups) while keeping
//! genuinely distinct bugs apart. Every normalization rule below targets a
//! known source of churn: line numbers and addresses are excluded by
//! construction, closure and anonymous-class markers are stripped, generic
//! specializations are collapsed, and web build hashes are removed from
//! file names.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::crash::StackFrame;

/// Number of stack frames that contribute to the fingerprint.
const FRAME_LIMIT: usize = 5;

static GENERIC_PARAMS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static ANONYMOUS_CLASS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\d+|\$anon\w*").unwrap());
static CLOSURE_MARKERS: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"_closure\d*|\$\d+|_\d+$").unwrap());
static BUILD_HASH: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\.[a-f0-9]{8,}\.(js|dart|ts)$").unwrap());

/// Compute the 16-hex-digit fingerprint for a crash.
///
/// SHA-256 over the error kind followed by up to [`FRAME_LIMIT`] normalized
/// non-native frames, walked in order. Native frames are skipped without
/// consuming a slot, so runtime frames interleaved anywhere in the trace
/// never change the key.
pub fn compute_fingerprint(error_type: &str, frames: &[StackFrame]) -> String {
	let mut hasher = Sha256::new();

	hasher.update(error_type.as_bytes());
	hasher.update(b"|");

	for frame in frames.iter().filter(|f| !f.native).take(FRAME_LIMIT) {
		hasher.update(normalize_frame(frame).as_bytes());
		hasher.update(b"|");
	}

	let digest = hex::encode(hasher.finalize());
	digest[..16].to_string()
}

/// Normalize one frame to `class:method:file`, omitting empty segments.
fn normalize_frame(frame: &StackFrame) -> String {
	let mut parts = Vec::with_capacity(3);

	if let Some(class_name) = frame.class_name.as_deref() {
		let normalized = normalize_class_name(class_name);
		if !normalized.is_empty() {
			parts.push(normalized);
		}
	}

	let method = normalize_method_name(&frame.method_name);
	if !method.is_empty() {
		parts.push(method);
	}

	let file = normalize_file_name(&frame.file_name);
	if !file.is_empty() {
		parts.push(file);
	}

	parts.join(":")
}

fn normalize_class_name(class_name: &str) -> String {
	let stripped = GENERIC_PARAMS.replace_all(class_name, "");
	ANONYMOUS_CLASS.replace_all(&stripped, "").into_owned()
}

fn normalize_method_name(method_name: &str) -> String {
	let stripped = CLOSURE_MARKERS.replace_all(method_name, "");
	stripped
		.strip_suffix("_async")
		.unwrap_or(&stripped)
		.to_string()
}

fn normalize_file_name(file_name: &str) -> String {
	// Last path segment, whichever separator the platform used.
	let mut name = file_name.rsplit('/').next().unwrap_or(file_name);
	name = name.rsplit('\\').next().unwrap_or(name);

	// Query strings and fragments (web bundles).
	let mut name = name.split('?').next().unwrap_or(name);
	name = name.split('#').next().unwrap_or(name);

	BUILD_HASH.replace(name, ".$1").into_owned()
}

/// The most relevant frame for display: the first one that is neither a
/// native frame nor a recognizable framework frame, falling back to the
/// first frame of the trace.
pub fn top_frame(frames: &[StackFrame]) -> Option<&StackFrame> {
	frames
		.iter()
		.find(|f| !f.native && !is_framework_frame(f))
		.or_else(|| frames.first())
}

const FRAMEWORK_PATTERNS: &[&str] = &[
	"dart:async",
	"dart:core",
	"package:flutter/",
	"java.lang.",
	"android.os.",
	"kotlinx.coroutines",
	"react-dom",
	"zone.js",
	"angular",
];

fn is_framework_frame(frame: &StackFrame) -> bool {
	let haystack = frame
		.class_name
		.as_deref()
		.filter(|c| !c.is_empty())
		.unwrap_or(&frame.file_name);
	FRAMEWORK_PATTERNS.iter().any(|p| haystack.contains(p))
}

/// Short display form of an error message, capped at 200 characters.
pub fn summarize_message(message: &str) -> String {
	const MAX_CHARS: usize = 200;
	let mut iter = message.char_indices();
	match iter.nth(MAX_CHARS) {
		None => message.to_string(),
		Some((idx, _)) => format!("{}...", &message[..idx]),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn frame(file: &str, line: u32, method: &str) -> StackFrame {
		StackFrame {
			file_name: file.to_string(),
			line_number: line,
			method_name: method.to_string(),
			..Default::default()
		}
	}

	fn native_frame(file: &str) -> StackFrame {
		StackFrame {
			file_name: file.to_string(),
			native: true,
			..Default::default()
		}
	}

	#[test]
	fn fingerprint_is_16_lowercase_hex() {
		let fp = compute_fingerprint("FormatException", &[frame("a.dart", 10, "parse")]);
		assert_eq!(fp.len(), 16);
		assert!(fp
			.chars()
			.all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
	}

	#[test]
	fn fingerprint_is_deterministic() {
		let frames = vec![frame("a.dart", 10, "parse"), frame("b.dart", 3, "decode")];
		assert_eq!(
			compute_fingerprint("FormatException", &frames),
			compute_fingerprint("FormatException", &frames)
		);
	}

	#[test]
	fn line_numbers_do_not_contribute() {
		let fp1 = compute_fingerprint("E", &[frame("a.dart", 10, "parse")]);
		let fp2 = compute_fingerprint("E", &[frame("a.dart", 99, "parse")]);
		assert_eq!(fp1, fp2);
	}

	#[test]
	fn column_numbers_do_not_contribute() {
		let mut with_column = frame("a.dart", 10, "parse");
		with_column.column_number = Some(7);
		let fp1 = compute_fingerprint("E", &[with_column]);
		let fp2 = compute_fingerprint("E", &[frame("a.dart", 10, "parse")]);
		assert_eq!(fp1, fp2);
	}

	#[test]
	fn native_frames_are_skipped() {
		let fp1 = compute_fingerprint(
			"E",
			&[native_frame("dart:async"), frame("a.dart", 1, "m")],
		);
		let fp2 = compute_fingerprint("E", &[frame("a.dart", 1, "m")]);
		assert_eq!(fp1, fp2);
	}

	#[test]
	fn native_frames_never_consume_a_slot() {
		let deep: Vec<StackFrame> = (0..6)
			.map(|i| frame(&format!("f{i}.dart"), i, &format!("m{i}")))
			.collect();
		let mut interleaved = Vec::new();
		for f in &deep {
			interleaved.push(native_frame("dart:core"));
			interleaved.push(f.clone());
		}
		assert_eq!(
			compute_fingerprint("E", &deep),
			compute_fingerprint("E", &interleaved)
		);
	}

	#[test]
	fn only_first_five_non_native_frames_contribute() {
		let mut frames: Vec<StackFrame> = (0..5)
			.map(|i| frame(&format!("f{i}.dart"), i, &format!("m{i}")))
			.collect();
		let base = compute_fingerprint("E", &frames);
		frames.push(frame("tail.dart", 1, "tail"));
		assert_eq!(base, compute_fingerprint("E", &frames));
	}

	#[test]
	fn all_native_traces_reduce_to_error_type() {
		let fp1 = compute_fingerprint("E", &[native_frame("dart:async")]);
		let fp2 = compute_fingerprint("E", &[]);
		assert_eq!(fp1, fp2);
	}

	#[test]
	fn different_error_types_never_merge() {
		let frames = vec![frame("a.dart", 1, "m")];
		assert_ne!(
			compute_fingerprint("A", &frames),
			compute_fingerprint("B", &frames)
		);
	}

	#[test]
	fn build_hashes_are_collapsed() {
		let fp1 = compute_fingerprint("E", &[frame("foo.ab12cd34.dart", 1, "m")]);
		let fp2 = compute_fingerprint("E", &[frame("foo.ffffffff.dart", 1, "m")]);
		let fp3 = compute_fingerprint("E", &[frame("foo.dart", 1, "m")]);
		assert_eq!(fp1, fp2);
		assert_eq!(fp1, fp3);
	}

	#[test]
	fn paths_and_query_strings_are_stripped() {
		let fp1 = compute_fingerprint("E", &[frame("/build/web/app.js?v=3", 1, "m")]);
		let fp2 = compute_fingerprint("E", &[frame(r"C:\build\web\app.js#main", 1, "m")]);
		assert_eq!(fp1, fp2);
	}

	#[test]
	fn class_normalization_strips_generics_and_anonymous_markers() {
		assert_eq!(normalize_class_name("List<MyItem>"), "List");
		assert_eq!(normalize_class_name("Handler$1"), "Handler");
		assert_eq!(normalize_class_name("Widget$anonState"), "Widget");
	}

	#[test]
	fn method_normalization_strips_closure_and_async_markers() {
		assert_eq!(normalize_method_name("build_closure2"), "build");
		assert_eq!(normalize_method_name("render$3"), "render");
		assert_eq!(normalize_method_name("retry_12"), "retry");
		assert_eq!(normalize_method_name("load_async"), "load");
	}

	#[test]
	fn top_frame_skips_native_and_framework_frames() {
		let frames = vec![
			native_frame("dart:async"),
			frame("package:flutter/widgets.dart", 4, "build"),
			frame("checkout.dart", 12, "submitOrder"),
		];
		let top = top_frame(&frames).unwrap();
		assert_eq!(top.method_name, "submitOrder");
	}

	#[test]
	fn top_frame_falls_back_to_first_frame() {
		let frames = vec![native_frame("dart:async")];
		assert!(top_frame(&frames).unwrap().native);
		assert!(top_frame(&[]).is_none());
	}

	#[test]
	fn summarize_message_truncates_long_text() {
		let long = "x".repeat(500);
		let summary = summarize_message(&long);
		assert_eq!(summary.chars().count(), 203);
		assert!(summary.ends_with("..."));
		assert_eq!(summarize_message("short"), "short");
	}

	proptest! {
		#[test]
		fn fingerprint_shape_holds_for_any_input(
			error_type in ".{0,40}",
			files in proptest::collection::vec("[a-z./\\\\?#$<>0-9_]{0,30}", 0..8),
		) {
			let frames: Vec<StackFrame> = files
				.iter()
				.map(|f| frame(f, 0, "m"))
				.collect();
			let fp = compute_fingerprint(&error_type, &frames);
			prop_assert_eq!(fp.len(), 16);
			prop_assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
		}

		#[test]
		fn line_number_invariance(
			lines_a in proptest::collection::vec(any::<u32>(), 3),
			lines_b in proptest::collection::vec(any::<u32>(), 3),
		) {
			let make = |lines: &[u32]| -> Vec<StackFrame> {
				lines
					.iter()
					.enumerate()
					.map(|(i, line)| frame(&format!("f{i}.dart"), *line, &format!("m{i}")))
					.collect()
			};
			prop_assert_eq!(
				compute_fingerprint("E", &make(&lines_a)),
				compute_fingerprint("E", &make(&lines_b))
			);
		}
	}
}
