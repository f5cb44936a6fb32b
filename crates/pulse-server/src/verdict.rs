// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Verdict engine: turns an intent document and a diff into a score and decision.
//!
//! The model is asked for a single JSON object `{score, decision, summary}` and its
//! answer is validated strictly. Every failure mode (missing credentials, transport
//! errors, timeouts, malformed or out-of-contract output) collapses into
//! [`Verdict::fallback`], so [`VerdictEngine::evaluate`] never fails.

use std::sync::Arc;
use std::time::Duration;

use pulse_server_db::Decision;
use pulse_server_llm_openrouter::{CompletionClient, CompletionRequest, LlmError};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

pub const FALLBACK_SUMMARY: &str = "AI Analysis failed. Please check logs.";
pub const TRUNCATION_MARKER: &str = "\n... [diff truncated]";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
	pub score: u8,
	pub decision: Decision,
	pub summary: String,
}

impl Verdict {
	/// `{0, WARN, "AI Analysis failed. Please check logs."}`.
	pub fn fallback() -> Self {
		Self {
			score: 0,
			decision: Decision::Warn,
			summary: FALLBACK_SUMMARY.to_string(),
		}
	}
}

/// Why a model answer could not be turned into a [`Verdict`].
#[derive(Debug, thiserror::Error)]
pub enum VerdictError {
	#[error("no completion service is configured")]
	Unconfigured,

	#[error("completion call timed out after {0:?}")]
	Timeout(Duration),

	#[error("completion call failed: {0}")]
	Completion(#[from] LlmError),

	#[error("response is not JSON: {0}")]
	NotJson(#[from] serde_json::Error),

	#[error("response is not a JSON object")]
	NotAnObject,

	#[error("response is missing `{0}`")]
	MissingField(&'static str),

	#[error("`score` must be an integer, got {0}")]
	ScoreNotInteger(Value),

	#[error("`score` {0} is outside 0..=100")]
	ScoreOutOfRange(i64),

	#[error("`decision` must be APPROVE, WARN or BLOCK, got {0}")]
	UnknownDecision(Value),

	#[error("`summary` must be a non-empty string")]
	EmptySummary,
}

/// First `max_chars` characters of `diff`, and whether anything was cut.
pub fn truncate_diff(diff: &str, max_chars: usize) -> (&str, bool) {
	match diff.char_indices().nth(max_chars) {
		Some((byte_idx, _)) => (&diff[..byte_idx], true),
		None => (diff, false),
	}
}

pub fn build_prompt(intent: &str, diff: &str, max_diff_chars: usize) -> String {
	let (diff, truncated) = truncate_diff(diff, max_diff_chars);
	let marker = if truncated { TRUNCATION_MARKER } else { "" };

	format!(
		r#"You are FeaturePulse, a strict code guardian.

GOAL: Compare the CODE DIFF against the PRODUCT INTENT.

[PRODUCT INTENT]
{intent}

[CODE DIFF]
{diff}{marker}

INSTRUCTIONS:
1. Analyze whether the code aligns with the intent.
2. Look for security risks or scope creep (features nobody asked for).
3. Output a single JSON object ONLY. No markdown, no code fences, no extra keys.

JSON SCHEMA:
{{
  "score": integer between 0 and 100,
  "decision": "APPROVE" | "WARN" | "BLOCK",
  "summary": "A short, helpful explanation of why."
}}
"#
	)
}

/// Validate the model's message content against the verdict contract.
///
/// Keys other than `score`, `decision` and `summary` are ignored.
pub fn parse_verdict(content: &str) -> Result<Verdict, VerdictError> {
	let value: Value = serde_json::from_str(content.trim())?;
	let object = value.as_object().ok_or(VerdictError::NotAnObject)?;

	let score = object
		.get("score")
		.ok_or(VerdictError::MissingField("score"))?;
	let score = score
		.as_i64()
		.ok_or_else(|| VerdictError::ScoreNotInteger(score.clone()))?;
	let score = u8::try_from(score)
		.ok()
		.filter(|s| *s <= 100)
		.ok_or(VerdictError::ScoreOutOfRange(score))?;

	let decision = object
		.get("decision")
		.ok_or(VerdictError::MissingField("decision"))?;
	let decision = decision
		.as_str()
		.and_then(|d| d.parse::<Decision>().ok())
		.ok_or_else(|| VerdictError::UnknownDecision(decision.clone()))?;

	let summary = object
		.get("summary")
		.ok_or(VerdictError::MissingField("summary"))?
		.as_str()
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.ok_or(VerdictError::EmptySummary)?;

	Ok(Verdict {
		score,
		decision,
		summary: summary.to_string(),
	})
}

#[derive(Clone)]
pub struct VerdictEngine {
	client: Option<Arc<dyn CompletionClient>>,
	max_diff_chars: usize,
	timeout: Duration,
}

impl VerdictEngine {
	/// `client: None` means every evaluation returns the fallback.
	pub fn new(
		client: Option<Arc<dyn CompletionClient>>,
		max_diff_chars: usize,
		timeout: Duration,
	) -> Self {
		Self {
			client,
			max_diff_chars,
			timeout,
		}
	}

	pub fn is_configured(&self) -> bool {
		self.client.is_some()
	}

	#[instrument(skip_all, fields(intent_chars = intent.len(), diff_chars = diff.len()))]
	pub async fn evaluate(&self, intent: &str, diff: &str) -> Verdict {
		match self.try_evaluate(intent, diff).await {
			Ok(verdict) => {
				info!(
					score = verdict.score,
					decision = %verdict.decision,
					"verdict: model answer accepted"
				);
				verdict
			}
			Err(e) => {
				warn!(error = %e, "verdict: falling back to safe default");
				Verdict::fallback()
			}
		}
	}

	async fn try_evaluate(&self, intent: &str, diff: &str) -> Result<Verdict, VerdictError> {
		let client = self.client.as_ref().ok_or(VerdictError::Unconfigured)?;
		let prompt = build_prompt(intent, diff, self.max_diff_chars);
		debug!(prompt_chars = prompt.len(), "verdict: sending prompt");

		let response = tokio::time::timeout(
			self.timeout,
			client.complete(CompletionRequest::json_prompt(prompt)),
		)
		.await
		.map_err(|_| VerdictError::Timeout(self.timeout))??;

		parse_verdict(&response.content)
	}
}
