// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Request, response and webhook payload types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GithubAppError;

// ---------------------------------------------------------------------------
// Repository contents
// ---------------------------------------------------------------------------

/// A file returned by the contents API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileContents {
	pub name: String,
	pub path: String,
	pub sha: String,
	pub size: u64,
	/// Content encoding, `base64` for regular files.
	#[serde(default = "default_encoding")]
	pub encoding: String,
	/// Encoded content. GitHub wraps base64 at 60 columns.
	#[serde(default)]
	pub content: String,
}

fn default_encoding() -> String {
	"base64".to_string()
}

impl FileContents {
	pub fn decode_content(&self) -> Result<Vec<u8>, GithubAppError> {
		use base64::{engine::general_purpose::STANDARD, Engine};

		if self.encoding != "base64" {
			return Err(GithubAppError::InvalidResponse(format!(
				"unsupported content encoding '{}' for {}",
				self.encoding, self.path
			)));
		}

		let compact: String = self
			.content
			.chars()
			.filter(|c| !c.is_whitespace())
			.collect();
		STANDARD
			.decode(compact)
			.map_err(|e| GithubAppError::InvalidResponse(format!("invalid base64 in {}: {e}", self.path)))
	}

	pub fn decode_content_string(&self) -> Result<String, GithubAppError> {
		String::from_utf8(self.decode_content()?)
			.map_err(|e| GithubAppError::InvalidResponse(format!("{} is not UTF-8: {e}", self.path)))
	}
}

// ---------------------------------------------------------------------------
// Check runs and comments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckRunStatus {
	Queued,
	InProgress,
	Completed,
}

/// The subset of check run conclusions FeaturePulse publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckRunConclusion {
	Success,
	Failure,
	Neutral,
}

impl CheckRunConclusion {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Success => "success",
			Self::Failure => "failure",
			Self::Neutral => "neutral",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunOutput {
	pub title: String,
	pub summary: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub text: Option<String>,
}

/// Body of `POST /repos/{owner}/{repo}/check-runs`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateCheckRunRequest {
	pub name: String,
	pub head_sha: String,
	pub status: CheckRunStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub conclusion: Option<CheckRunConclusion>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub completed_at: Option<DateTime<Utc>>,
	pub output: CheckRunOutput,
}

impl CreateCheckRunRequest {
	/// A check run that is already finished with `conclusion`.
	pub fn completed(
		name: impl Into<String>,
		head_sha: impl Into<String>,
		conclusion: CheckRunConclusion,
		output: CheckRunOutput,
	) -> Self {
		Self {
			name: name.into(),
			head_sha: head_sha.into(),
			status: CheckRunStatus::Completed,
			conclusion: Some(conclusion),
			completed_at: Some(Utc::now()),
			output,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRun {
	pub id: i64,
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub html_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueComment {
	pub id: i64,
	#[serde(default)]
	pub html_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateIssueCommentRequest<'a> {
	pub(crate) body: &'a str,
}

/// Access token response from `POST /app/installations/{id}/access_tokens`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenResponse {
	pub token: String,
	/// ISO8601 expiry timestamp.
	pub expires_at: String,
}

// ---------------------------------------------------------------------------
// Webhook payloads
// ---------------------------------------------------------------------------

/// Account that owns a GitHub App installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationAccount {
	pub id: i64,
	pub login: String,
	/// "User" or "Organization".
	#[serde(rename = "type", default)]
	pub account_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookInstallation {
	pub id: i64,
	#[serde(default)]
	pub account: Option<InstallationAccount>,
}

/// `installation` event body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationWebhookPayload {
	pub action: String,
	pub installation: WebhookInstallation,
}

impl InstallationWebhookPayload {
	/// Login of the installing account, `"unknown"` when GitHub omits it.
	pub fn account_login(&self) -> &str {
		self.installation
			.account
			.as_ref()
			.map(|a| a.login.as_str())
			.unwrap_or("unknown")
	}
}

/// The installation reference GitHub attaches to repository events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookInstallationRef {
	pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryOwner {
	pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookRepository {
	pub id: i64,
	/// Repository name (not full name).
	pub name: String,
	/// `owner/repo`.
	pub full_name: String,
	pub owner: RepositoryOwner,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookCommitRef {
	pub sha: String,
	#[serde(rename = "ref", default)]
	pub git_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPullRequest {
	pub number: u64,
	pub head: WebhookCommitRef,
	#[serde(default)]
	pub title: Option<String>,
	#[serde(default)]
	pub html_url: Option<String>,
}

/// `pull_request` event body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestWebhookPayload {
	pub action: String,
	pub number: u64,
	pub pull_request: WebhookPullRequest,
	pub repository: WebhookRepository,
	/// Absent when the delivery did not come through an App installation.
	#[serde(default)]
	pub installation: Option<WebhookInstallationRef>,
}
