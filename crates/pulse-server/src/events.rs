// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Typed webhook events.
//!
//! A verified delivery is parsed exactly once here, at the router boundary.
//! Handlers only ever see [`WebhookEvent`], never raw JSON.

use pulse_server_github_app::{InstallationWebhookPayload, PullRequestWebhookPayload};
use serde::Deserialize;

/// Pull request actions that trigger an analysis.
pub const ANALYZED_PR_ACTIONS: [&str; 2] = ["opened", "synchronize"];

/// Everything the analysis pipeline needs to know about one pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestTarget {
	pub installation_id: i64,
	pub owner: String,
	pub repo: String,
	pub pr_number: u64,
	pub head_sha: String,
}

impl PullRequestTarget {
	pub fn full_name(&self) -> String {
		format!("{}/{}", self.owner, self.repo)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationCreated {
	pub installation_id: i64,
	pub account_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
	/// `pull_request.opened` or `pull_request.synchronize`.
	PullRequest(PullRequestTarget),
	/// `installation.created`.
	InstallationCreated(InstallationCreated),
	/// Any other event/action pair. Nothing runs.
	Ignored {
		event: String,
		action: Option<String>,
	},
}

impl WebhookEvent {
	pub fn kind(&self) -> &'static str {
		match self {
			WebhookEvent::PullRequest(_) => "pull_request",
			WebhookEvent::InstallationCreated(_) => "installation.created",
			WebhookEvent::Ignored { .. } => "ignored",
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
	#[error("invalid {event} payload: {source}")]
	Malformed {
		event: String,
		#[source]
		source: serde_json::Error,
	},

	#[error("pull request #{pr_number} payload has no installation")]
	MissingInstallation { pr_number: u64 },

	#[error("pull request #{pr_number} payload has no head commit sha")]
	MissingHeadSha { pr_number: u64 },
}

#[derive(Deserialize)]
struct ActionOnly {
	#[serde(default)]
	action: Option<String>,
}

/// Map a verified `(X-GitHub-Event, body)` pair onto a [`WebhookEvent`].
pub fn route_event(event_name: &str, body: &[u8]) -> Result<WebhookEvent, PayloadError> {
	let malformed = |source| PayloadError::Malformed {
		event: event_name.to_string(),
		source,
	};

	let action = serde_json::from_slice::<ActionOnly>(body)
		.map_err(malformed)?
		.action;

	match (event_name, action.as_deref()) {
		("pull_request", Some(a)) if ANALYZED_PR_ACTIONS.contains(&a) => {
			let payload: PullRequestWebhookPayload =
				serde_json::from_slice(body).map_err(malformed)?;
			pull_request_target(payload).map(WebhookEvent::PullRequest)
		}
		("installation", Some("created")) => {
			let payload: InstallationWebhookPayload =
				serde_json::from_slice(body).map_err(malformed)?;
			Ok(WebhookEvent::InstallationCreated(InstallationCreated {
				installation_id: payload.installation.id,
				account_name: payload.account_login().to_string(),
			}))
		}
		_ => Ok(WebhookEvent::Ignored {
			event: event_name.to_string(),
			action,
		}),
	}
}

fn pull_request_target(payload: PullRequestWebhookPayload) -> Result<PullRequestTarget, PayloadError> {
	let pr_number = payload.pull_request.number;

	let installation = payload
		.installation
		.ok_or(PayloadError::MissingInstallation { pr_number })?;

	if payload.pull_request.head.sha.is_empty() {
		return Err(PayloadError::MissingHeadSha { pr_number });
	}

	Ok(PullRequestTarget {
		installation_id: installation.id,
		owner: payload.repository.owner.login,
		repo: payload.repository.name,
		pr_number,
		head_sha: payload.pull_request.head.sha,
	})
}
