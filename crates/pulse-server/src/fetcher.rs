// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Intent document and pull request diff retrieval.

use std::sync::Arc;

use pulse_server_github_app::{GithubApi, GithubAppError};
use tracing::{debug, instrument, warn};

use crate::events::PullRequestTarget;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
	#[error("failed to fetch diff for {repo}#{pr_number}: {source}")]
	Diff {
		repo: String,
		pr_number: u64,
		#[source]
		source: GithubAppError,
	},
}

#[derive(Clone)]
pub struct Fetcher {
	github: Arc<dyn GithubApi>,
	intent_paths: Vec<String>,
}

impl Fetcher {
	pub fn new(github: Arc<dyn GithubApi>, intent_paths: Vec<String>) -> Self {
		Self {
			github,
			intent_paths,
		}
	}

	/// The first intent document found among the configured paths.
	///
	/// A path that is missing, unreadable, or not valid base64 is skipped. Bytes
	/// that are not UTF-8 are replaced rather than discarding the document.
	/// `None` means the repository has not opted in.
	#[instrument(skip(self, target), fields(repo = %target.full_name()))]
	pub async fn fetch_intent(&self, target: &PullRequestTarget) -> Option<String> {
		for path in &self.intent_paths {
			let contents = match self
				.github
				.get_file_contents(target.installation_id, &target.owner, &target.repo, path)
				.await
			{
				Ok(Some(contents)) => contents,
				Ok(None) => {
					debug!(path = %path, "intent: not found");
					continue;
				}
				Err(e) => {
					warn!(path = %path, error = %e, "intent: lookup failed, trying next path");
					continue;
				}
			};

			match contents.decode_content() {
				Ok(bytes) => {
					let text = String::from_utf8(bytes).unwrap_or_else(|e| {
						warn!(
							path = %path,
							valid_up_to = e.utf8_error().valid_up_to(),
							"intent: not valid UTF-8, replacing invalid bytes"
						);
						String::from_utf8_lossy(e.as_bytes()).into_owned()
					});
					debug!(path = %path, chars = text.len(), "intent: found");
					return Some(text);
				}
				Err(e) => {
					warn!(path = %path, error = %e, "intent: undecodable content, trying next path");
				}
			}
		}

		None
	}

	#[instrument(skip(self, target), fields(repo = %target.full_name(), pr_number = target.pr_number))]
	pub async fn fetch_diff(&self, target: &PullRequestTarget) -> Result<String, FetchError> {
		self.github
			.get_pull_request_diff(
				target.installation_id,
				&target.owner,
				&target.repo,
				target.pr_number,
			)
			.await
			.map_err(|source| FetchError::Diff {
				repo: target.full_name(),
				pr_number: target.pr_number,
				source,
			})
	}
}
