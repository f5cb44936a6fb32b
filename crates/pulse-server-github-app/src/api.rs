// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The GitHub operations the analysis pipeline depends on.
//!
//! Handlers take `Arc<dyn GithubApi>` so tests can substitute an in-memory
//! implementation for [`GithubAppClient`].

use async_trait::async_trait;

use crate::client::GithubAppClient;
use crate::error::GithubAppError;
use crate::types::{CheckRun, CreateCheckRunRequest, FileContents, IssueComment};

#[async_trait]
pub trait GithubApi: Send + Sync {
	/// `Ok(None)` when the path does not exist on the default branch.
	async fn get_file_contents(
		&self,
		installation_id: i64,
		owner: &str,
		repo: &str,
		path: &str,
	) -> Result<Option<FileContents>, GithubAppError>;

	async fn get_pull_request_diff(
		&self,
		installation_id: i64,
		owner: &str,
		repo: &str,
		pr_number: u64,
	) -> Result<String, GithubAppError>;

	async fn create_issue_comment(
		&self,
		installation_id: i64,
		owner: &str,
		repo: &str,
		issue_number: u64,
		body: &str,
	) -> Result<IssueComment, GithubAppError>;

	async fn create_check_run(
		&self,
		installation_id: i64,
		owner: &str,
		repo: &str,
		request: &CreateCheckRunRequest,
	) -> Result<CheckRun, GithubAppError>;
}

#[async_trait]
impl GithubApi for GithubAppClient {
	async fn get_file_contents(
		&self,
		installation_id: i64,
		owner: &str,
		repo: &str,
		path: &str,
	) -> Result<Option<FileContents>, GithubAppError> {
		GithubAppClient::get_file_contents(self, installation_id, owner, repo, path).await
	}

	async fn get_pull_request_diff(
		&self,
		installation_id: i64,
		owner: &str,
		repo: &str,
		pr_number: u64,
	) -> Result<String, GithubAppError> {
		GithubAppClient::get_pull_request_diff(self, installation_id, owner, repo, pr_number).await
	}

	async fn create_issue_comment(
		&self,
		installation_id: i64,
		owner: &str,
		repo: &str,
		issue_number: u64,
		body: &str,
	) -> Result<IssueComment, GithubAppError> {
		GithubAppClient::create_issue_comment(self, installation_id, owner, repo, issue_number, body)
			.await
	}

	async fn create_check_run(
		&self,
		installation_id: i64,
		owner: &str,
		repo: &str,
		request: &CreateCheckRunRequest,
	) -> Result<CheckRun, GithubAppError> {
		GithubAppClient::create_check_run(self, installation_id, owner, repo, request).await
	}
}
