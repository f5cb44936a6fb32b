// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use pulse_server::events::PullRequestTarget;
use pulse_server::fetcher::Fetcher;
use pulse_server::pipeline::AnalysisPipeline;
use pulse_server::reporter::Reporter;
use pulse_server::verdict::VerdictEngine;
use pulse_server_config::{DEFAULT_CHECK_RUN_NAME, DEFAULT_INTENT_PATHS, DEFAULT_MAX_DIFF_CHARS};
use pulse_server_db::{AnalysisLogRepository, InstallationRepository};
use pulse_server_github_app::{
	CheckRun, CreateCheckRunRequest, FileContents, GithubApi, GithubAppError, IssueComment,
};
use pulse_server_llm_openrouter::{CompletionClient, CompletionRequest, CompletionResponse, LlmError};
use sqlx::SqlitePool;
use tempfile::TempDir;

pub const INSTALLATION_ID: i64 = 4242;
pub const WEBHOOK_SECRET: &str = "it's-a-secret-to-everybody";

#[derive(Debug, Clone)]
pub enum GithubCall {
	GetFile(String),
	GetDiff(u64),
	Comment { pr_number: u64, body: String },
	CheckRun(CreateCheckRunRequest),
}

/// Records every call and answers from canned state.
#[derive(Default)]
pub struct FakeGithub {
	files: Mutex<HashMap<String, String>>,
	broken_paths: Mutex<HashSet<String>>,
	diff: Mutex<Option<String>>,
	fail_check_run: AtomicBool,
	fail_comment: AtomicBool,
	calls: Mutex<Vec<GithubCall>>,
}

impl FakeGithub {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Serve `text` base64-encoded at `path`, wrapped the way GitHub wraps it.
	pub fn with_file(self: Arc<Self>, path: &str, text: &str) -> Arc<Self> {
		self.with_file_bytes(path, text.as_bytes())
	}

	pub fn with_file_bytes(self: Arc<Self>, path: &str, bytes: &[u8]) -> Arc<Self> {
		let encoded = STANDARD.encode(bytes);
		let wrapped = encoded
			.as_bytes()
			.chunks(60)
			.map(|c| String::from_utf8_lossy(c).into_owned())
			.collect::<Vec<_>>()
			.join("\n");
		self.files.lock().unwrap().insert(path.to_string(), wrapped);
		self
	}

	/// Lookups of `path` fail with a server error.
	pub fn with_broken_path(self: Arc<Self>, path: &str) -> Arc<Self> {
		self.broken_paths.lock().unwrap().insert(path.to_string());
		self
	}

	pub fn with_diff(self: Arc<Self>, diff: &str) -> Arc<Self> {
		*self.diff.lock().unwrap() = Some(diff.to_string());
		self
	}

	pub fn failing_check_run(self: Arc<Self>) -> Arc<Self> {
		self.fail_check_run.store(true, Ordering::SeqCst);
		self
	}

	pub fn failing_comment(self: Arc<Self>) -> Arc<Self> {
		self.fail_comment.store(true, Ordering::SeqCst);
		self
	}

	pub fn calls(&self) -> Vec<GithubCall> {
		self.calls.lock().unwrap().clone()
	}

	pub fn file_lookups(&self) -> Vec<String> {
		self.calls()
			.into_iter()
			.filter_map(|c| match c {
				GithubCall::GetFile(path) => Some(path),
				_ => None,
			})
			.collect()
	}

	pub fn check_runs(&self) -> Vec<CreateCheckRunRequest> {
		self.calls()
			.into_iter()
			.filter_map(|c| match c {
				GithubCall::CheckRun(request) => Some(request),
				_ => None,
			})
			.collect()
	}

	pub fn comments(&self) -> Vec<String> {
		self.calls()
			.into_iter()
			.filter_map(|c| match c {
				GithubCall::Comment { body, .. } => Some(body),
				_ => None,
			})
			.collect()
	}

	pub fn diff_requested(&self) -> bool {
		self.calls()
			.iter()
			.any(|c| matches!(c, GithubCall::GetDiff(_)))
	}

	fn record(&self, call: GithubCall) {
		self.calls.lock().unwrap().push(call);
	}
}

#[async_trait]
impl GithubApi for FakeGithub {
	async fn get_file_contents(
		&self,
		_installation_id: i64,
		_owner: &str,
		_repo: &str,
		path: &str,
	) -> Result<Option<FileContents>, GithubAppError> {
		self.record(GithubCall::GetFile(path.to_string()));

		if self.broken_paths.lock().unwrap().contains(path) {
			return Err(GithubAppError::api_error(500, "Server Error"));
		}

		Ok(self.files.lock().unwrap().get(path).map(|content| FileContents {
			name: path.rsplit('/').next().unwrap_or(path).to_string(),
			path: path.to_string(),
			sha: "0000000".to_string(),
			size: content.len() as u64,
			encoding: "base64".to_string(),
			content: content.clone(),
		}))
	}

	async fn get_pull_request_diff(
		&self,
		_installation_id: i64,
		_owner: &str,
		_repo: &str,
		pr_number: u64,
	) -> Result<String, GithubAppError> {
		self.record(GithubCall::GetDiff(pr_number));
		self.diff
			.lock()
			.unwrap()
			.clone()
			.ok_or_else(|| GithubAppError::api_error(404, "Not Found"))
	}

	async fn create_issue_comment(
		&self,
		_installation_id: i64,
		_owner: &str,
		_repo: &str,
		issue_number: u64,
		body: &str,
	) -> Result<IssueComment, GithubAppError> {
		self.record(GithubCall::Comment {
			pr_number: issue_number,
			body: body.to_string(),
		});
		if self.fail_comment.load(Ordering::SeqCst) {
			return Err(GithubAppError::Forbidden);
		}
		Ok(IssueComment {
			id: 1,
			html_url: None,
		})
	}

	async fn create_check_run(
		&self,
		_installation_id: i64,
		_owner: &str,
		_repo: &str,
		request: &CreateCheckRunRequest,
	) -> Result<CheckRun, GithubAppError> {
		self.record(GithubCall::CheckRun(request.clone()));
		if self.fail_check_run.load(Ordering::SeqCst) {
			return Err(GithubAppError::api_error(422, "head_sha is not a valid commit"));
		}
		Ok(CheckRun {
			id: 7,
			name: request.name.clone(),
			html_url: None,
		})
	}
}

/// Replies with fixed content, optionally after a delay.
pub struct FakeCompletion {
	reply: String,
	delay: Duration,
	prompts: Mutex<Vec<String>>,
}

impl FakeCompletion {
	pub fn replying(content: &str) -> Arc<Self> {
		Arc::new(Self {
			reply: content.to_string(),
			delay: Duration::ZERO,
			prompts: Mutex::new(Vec::new()),
		})
	}

	pub fn stalling(delay: Duration) -> Arc<Self> {
		Arc::new(Self {
			reply: r#"{"score": 100, "decision": "APPROVE", "summary": "too late"}"#.to_string(),
			delay,
			prompts: Mutex::new(Vec::new()),
		})
	}

	pub fn prompts(&self) -> Vec<String> {
		self.prompts.lock().unwrap().clone()
	}
}

#[async_trait]
impl CompletionClient for FakeCompletion {
	async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
		let prompt = request
			.messages
			.iter()
			.filter_map(|m| m.content.clone())
			.collect::<Vec<_>>()
			.join("\n");
		self.prompts.lock().unwrap().push(prompt);

		tokio::time::sleep(self.delay).await;
		Ok(CompletionResponse {
			content: self.reply.clone(),
			model: Some("fake/model".to_string()),
			usage: None,
		})
	}
}

/// File-backed pool with migrations applied. Keep the `TempDir` alive.
pub async fn test_pool() -> (SqlitePool, TempDir) {
	let dir = tempfile::tempdir().unwrap();
	let url = format!("sqlite:{}", dir.path().join("featurepulse.db").display());
	let pool = pulse_server_db::create_pool(&url).await.unwrap();
	pulse_server_db::run_migrations(&pool).await.unwrap();
	(pool, dir)
}

pub async fn install(pool: &SqlitePool, installation_id: i64, account: &str) {
	InstallationRepository::new(pool.clone())
		.record_installation(installation_id, account)
		.await
		.unwrap();
}

pub fn intent_paths() -> Vec<String> {
	DEFAULT_INTENT_PATHS.iter().map(|p| p.to_string()).collect()
}

pub fn target(pr_number: u64) -> PullRequestTarget {
	PullRequestTarget {
		installation_id: INSTALLATION_ID,
		owner: "acme".to_string(),
		repo: "widgets".to_string(),
		pr_number,
		head_sha: format!("{pr_number:040x}"),
	}
}

pub fn pipeline(
	github: Arc<FakeGithub>,
	completion: Option<Arc<FakeCompletion>>,
	pool: &SqlitePool,
	timeout: Duration,
) -> AnalysisPipeline {
	let github: Arc<dyn GithubApi> = github;
	AnalysisPipeline::new(
		Fetcher::new(Arc::clone(&github), intent_paths()),
		VerdictEngine::new(
			completion.map(|c| c as Arc<dyn CompletionClient>),
			DEFAULT_MAX_DIFF_CHARS,
			timeout,
		),
		Reporter::new(github, DEFAULT_CHECK_RUN_NAME),
		Arc::new(AnalysisLogRepository::new(pool.clone())),
	)
}

/// Router state wired to the fakes, with the webhook side enabled.
pub fn app_state(
	pool: &SqlitePool,
	github: Arc<FakeGithub>,
	completion: Option<Arc<FakeCompletion>>,
) -> pulse_server::AppState {
	let github: Arc<dyn GithubApi> = github;
	pulse_server::AppState::new(
		pool.clone(),
		pulse_server::Integrations {
			github: Some((
				github,
				pulse_common_config::Secret::new(WEBHOOK_SECRET.to_string()),
			)),
			completion: completion.map(|c| c as Arc<dyn CompletionClient>),
		},
		&pulse_server_config::AnalysisConfig::default(),
		Duration::from_secs(5),
	)
}

/// Wait until every spawned delivery handler has finished.
pub async fn settle(state: &pulse_server::AppState, expected_finished: u64) {
	let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
	loop {
		let stats = state.deliveries.snapshot();
		if stats.in_flight == 0 && stats.completed + stats.failed >= expected_finished {
			return;
		}
		assert!(
			tokio::time::Instant::now() < deadline,
			"deliveries did not settle: {stats:?}"
		);
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
}
