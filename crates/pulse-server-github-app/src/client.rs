// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! GitHub App client implementation with JWT authentication and token caching.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::config::GithubAppConfig;
use crate::error::GithubAppError;
use crate::jwt::{generate_app_jwt, JWT_VALIDITY};
use crate::types::{
	AccessTokenResponse, CheckRun, CreateCheckRunRequest, CreateIssueCommentRequest, FileContents,
	IssueComment,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(120);
const JWT_REFRESH_MARGIN: Duration = Duration::from_secs(30);

const ACCEPT_JSON: &str = "application/vnd.github+json";
const ACCEPT_DIFF: &str = "application/vnd.github.diff";
const API_VERSION: &str = "2022-11-28";

struct CachedToken {
	token: String,
	expires_at: Instant,
}

impl CachedToken {
	fn new(token: String, valid_for: Duration) -> Self {
		Self {
			token,
			expires_at: Instant::now() + valid_for,
		}
	}

	fn is_valid(&self, margin: Duration) -> bool {
		Instant::now() + margin < self.expires_at
	}
}

/// Client for the GitHub REST API, authenticated as a GitHub App.
///
/// App JWTs and per-installation access tokens are cached. Concurrent callers
/// for the same installation share one token fetch. A 401 on an installation
/// call drops the cached token and repeats the call once with a fresh one;
/// no other failure is repeated.
#[derive(Clone)]
pub struct GithubAppClient {
	http_client: Client,
	config: GithubAppConfig,
	app_jwt_cache: Arc<Mutex<Option<CachedToken>>>,
	installation_token_cache: Arc<Mutex<HashMap<i64, CachedToken>>>,
	app_jwt_lock: Arc<Mutex<()>>,
	installation_locks: Arc<Mutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl GithubAppClient {
	pub fn new(config: GithubAppConfig) -> Result<Self, GithubAppError> {
		let http_client = pulse_common_http::builder_with_timeout(REQUEST_TIMEOUT)
			.build()
			.map_err(|e| GithubAppError::Config(format!("Failed to create HTTP client: {e}")))?;

		info!(
				app_id = config.app_id(),
				base_url = %config.base_url(),
				"Created GitHub App client"
		);

		Ok(Self {
			http_client,
			config,
			app_jwt_cache: Arc::new(Mutex::new(None)),
			installation_token_cache: Arc::new(Mutex::new(HashMap::new())),
			app_jwt_lock: Arc::new(Mutex::new(())),
			installation_locks: Arc::new(Mutex::new(HashMap::new())),
		})
	}

	pub fn webhook_secret(&self) -> Option<&str> {
		self.config.webhook_secret()
	}

	pub fn app_id(&self) -> u64 {
		self.config.app_id()
	}

	async fn get_installation_lock(&self, installation_id: i64) -> Arc<Mutex<()>> {
		let mut locks = self.installation_locks.lock().await;
		locks
			.entry(installation_id)
			.or_insert_with(|| Arc::new(Mutex::new(())))
			.clone()
	}

	async fn invalidate_installation_token(&self, installation_id: i64) {
		let mut cache = self.installation_token_cache.lock().await;
		if cache.remove(&installation_id).is_some() {
			info!(installation_id, "Invalidated installation token cache");
		}
	}

	async fn invalidate_app_jwt(&self) {
		let mut cache = self.app_jwt_cache.lock().await;
		if cache.take().is_some() {
			info!("Invalidated App JWT cache");
		}
	}

	async fn cached_app_jwt(&self) -> Option<String> {
		let cache = self.app_jwt_cache.lock().await;
		cache
			.as_ref()
			.filter(|cached| cached.is_valid(JWT_REFRESH_MARGIN))
			.map(|cached| cached.token.clone())
	}

	#[instrument(skip(self))]
	async fn get_app_jwt(&self) -> Result<String, GithubAppError> {
		if let Some(jwt) = self.cached_app_jwt().await {
			trace!("Using cached App JWT");
			return Ok(jwt);
		}

		let _guard = self.app_jwt_lock.lock().await;

		if let Some(jwt) = self.cached_app_jwt().await {
			trace!("Using cached App JWT (post-lock)");
			return Ok(jwt);
		}

		debug!(app_id = self.config.app_id(), "Generating new App JWT");
		let jwt = generate_app_jwt(self.config.app_id(), self.config.private_key_pem())?;

		let mut cache = self.app_jwt_cache.lock().await;
		*cache = Some(CachedToken::new(jwt.clone(), JWT_VALIDITY));

		Ok(jwt)
	}

	async fn cached_installation_token(&self, installation_id: i64) -> Option<String> {
		let cache = self.installation_token_cache.lock().await;
		cache
			.get(&installation_id)
			.filter(|cached| cached.is_valid(TOKEN_REFRESH_MARGIN))
			.map(|cached| cached.token.clone())
	}

	#[instrument(skip(self))]
	async fn get_installation_token(&self, installation_id: i64) -> Result<String, GithubAppError> {
		if let Some(token) = self.cached_installation_token(installation_id).await {
			trace!(installation_id, "Using cached installation token");
			return Ok(token);
		}

		let lock = self.get_installation_lock(installation_id).await;
		let result = {
			let _guard = lock.lock().await;
			self.refresh_installation_token(installation_id).await
		};
		self.release_installation_lock(installation_id, lock).await;
		result
	}

	/// Caller holds the per-installation lock.
	async fn refresh_installation_token(&self, installation_id: i64) -> Result<String, GithubAppError> {
		if let Some(token) = self.cached_installation_token(installation_id).await {
			trace!(installation_id, "Using cached installation token (post-lock)");
			return Ok(token);
		}

		debug!(installation_id, "Fetching new installation token");
		let (token, valid_for) = self.fetch_installation_token(installation_id).await?;

		let mut cache = self.installation_token_cache.lock().await;
		cache.insert(installation_id, CachedToken::new(token.clone(), valid_for));

		info!(installation_id, "Installation token refreshed");
		Ok(token)
	}

	/// Drop the map's lock entry once no other caller is waiting on it.
	async fn release_installation_lock(&self, installation_id: i64, lock: Arc<Mutex<()>>) {
		let mut locks = self.installation_locks.lock().await;
		// One reference held by the map, one by `lock`.
		if Arc::strong_count(&lock) <= 2 {
			locks.remove(&installation_id);
		}
	}

	async fn fetch_installation_token(
		&self,
		installation_id: i64,
	) -> Result<(String, Duration), GithubAppError> {
		let jwt = self.get_app_jwt().await?;
		let url = self.endpoint(&format!("app/installations/{installation_id}/access_tokens"))?;

		let response = send(self.request(Method::POST, url, &jwt, ACCEPT_JSON)).await?;

		let response = match ensure_success(response).await {
			Ok(response) => response,
			Err(GithubAppError::Unauthorized) => {
				self.invalidate_app_jwt().await;
				return Err(GithubAppError::Unauthorized);
			}
			Err(e) => return Err(e),
		};

		let token_response: AccessTokenResponse = response.json().await.map_err(|e| {
			error!(error = %e, "Failed to parse access token response");
			GithubAppError::InvalidResponse(format!("JSON parse error: {e}"))
		})?;

		let valid_for = parse_expiry_duration(&token_response.expires_at)?;

		Ok((token_response.token, valid_for))
	}

	/// Run `op` with an installation token, re-issuing the token once on 401.
	async fn with_installation_token<T, F, Fut>(
		&self,
		installation_id: i64,
		op: F,
	) -> Result<T, GithubAppError>
	where
		F: Fn(String) -> Fut,
		Fut: Future<Output = Result<T, GithubAppError>>,
	{
		let token = self.get_installation_token(installation_id).await?;

		match op(token).await {
			Err(GithubAppError::Unauthorized) => {
				info!(installation_id, "Got 401, refreshing installation token");
				self.invalidate_installation_token(installation_id).await;
				let fresh_token = self.get_installation_token(installation_id).await?;
				op(fresh_token).await
			}
			other => other,
		}
	}

	fn endpoint(&self, path: &str) -> Result<Url, GithubAppError> {
		self
			.config
			.base_url()
			.join(path)
			.map_err(|e| GithubAppError::Config(format!("Invalid URL: {e}")))
	}

	fn request(&self, method: Method, url: Url, bearer: &str, accept: &str) -> RequestBuilder {
		self
			.http_client
			.request(method, url)
			.bearer_auth(bearer)
			.header("Accept", accept)
			.header("X-GitHub-Api-Version", API_VERSION)
	}

	/// Fetch a file from the default branch. A 404 is `Ok(None)`.
	#[instrument(skip(self))]
	pub async fn get_file_contents(
		&self,
		installation_id: i64,
		owner: &str,
		repo: &str,
		path: &str,
	) -> Result<Option<FileContents>, GithubAppError> {
		self
			.with_installation_token(installation_id, move |token| {
				self.get_file_contents_inner(token, owner, repo, path)
			})
			.await
	}

	async fn get_file_contents_inner(
		&self,
		token: String,
		owner: &str,
		repo: &str,
		path: &str,
	) -> Result<Option<FileContents>, GithubAppError> {
		// Slashes must survive so nested paths address directories, not one escaped name.
		let path_encoded = path
			.split('/')
			.map(|segment| urlencoding::encode(segment).into_owned())
			.collect::<Vec<_>>()
			.join("/");
		let url = self.endpoint(&format!("repos/{owner}/{repo}/contents/{path_encoded}"))?;

		debug!(url = %url, "Fetching file contents");

		let response = send(self.request(Method::GET, url, &token, ACCEPT_JSON)).await?;
		if response.status() == StatusCode::NOT_FOUND {
			debug!(path, "File not present in repository");
			return Ok(None);
		}
		let response = ensure_success(response).await?;

		let contents: FileContents = response.json().await.map_err(|e| {
			error!(error = %e, "Failed to parse content response");
			GithubAppError::InvalidResponse(format!("JSON parse error: {e}"))
		})?;

		debug!(path = %contents.path, size = contents.size, "File contents fetched");
		Ok(Some(contents))
	}

	/// Unified diff of a pull request.
	#[instrument(skip(self))]
	pub async fn get_pull_request_diff(
		&self,
		installation_id: i64,
		owner: &str,
		repo: &str,
		pr_number: u64,
	) -> Result<String, GithubAppError> {
		self
			.with_installation_token(installation_id, move |token| {
				self.get_pull_request_diff_inner(token, owner, repo, pr_number)
			})
			.await
	}

	async fn get_pull_request_diff_inner(
		&self,
		token: String,
		owner: &str,
		repo: &str,
		pr_number: u64,
	) -> Result<String, GithubAppError> {
		let url = self.endpoint(&format!("repos/{owner}/{repo}/pulls/{pr_number}"))?;

		debug!(url = %url, "Fetching pull request diff");

		let response = send(self.request(Method::GET, url, &token, ACCEPT_DIFF)).await?;
		let response = ensure_success(response).await?;

		let diff = response.text().await.map_err(|e| {
			error!(error = %e, "Failed to read diff body");
			GithubAppError::InvalidResponse(format!("diff body: {e}"))
		})?;

		debug!(bytes = diff.len(), "Pull request diff fetched");
		Ok(diff)
	}

	#[instrument(skip(self, body))]
	pub async fn create_issue_comment(
		&self,
		installation_id: i64,
		owner: &str,
		repo: &str,
		issue_number: u64,
		body: &str,
	) -> Result<IssueComment, GithubAppError> {
		self
			.with_installation_token(installation_id, move |token| {
				self.create_issue_comment_inner(token, owner, repo, issue_number, body)
			})
			.await
	}

	async fn create_issue_comment_inner(
		&self,
		token: String,
		owner: &str,
		repo: &str,
		issue_number: u64,
		body: &str,
	) -> Result<IssueComment, GithubAppError> {
		let url = self.endpoint(&format!(
			"repos/{owner}/{repo}/issues/{issue_number}/comments"
		))?;

		let request = self
			.request(Method::POST, url, &token, ACCEPT_JSON)
			.json(&CreateIssueCommentRequest { body });
		let response = ensure_success(send(request).await?).await?;

		let comment: IssueComment = response.json().await.map_err(|e| {
			error!(error = %e, "Failed to parse comment response");
			GithubAppError::InvalidResponse(format!("JSON parse error: {e}"))
		})?;

		info!(comment_id = comment.id, "Issue comment created");
		Ok(comment)
	}

	#[instrument(skip(self, request), fields(head_sha = %request.head_sha))]
	pub async fn create_check_run(
		&self,
		installation_id: i64,
		owner: &str,
		repo: &str,
		request: &CreateCheckRunRequest,
	) -> Result<CheckRun, GithubAppError> {
		self
			.with_installation_token(installation_id, move |token| {
				self.create_check_run_inner(token, owner, repo, request)
			})
			.await
	}

	async fn create_check_run_inner(
		&self,
		token: String,
		owner: &str,
		repo: &str,
		check_run: &CreateCheckRunRequest,
	) -> Result<CheckRun, GithubAppError> {
		let url = self.endpoint(&format!("repos/{owner}/{repo}/check-runs"))?;

		let request = self
			.request(Method::POST, url, &token, ACCEPT_JSON)
			.json(check_run);
		let response = ensure_success(send(request).await?).await?;

		let created: CheckRun = response.json().await.map_err(|e| {
			error!(error = %e, "Failed to parse check run response");
			GithubAppError::InvalidResponse(format!("JSON parse error: {e}"))
		})?;

		info!(check_run_id = created.id, "Check run created");
		Ok(created)
	}
}

async fn send(request: RequestBuilder) -> Result<Response, GithubAppError> {
	request.send().await.map_err(|e| {
		if e.is_timeout() {
			error!("GitHub request timed out");
			return GithubAppError::Timeout;
		}
		error!(error = %e, "Network error talking to GitHub");
		GithubAppError::Network(e)
	})
}

async fn ensure_success(response: Response) -> Result<Response, GithubAppError> {
	let status = response.status();
	if status.is_success() {
		return Ok(response);
	}
	let body = response.text().await.unwrap_or_default();
	Err(map_github_error(status, &body))
}

/// Map GitHub API error responses to GithubAppError.
pub(crate) fn map_github_error(status: StatusCode, body: &str) -> GithubAppError {
	let status_code = status.as_u16();

	match status_code {
		401 => {
			warn!(status = status_code, "Unauthorized request to GitHub");
			GithubAppError::Unauthorized
		}
		403 | 429 => {
			let lowered = body.to_lowercase();
			if status_code == 429 || lowered.contains("rate limit") {
				warn!(status = status_code, "GitHub rate limit exceeded");
				GithubAppError::RateLimited
			} else {
				warn!(status = status_code, "Forbidden request to GitHub");
				GithubAppError::Forbidden
			}
		}
		_ => {
			error!(status = status_code, body = %body, "GitHub API error");
			GithubAppError::api_error(status_code, body)
		}
	}
}

/// Time remaining until GitHub's `expires_at`, zero if already past.
pub(crate) fn parse_expiry_duration(expires_at: &str) -> Result<Duration, GithubAppError> {
	let expires_at_dt: DateTime<Utc> = expires_at.parse().map_err(|e| {
		GithubAppError::InvalidResponse(format!("Invalid expires_at: {expires_at} - {e}"))
	})?;

	Ok(expires_at_dt
		.signed_duration_since(Utc::now())
		.to_std()
		.unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cached_token_respects_margin() {
		let token = CachedToken::new("ghs_x".to_string(), Duration::from_secs(300));
		assert!(token.is_valid(Duration::from_secs(60)));
		assert!(!token.is_valid(Duration::from_secs(400)));
	}

	#[test]
	fn maps_401_to_unauthorized() {
		let err = map_github_error(StatusCode::UNAUTHORIZED, "Bad credentials");
		assert!(matches!(err, GithubAppError::Unauthorized));
	}

	#[test]
	fn maps_rate_limits() {
		let err = map_github_error(StatusCode::FORBIDDEN, "API rate limit exceeded for installation");
		assert!(matches!(err, GithubAppError::RateLimited));
		let err = map_github_error(StatusCode::TOO_MANY_REQUESTS, "");
		assert!(matches!(err, GithubAppError::RateLimited));
	}

	#[test]
	fn maps_plain_403_to_forbidden() {
		let err = map_github_error(StatusCode::FORBIDDEN, "Resource not accessible by integration");
		assert!(matches!(err, GithubAppError::Forbidden));
	}

	#[test]
	fn maps_other_statuses_to_api_error() {
		let err = map_github_error(StatusCode::UNPROCESSABLE_ENTITY, "No commit found for SHA");
		assert!(matches!(err, GithubAppError::ApiError { status: 422, .. }));
		let err = map_github_error(StatusCode::BAD_GATEWAY, "");
		assert!(matches!(err, GithubAppError::ApiError { status: 502, .. }));
	}

	#[test]
	fn expiry_in_future_is_positive() {
		let expires_at = (Utc::now() + chrono::Duration::minutes(60)).to_rfc3339();
		let remaining = parse_expiry_duration(&expires_at).unwrap();
		assert!(remaining > Duration::from_secs(3500));
	}

	#[test]
	fn expiry_in_past_is_zero() {
		let remaining = parse_expiry_duration("2020-01-01T00:00:00Z").unwrap();
		assert_eq!(remaining, Duration::ZERO);
	}

	#[test]
	fn malformed_expiry_is_invalid_response() {
		let err = parse_expiry_duration("tomorrow").unwrap_err();
		assert!(matches!(err, GithubAppError::InvalidResponse(_)));
	}

	#[tokio::test]
	async fn installation_lock_is_released_after_use() {
		let client = GithubAppClient::new(GithubAppConfig::new(7, "pem")).unwrap();

		let lock = client.get_installation_lock(11).await;
		assert_eq!(client.installation_locks.lock().await.len(), 1);
		client.release_installation_lock(11, lock).await;
		assert!(client.installation_locks.lock().await.is_empty());
	}

	#[tokio::test]
	async fn installation_lock_survives_while_another_caller_waits() {
		let client = GithubAppClient::new(GithubAppConfig::new(7, "pem")).unwrap();

		let first = client.get_installation_lock(11).await;
		let waiting = client.get_installation_lock(11).await;
		assert!(Arc::ptr_eq(&first, &waiting));

		client.release_installation_lock(11, first).await;
		assert_eq!(client.installation_locks.lock().await.len(), 1);

		client.release_installation_lock(11, waiting).await;
		assert!(client.installation_locks.lock().await.is_empty());
	}

	#[test]
	fn client_builds_from_config() {
		let client = GithubAppClient::new(GithubAppConfig::new(7, "pem").with_webhook_secret("s")).unwrap();
		assert_eq!(client.app_id(), 7);
		assert_eq!(client.webhook_secret(), Some("s"));
	}
}
