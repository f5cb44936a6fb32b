// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Application state and router construction.

use std::sync::Arc;
use std::time::Duration;

use axum::{
	routing::{get, post},
	Router,
};
use pulse_common_config::{Secret, SecretString};
use pulse_server_config::{AnalysisConfig, ServerConfig};
use pulse_server_db::{
	AnalysisLogRepository, AnalysisLogStore, InstallationRepository, InstallationStore,
};
use pulse_server_github_app::{GithubApi, GithubAppClient, GithubAppConfig};
use pulse_server_llm_openrouter::{CompletionClient, OpenRouterClient, OpenRouterConfig};
use sqlx::SqlitePool;

use crate::deliveries::DeliveryTracker;
use crate::dispatch::EventDispatcher;
use crate::error::ServerError;
use crate::fetcher::Fetcher;
use crate::pipeline::AnalysisPipeline;
use crate::reporter::Reporter;
use crate::routes;
use crate::routes::dashboard::DashboardTemplates;
use crate::verdict::VerdictEngine;

/// The webhook side of the server. Absent when no GitHub App is configured.
#[derive(Clone)]
pub struct WebhookState {
	pub secret: SecretString,
	pub dispatcher: Arc<EventDispatcher>,
}

#[derive(Clone)]
pub struct AppState {
	pub pool: SqlitePool,
	pub installations: Arc<dyn InstallationStore>,
	pub analyses: Arc<dyn AnalysisLogStore>,
	pub webhook: Option<WebhookState>,
	pub deliveries: Arc<DeliveryTracker>,
	pub dashboard: Arc<DashboardTemplates>,
	pub llm_configured: bool,
}

/// External collaborators, injected so tests can substitute fakes.
#[derive(Clone, Default)]
pub struct Integrations {
	/// GitHub API client and the webhook secret deliveries are signed with.
	pub github: Option<(Arc<dyn GithubApi>, SecretString)>,
	pub completion: Option<Arc<dyn CompletionClient>>,
}

impl AppState {
	pub fn new(
		pool: SqlitePool,
		integrations: Integrations,
		analysis: &AnalysisConfig,
		llm_timeout: Duration,
	) -> Self {
		let installations: Arc<dyn InstallationStore> =
			Arc::new(InstallationRepository::new(pool.clone()));
		let analyses: Arc<dyn AnalysisLogStore> = Arc::new(AnalysisLogRepository::new(pool.clone()));
		let deliveries = DeliveryTracker::new();
		let llm_configured = integrations.completion.is_some();

		let webhook = integrations.github.map(|(github, secret)| {
			let pipeline = AnalysisPipeline::new(
				Fetcher::new(Arc::clone(&github), analysis.intent_paths.clone()),
				VerdictEngine::new(
					integrations.completion.clone(),
					analysis.max_diff_chars,
					llm_timeout,
				),
				Reporter::new(github, analysis.check_run_name.clone()),
				Arc::clone(&analyses),
			);
			WebhookState {
				secret,
				dispatcher: Arc::new(EventDispatcher::new(
					pipeline,
					Arc::clone(&installations),
					Arc::clone(&deliveries),
				)),
			}
		});

		Self {
			pool,
			installations,
			analyses,
			webhook,
			deliveries,
			dashboard: Arc::new(DashboardTemplates::default()),
			llm_configured,
		}
	}
}

/// Build state with the production GitHub App and OpenRouter clients.
pub fn create_app_state(pool: SqlitePool, config: &ServerConfig) -> Result<AppState, ServerError> {
	let github = match &config.github_app {
		Some(app) => {
			let client_config = GithubAppConfig::new(app.app_id(), app.private_key_pem())
				.with_base_url(app.base_url())
				.with_webhook_secret(app.webhook_secret());
			let client = GithubAppClient::new(client_config)
				.map_err(|e| ServerError::Internal(format!("GitHub App client: {e}")))?;
			let api: Arc<dyn GithubApi> = Arc::new(client);
			Some((api, Secret::new(app.webhook_secret().to_string())))
		}
		None => {
			tracing::warn!("GitHub App not configured; webhook deliveries will be refused");
			None
		}
	};

	let completion = match &config.llm.api_key {
		Some(key) => {
			let client_config = OpenRouterConfig::new(key.expose().as_str())
				.with_base_url(config.llm.base_url.as_str())
				.with_model(config.llm.model.as_str())
				.with_timeout(config.llm.timeout);
			match OpenRouterClient::new(client_config) {
				Ok(client) => Some(Arc::new(client) as Arc<dyn CompletionClient>),
				Err(e) => {
					tracing::warn!(error = %e, "completion client unavailable; verdicts will fall back");
					None
				}
			}
		}
		None => {
			tracing::warn!("LLM API key not configured; every verdict will fall back");
			None
		}
	};

	Ok(AppState::new(
		pool,
		Integrations { github, completion },
		&config.analysis,
		config.llm.timeout,
	))
}

pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/", get(routes::dashboard::dashboard_page))
		.route(
			"/api/analyses/recent",
			get(routes::dashboard::recent_analyses),
		)
		.route("/api/webhook", post(routes::webhooks::github_webhook))
		.route("/health", get(routes::health::health_check))
		.with_state(state)
}
