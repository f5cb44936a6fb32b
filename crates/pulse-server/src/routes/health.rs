// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Health check handler.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tokio::time::Instant;

use crate::api::AppState;
use crate::deliveries::DeliveryStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
	Healthy,
	Degraded,
	Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct HealthComponents {
	pub database: HealthStatus,
	pub github_app: HealthStatus,
	pub llm: HealthStatus,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: HealthStatus,
	pub timestamp: String,
	pub duration_ms: u64,
	pub version: &'static str,
	pub components: HealthComponents,
	pub deliveries: DeliveryStats,
}

/// The database is the only hard dependency. Missing GitHub App or LLM
/// configuration degrades the service without making it unhealthy.
fn aggregate_status(components: &HealthComponents) -> HealthStatus {
	if components.database == HealthStatus::Unhealthy {
		HealthStatus::Unhealthy
	} else if components.github_app != HealthStatus::Healthy
		|| components.llm != HealthStatus::Healthy
	{
		HealthStatus::Degraded
	} else {
		HealthStatus::Healthy
	}
}

/// GET /health - Database ping, integration configuration and delivery counters.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	let start = Instant::now();

	let database = match pulse_server_db::ping(&state.pool).await {
		Ok(()) => HealthStatus::Healthy,
		Err(e) => {
			tracing::warn!(error = %e, "health: database ping failed");
			HealthStatus::Unhealthy
		}
	};

	let configured = |yes: bool| {
		if yes {
			HealthStatus::Healthy
		} else {
			HealthStatus::Degraded
		}
	};

	let components = HealthComponents {
		database,
		github_app: configured(state.webhook.is_some()),
		llm: configured(state.llm_configured),
	};
	let status = aggregate_status(&components);

	let response = HealthResponse {
		status,
		timestamp: chrono::Utc::now().to_rfc3339(),
		duration_ms: start.elapsed().as_millis() as u64,
		version: env!("CARGO_PKG_VERSION"),
		components,
		deliveries: state.deliveries.snapshot(),
	};

	let http_status = match status {
		HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
		HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
	};

	(http_status, Json(response))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn database_failure_is_unhealthy() {
		let components = HealthComponents {
			database: HealthStatus::Unhealthy,
			github_app: HealthStatus::Healthy,
			llm: HealthStatus::Healthy,
		};
		assert_eq!(aggregate_status(&components), HealthStatus::Unhealthy);
	}

	#[test]
	fn missing_integration_is_degraded() {
		let components = HealthComponents {
			database: HealthStatus::Healthy,
			github_app: HealthStatus::Healthy,
			llm: HealthStatus::Degraded,
		};
		assert_eq!(aggregate_status(&components), HealthStatus::Degraded);
	}
}
