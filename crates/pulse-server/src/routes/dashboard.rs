// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Read-only dashboard over the analysis log.

use axum::{
	extract::State,
	http::StatusCode,
	response::{Html, IntoResponse, Response},
	Json,
};
use chrono::DateTime;
use handlebars::Handlebars;
use pulse_server_db::{RecentAnalysis, RECENT_ANALYSES_LIMIT};
use serde::Serialize;

use crate::api::AppState;
use crate::error::ServerError;

const DASHBOARD_TEMPLATE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>FeaturePulse Dashboard</title>
</head>
<body>
<main>
  <header>
    <h1>FeaturePulse Dashboard</h1>
    <span class="status">🟢 System Online</span>
  </header>
  <section class="stats">
    <div><h3>Total Scans</h3><p>{{total_scans}}</p></div>
    <div><h3>Installations</h3><p>{{installations}}</p></div>
  </section>
  <section>
    <h2>Recent Activity</h2>
    <table>
      <thead>
        <tr><th>Repository</th><th>Account</th><th>PR #</th><th>Decision</th><th>Score</th><th>Time</th></tr>
      </thead>
      <tbody>
      {{#each rows}}
        <tr>
          <td>{{repository}}</td>
          <td>{{account}}</td>
          <td>#{{pr_number}}</td>
          <td class="decision-{{decision_class}}">{{decision}}</td>
          <td>{{score}}/100</td>
          <td>{{date}}</td>
        </tr>
      {{else}}
        <tr><td colspan="6">No analysis logs found yet.</td></tr>
      {{/each}}
      </tbody>
    </table>
  </section>
</main>
</body>
</html>
"#;

pub const DATABASE_ERROR_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>FeaturePulse Dashboard</title></head>
<body>
<main>
  <h1>❌ Database Connection Failed</h1>
  <p>Check the server logs.</p>
</main>
</body>
</html>
"#;

/// Compiled dashboard templates. Values are HTML-escaped on render.
pub struct DashboardTemplates {
	handlebars: Handlebars<'static>,
}

impl DashboardTemplates {
	pub fn new() -> Result<Self, handlebars::TemplateError> {
		let mut handlebars = Handlebars::new();
		handlebars.register_template_string("dashboard", DASHBOARD_TEMPLATE)?;
		Ok(Self { handlebars })
	}

	pub fn render(&self, view: &DashboardView) -> Result<String, handlebars::RenderError> {
		self.handlebars.render("dashboard", view)
	}
}

impl Default for DashboardTemplates {
	fn default() -> Self {
		Self::new().expect("embedded dashboard template is valid")
	}
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
	pub total_scans: i64,
	pub installations: i64,
	pub rows: Vec<DashboardRow>,
}

#[derive(Debug, Serialize)]
pub struct DashboardRow {
	pub repository: String,
	pub account: String,
	pub pr_number: i64,
	pub decision: &'static str,
	pub decision_class: &'static str,
	pub score: i64,
	pub date: String,
}

impl From<&RecentAnalysis> for DashboardRow {
	fn from(a: &RecentAnalysis) -> Self {
		Self {
			repository: a.repo_name.clone(),
			account: a.account_name.clone(),
			pr_number: a.pr_number,
			decision: a.decision.as_str(),
			decision_class: match a.decision {
				pulse_server_db::Decision::Approve => "approve",
				pulse_server_db::Decision::Warn => "warn",
				pulse_server_db::Decision::Block => "block",
			},
			score: a.score,
			date: DateTime::parse_from_rfc3339(&a.created_at)
				.map(|t| t.format("%Y-%m-%d").to_string())
				.unwrap_or_else(|_| a.created_at.clone()),
		}
	}
}

async fn load_view(state: &AppState) -> Result<DashboardView, ServerError> {
	let total_scans = state.analyses.count_analyses().await?;
	let installations = state.installations.count_installations().await?;
	let recent = state
		.analyses
		.list_recent_analyses(RECENT_ANALYSES_LIMIT)
		.await?;

	Ok(DashboardView {
		total_scans,
		installations,
		rows: recent.iter().map(DashboardRow::from).collect(),
	})
}

/// GET / - Summary of the most recent analyses.
///
/// A database failure renders a static error page instead of an error body.
pub async fn dashboard_page(State(state): State<AppState>) -> Response {
	let view = match load_view(&state).await {
		Ok(view) => view,
		Err(e) => {
			tracing::error!(error = %e, "dashboard: database query failed");
			return (StatusCode::INTERNAL_SERVER_ERROR, Html(DATABASE_ERROR_PAGE)).into_response();
		}
	};

	match state.dashboard.render(&view) {
		Ok(html) => Html(html).into_response(),
		Err(e) => {
			tracing::error!(error = %e, "dashboard: render failed");
			ServerError::Internal(e.to_string()).into_response()
		}
	}
}

#[derive(Debug, Serialize)]
pub struct RecentAnalysesResponse {
	pub total: i64,
	pub analyses: Vec<RecentAnalysis>,
}

/// GET /api/analyses/recent - JSON form of the dashboard table.
pub async fn recent_analyses(
	State(state): State<AppState>,
) -> Result<Json<RecentAnalysesResponse>, ServerError> {
	let total = state.analyses.count_analyses().await?;
	let analyses = state
		.analyses
		.list_recent_analyses(RECENT_ANALYSES_LIMIT)
		.await?;
	Ok(Json(RecentAnalysesResponse { total, analyses }))
}
