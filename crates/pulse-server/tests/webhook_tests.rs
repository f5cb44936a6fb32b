// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! HTTP-level tests for `POST /api/webhook`.

mod common;

use std::sync::Arc;

use axum::{
	body::Body,
	http::{Request, StatusCode},
	Router,
};
use common::*;
use pulse_server::{create_router, AppState, Integrations};
use pulse_server_config::AnalysisConfig;
use pulse_server_db::{AnalysisLogRepository, InstallationRepository};
use pulse_server_github_app::{compute_webhook_signature, CheckRunConclusion};
use serde_json::json;
use tower::ServiceExt;

fn installation_created(installation_id: i64, login: &str) -> Vec<u8> {
	serde_json::to_vec(&json!({
		"action": "created",
		"installation": {
			"id": installation_id,
			"account": { "id": 1, "login": login, "type": "Organization" }
		},
		"repositories": []
	}))
	.unwrap()
}

fn pull_request(action: &str, number: u64) -> Vec<u8> {
	serde_json::to_vec(&json!({
		"action": action,
		"number": number,
		"pull_request": {
			"number": number,
			"head": { "sha": "f00dfeedf00dfeedf00dfeedf00dfeedf00dfeed", "ref": "feature" },
			"title": "Add billing"
		},
		"repository": {
			"id": 99,
			"name": "widgets",
			"full_name": "acme/widgets",
			"owner": { "login": "acme" }
		},
		"installation": { "id": INSTALLATION_ID }
	}))
	.unwrap()
}

fn delivery(event: &str, body: &[u8], signature: Option<String>) -> Request<Body> {
	let mut builder = Request::builder()
		.method("POST")
		.uri("/api/webhook")
		.header("Content-Type", "application/json")
		.header("X-GitHub-Delivery", "72d3162e-cc78-11e3-81ab-4c9367dc0958")
		.header("X-GitHub-Event", event);
	if let Some(signature) = signature {
		builder = builder.header("X-Hub-Signature-256", signature);
	}
	builder.body(Body::from(body.to_vec())).unwrap()
}

fn signed(event: &str, body: &[u8]) -> Request<Body> {
	delivery(event, body, Some(compute_webhook_signature(WEBHOOK_SECRET, body)))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
	let response = app.clone().oneshot(request).await.unwrap();
	let status = response.status();
	let body = axum::body::to_bytes(response.into_body(), usize::MAX)
		.await
		.unwrap();
	(status, String::from_utf8_lossy(&body).into_owned())
}

#[tokio::test]
async fn installation_created_is_recorded_once() {
	let (pool, _dir) = test_pool().await;
	let state = app_state(&pool, FakeGithub::new(), None);
	let app = create_router(state.clone());
	let body = installation_created(777, "octo-org");

	let (status, text) = send(&app, signed("installation", &body)).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(text, "Webhook Received");
	settle(&state, 1).await;

	let (status, _) = send(&app, signed("installation", &body)).await;
	assert_eq!(status, StatusCode::OK);
	settle(&state, 2).await;

	let installations = InstallationRepository::new(pool.clone());
	assert_eq!(installations.count_installations().await.unwrap(), 1);
	let row = installations
		.get_installation_by_github_id(777)
		.await
		.unwrap()
		.unwrap();
	assert_eq!(row.account_name, "octo-org");
	assert_eq!(row.repo_name, "global");
	assert_eq!(state.deliveries.snapshot().completed, 2);
}

#[tokio::test]
async fn pull_request_opened_runs_analysis() {
	let (pool, _dir) = test_pool().await;
	install(&pool, INSTALLATION_ID, "acme").await;
	let github = FakeGithub::new()
		.with_file(".featurepulse/intent.md", "Billing only.")
		.with_diff("+fn charge() {}\n");
	let model = FakeCompletion::replying(
		r#"{"score": 20, "decision": "BLOCK", "summary": "Adds a telemetry SDK."}"#,
	);
	let state = app_state(&pool, github.clone(), Some(model));
	let app = create_router(state.clone());

	let (status, _) = send(&app, signed("pull_request", &pull_request("opened", 31))).await;
	assert_eq!(status, StatusCode::OK);
	settle(&state, 1).await;

	assert_eq!(
		github.check_runs()[0].conclusion,
		Some(CheckRunConclusion::Failure)
	);
	assert!(github.comments()[0].contains("20/100"));
	let rows = AnalysisLogRepository::new(pool.clone())
		.list_analyses_for_pull_request(INSTALLATION_ID, 31)
		.await
		.unwrap();
	assert_eq!(rows.len(), 1);
	assert_eq!(rows[0].score, 20);
}

#[tokio::test]
async fn synchronize_also_runs_analysis() {
	let (pool, _dir) = test_pool().await;
	install(&pool, INSTALLATION_ID, "acme").await;
	let github = FakeGithub::new()
		.with_file("intent.md", "Billing only.")
		.with_diff("+fn charge() {}\n");
	let state = app_state(&pool, github.clone(), None);
	let app = create_router(state.clone());

	let (status, _) = send(
		&app,
		signed("pull_request", &pull_request("synchronize", 32)),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
	settle(&state, 1).await;

	assert_eq!(github.check_runs().len(), 1);
}

#[tokio::test]
async fn other_actions_and_events_are_ignored() {
	let (pool, _dir) = test_pool().await;
	let github = FakeGithub::new();
	let state = app_state(&pool, github.clone(), None);
	let app = create_router(state.clone());

	let cases = [
		("pull_request", pull_request("closed", 1)),
		("pull_request", pull_request("labeled", 2)),
		("push", serde_json::to_vec(&json!({ "ref": "refs/heads/main" })).unwrap()),
		(
			"installation",
			serde_json::to_vec(&json!({ "action": "deleted", "installation": { "id": 5 } })).unwrap(),
		),
	];
	for (event, body) in &cases {
		let (status, _) = send(&app, signed(event, body)).await;
		assert_eq!(status, StatusCode::OK, "event {event}");
	}

	let stats = state.deliveries.snapshot();
	assert_eq!(stats.received, 4);
	assert_eq!(stats.ignored, 4);
	assert_eq!(stats.in_flight, 0);
	assert!(github.calls().is_empty());
	assert_eq!(
		InstallationRepository::new(pool.clone())
			.count_installations()
			.await
			.unwrap(),
		0
	);
}

#[tokio::test]
async fn bad_signature_is_unauthorized() {
	let (pool, _dir) = test_pool().await;
	let state = app_state(&pool, FakeGithub::new(), None);
	let app = create_router(state.clone());
	let body = installation_created(1, "octo-org");

	let wrong_secret = compute_webhook_signature("not-the-secret", &body);
	let (status, _) = send(&app, delivery("installation", &body, Some(wrong_secret))).await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);

	let bare_hex = compute_webhook_signature(WEBHOOK_SECRET, &body)
		.trim_start_matches("sha256=")
		.to_string();
	let (status, _) = send(&app, delivery("installation", &body, Some(bare_hex))).await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);

	assert_eq!(state.deliveries.snapshot().received, 0);
	assert_eq!(
		InstallationRepository::new(pool.clone())
			.count_installations()
			.await
			.unwrap(),
		0
	);
}

#[tokio::test]
async fn any_body_change_invalidates_signature() {
	let (pool, _dir) = test_pool().await;
	let app = create_router(app_state(&pool, FakeGithub::new(), None));
	let body = installation_created(1, "octo-org");
	let signature = compute_webhook_signature(WEBHOOK_SECRET, &body);

	for i in [0, body.len() / 2, body.len() - 1] {
		let mut tampered = body.clone();
		tampered[i] ^= 0x01;
		let (status, _) = send(&app, delivery("installation", &tampered, Some(signature.clone()))).await;
		assert_eq!(status, StatusCode::UNAUTHORIZED, "byte {i}");
	}
}

#[tokio::test]
async fn missing_headers_are_bad_requests() {
	let (pool, _dir) = test_pool().await;
	let app = create_router(app_state(&pool, FakeGithub::new(), None));
	let body = installation_created(1, "octo-org");

	let (status, _) = send(&app, delivery("installation", &body, None)).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);

	let no_event = Request::builder()
		.method("POST")
		.uri("/api/webhook")
		.header(
			"X-Hub-Signature-256",
			compute_webhook_signature(WEBHOOK_SECRET, &body),
		)
		.body(Body::from(body.clone()))
		.unwrap();
	let (status, _) = send(&app, no_event).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_payload_is_acknowledged_and_rejected() {
	let (pool, _dir) = test_pool().await;
	let state = app_state(&pool, FakeGithub::new(), None);
	let app = create_router(state.clone());

	let body = br#"{"action": "opened", "pull_request": "#.to_vec();
	let (status, _) = send(&app, signed("pull_request", &body)).await;
	assert_eq!(status, StatusCode::OK);

	let stats = state.deliveries.snapshot();
	assert_eq!(stats.received, 1);
	assert_eq!(stats.rejected, 1);
	assert_eq!(stats.in_flight, 0);
}

#[tokio::test]
async fn unconfigured_github_app_refuses_deliveries() {
	let (pool, _dir) = test_pool().await;
	let state = AppState::new(
		pool.clone(),
		Integrations::default(),
		&AnalysisConfig::default(),
		std::time::Duration::from_secs(5),
	);
	let app = create_router(state);
	let body = installation_created(1, "octo-org");

	let (status, _) = send(&app, signed("installation", &body)).await;
	assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn unknown_installation_counts_as_failed_delivery() {
	let (pool, _dir) = test_pool().await;
	let github = FakeGithub::new()
		.with_file(".featurepulse/intent.md", "Billing only.")
		.with_diff("+fn charge() {}\n");
	let state = app_state(&pool, Arc::clone(&github), None);
	let app = create_router(state.clone());

	let (status, _) = send(&app, signed("pull_request", &pull_request("opened", 40))).await;
	assert_eq!(status, StatusCode::OK);
	settle(&state, 1).await;

	let stats = state.deliveries.snapshot();
	assert_eq!(stats.failed, 1);
	assert_eq!(github.check_runs().len(), 1);
	assert_eq!(
		AnalysisLogRepository::new(pool.clone())
			.count_analyses()
			.await
			.unwrap(),
		0
	);
}

#[tokio::test]
async fn health_reports_integrations_and_deliveries() {
	let (pool, _dir) = test_pool().await;
	let app = create_router(app_state(&pool, FakeGithub::new(), None));

	let request = Request::builder()
		.uri("/health")
		.body(Body::empty())
		.unwrap();
	let (status, text) = send(&app, request).await;
	assert_eq!(status, StatusCode::OK);

	let json: serde_json::Value = serde_json::from_str(&text).unwrap();
	assert_eq!(json["status"], "degraded");
	assert_eq!(json["components"]["database"], "healthy");
	assert_eq!(json["components"]["github_app"], "healthy");
	assert_eq!(json["components"]["llm"], "degraded");
	assert_eq!(json["deliveries"]["received"], 0);
}
