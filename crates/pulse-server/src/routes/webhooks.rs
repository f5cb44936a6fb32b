// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! GitHub App webhook receiver.

use axum::{
	body::Bytes,
	extract::State,
	http::{HeaderMap, StatusCode},
	response::IntoResponse,
};

use crate::api::AppState;
use crate::error::ServerError;
use crate::events::{route_event, WebhookEvent};

pub const DELIVERY_HEADER: &str = "X-GitHub-Delivery";
pub const EVENT_HEADER: &str = "X-GitHub-Event";
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

/// POST /api/webhook - Receive a GitHub App delivery.
///
/// The signature is checked over the raw body before anything is parsed. Once
/// it verifies, the delivery is acknowledged with 200 whatever happens next;
/// handler work runs on a spawned task.
#[axum::debug_handler]
pub async fn github_webhook(
	State(state): State<AppState>,
	headers: HeaderMap,
	body: Bytes,
) -> Result<impl IntoResponse, ServerError> {
	let webhook = state.webhook.as_ref().ok_or_else(|| {
		tracing::error!("github_webhook: GitHub App not configured");
		ServerError::ServiceUnavailable("GitHub App is not configured on the server".into())
	})?;

	let delivery_id = header(&headers, DELIVERY_HEADER)
		.unwrap_or("unknown")
		.to_string();

	let event_name = header(&headers, EVENT_HEADER).ok_or_else(|| {
		tracing::warn!(delivery_id = %delivery_id, "github_webhook: missing X-GitHub-Event header");
		ServerError::BadRequest("Missing X-GitHub-Event header".into())
	})?;

	let signature = header(&headers, SIGNATURE_HEADER).ok_or_else(|| {
		tracing::warn!(delivery_id = %delivery_id, "github_webhook: missing X-Hub-Signature-256 header");
		ServerError::BadRequest("Missing X-Hub-Signature-256 header".into())
	})?;

	if let Err(e) =
		pulse_server_github_app::verify_webhook_signature(webhook.secret.expose(), signature, &body)
	{
		tracing::error!(
			delivery_id = %delivery_id,
			event = %event_name,
			error = %e,
			"github_webhook: signature verification failed"
		);
		return Err(ServerError::Unauthorized("Invalid webhook signature".into()));
	}

	state.deliveries.record_received();

	match route_event(event_name, &body) {
		Ok(WebhookEvent::Ignored { event, action }) => {
			state.deliveries.record_ignored();
			tracing::debug!(
				delivery_id = %delivery_id,
				event = %event,
				action = ?action,
				"github_webhook: ignoring event"
			);
		}
		Ok(event) => {
			tracing::info!(
				delivery_id = %delivery_id,
				event = event.kind(),
				"github_webhook: dispatching"
			);
			webhook.dispatcher.spawn(delivery_id, event);
		}
		Err(e) => {
			state.deliveries.record_rejected();
			tracing::warn!(
				delivery_id = %delivery_id,
				event = %event_name,
				error = %e,
				"github_webhook: unusable payload"
			);
		}
	}

	Ok((StatusCode::OK, "Webhook Received"))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
	headers
		.get(name)
		.and_then(|v| v.to_str().ok())
		.map(str::trim)
		.filter(|v| !v.is_empty())
}
