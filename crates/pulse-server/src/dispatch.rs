// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Runs typed webhook events off the request path.

use std::sync::Arc;

use pulse_server_db::InstallationStore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::deliveries::DeliveryTracker;
use crate::events::{InstallationCreated, WebhookEvent};
use crate::pipeline::{AnalysisPipeline, PipelineError, PipelineOutcome};

pub struct EventDispatcher {
	pipeline: AnalysisPipeline,
	installations: Arc<dyn InstallationStore>,
	deliveries: Arc<DeliveryTracker>,
}

impl EventDispatcher {
	pub fn new(
		pipeline: AnalysisPipeline,
		installations: Arc<dyn InstallationStore>,
		deliveries: Arc<DeliveryTracker>,
	) -> Self {
		Self {
			pipeline,
			installations,
			deliveries,
		}
	}

	/// Fire-and-forget. The handle is only useful to tests; the webhook route
	/// drops it.
	pub fn spawn(self: &Arc<Self>, delivery_id: String, event: WebhookEvent) -> JoinHandle<()> {
		let this = Arc::clone(self);
		let guard = self.deliveries.begin();
		let span = info_span!("delivery", delivery_id = %delivery_id, event = event.kind());

		tokio::spawn(
			async move {
				if this.handle(event).await {
					guard.succeeded();
				}
			}
			.instrument(span),
		)
	}

	/// Returns `false` when the delivery ended in a logged failure.
	pub async fn handle(&self, event: WebhookEvent) -> bool {
		match event {
			WebhookEvent::PullRequest(target) => match self.pipeline.run(&target).await {
				Ok(PipelineOutcome::NoIntent) => true,
				Ok(PipelineOutcome::Completed { .. }) => true,
				Err(PipelineError::Fetch(e)) => {
					error!(error = %e, "delivery: analysis aborted");
					false
				}
				Err(e @ PipelineError::Persistence { .. }) => {
					error!(error = %e, "delivery: analysis reported but not recorded");
					false
				}
			},
			WebhookEvent::InstallationCreated(created) => self.record_installation(created).await,
			WebhookEvent::Ignored { event, action } => {
				debug!(event = %event, action = ?action, "delivery: ignored");
				true
			}
		}
	}

	async fn record_installation(&self, created: InstallationCreated) -> bool {
		match self
			.installations
			.record_installation(created.installation_id, &created.account_name)
			.await
		{
			Ok(true) => {
				info!(
					installation_id = created.installation_id,
					account = %created.account_name,
					"delivery: installation saved"
				);
				true
			}
			Ok(false) => {
				debug!(
					installation_id = created.installation_id,
					"delivery: installation already known"
				);
				true
			}
			Err(e) => {
				warn!(
					installation_id = created.installation_id,
					error = %e,
					"delivery: failed to save installation"
				);
				false
			}
		}
	}
}
