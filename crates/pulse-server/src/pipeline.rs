// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The per-pull-request analysis pipeline.
//!
//! Stages run strictly in order: intent, diff, verdict, report, log. Only a
//! missing intent (silent stop) and a diff failure abort early. Nothing is
//! retried.

use std::sync::Arc;

use pulse_server_db::{AnalysisLogStore, DbError, NewAnalysisLog};
use tracing::{info, instrument};

use crate::events::PullRequestTarget;
use crate::fetcher::{FetchError, Fetcher};
use crate::reporter::{ReportOutcome, Reporter};
use crate::verdict::{Verdict, VerdictEngine};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
	#[error(transparent)]
	Fetch(#[from] FetchError),

	/// The verdict was reported but the analysis row could not be written.
	#[error("failed to record analysis: {source}")]
	Persistence {
		verdict: Verdict,
		#[source]
		source: DbError,
	},
}

#[derive(Debug)]
pub enum PipelineOutcome {
	/// The repository has no intent document; nothing was reported or stored.
	NoIntent,
	Completed {
		verdict: Verdict,
		report: ReportOutcome,
		analysis_log_id: i64,
	},
}

#[derive(Clone)]
pub struct AnalysisPipeline {
	fetcher: Fetcher,
	engine: VerdictEngine,
	reporter: Reporter,
	analyses: Arc<dyn AnalysisLogStore>,
}

impl AnalysisPipeline {
	pub fn new(
		fetcher: Fetcher,
		engine: VerdictEngine,
		reporter: Reporter,
		analyses: Arc<dyn AnalysisLogStore>,
	) -> Self {
		Self {
			fetcher,
			engine,
			reporter,
			analyses,
		}
	}

	#[instrument(
		skip(self, target),
		fields(
			installation_id = target.installation_id,
			repo = %target.full_name(),
			pr_number = target.pr_number
		)
	)]
	pub async fn run(&self, target: &PullRequestTarget) -> Result<PipelineOutcome, PipelineError> {
		let Some(intent) = self.fetcher.fetch_intent(target).await else {
			info!("pipeline: no intent document, skipping analysis");
			return Ok(PipelineOutcome::NoIntent);
		};

		let diff = self.fetcher.fetch_diff(target).await?;
		info!(diff_chars = diff.len(), "pipeline: fetched diff");

		let verdict = self.engine.evaluate(&intent, &diff).await;

		let report = self.reporter.report(target, &verdict).await;

		let log = NewAnalysisLog {
			github_installation_id: target.installation_id,
			pr_number: target.pr_number as i64,
			commit_sha: target.head_sha.clone(),
			decision: verdict.decision,
			score: i64::from(verdict.score),
		};

		match self.analyses.record_analysis(&log).await {
			Ok(analysis_log_id) => {
				info!(
					analysis_log_id,
					decision = %verdict.decision,
					score = verdict.score,
					reported = report.fully_delivered(),
					"pipeline: analysis complete"
				);
				Ok(PipelineOutcome::Completed {
					verdict,
					report,
					analysis_log_id,
				})
			}
			Err(source) => Err(PipelineError::Persistence { verdict, source }),
		}
	}
}
