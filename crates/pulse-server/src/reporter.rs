// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Publishes a verdict to GitHub as a check run and a pull request comment.

use std::sync::Arc;

use pulse_server_db::Decision;
use pulse_server_github_app::{
	CheckRun, CheckRunConclusion, CheckRunOutput, CreateCheckRunRequest, GithubApi,
	GithubAppError, IssueComment,
};
use tracing::{info, instrument, warn};

use crate::events::PullRequestTarget;
use crate::verdict::Verdict;

pub fn conclusion_for(decision: Decision) -> CheckRunConclusion {
	match decision {
		Decision::Approve => CheckRunConclusion::Success,
		Decision::Block => CheckRunConclusion::Failure,
		Decision::Warn => CheckRunConclusion::Neutral,
	}
}

pub fn decision_marker(decision: Decision) -> &'static str {
	match decision {
		Decision::Approve => "✅",
		Decision::Warn => "⚠️",
		Decision::Block => "🛑",
	}
}

pub fn render_comment(verdict: &Verdict) -> String {
	format!(
		"## ⚡ FeaturePulse Report\n\n\
		 **Decision:** {decision} {marker}\n\
		 **Score:** {score}/100\n\n\
		 **Summary:**\n\
		 {summary}\n\n\
		 ---\n\
		 *Analyzed by FeaturePulse AI*\n",
		decision = verdict.decision,
		marker = decision_marker(verdict.decision),
		score = verdict.score,
		summary = verdict.summary,
	)
}

pub fn check_run_request(name: &str, head_sha: &str, verdict: &Verdict) -> CreateCheckRunRequest {
	CreateCheckRunRequest::completed(
		name,
		head_sha,
		conclusion_for(verdict.decision),
		CheckRunOutput {
			title: format!("FeaturePulse: {}", verdict.decision),
			summary: format!("**Score:** {}/100\n\n{}", verdict.score, verdict.summary),
			text: None,
		},
	)
}

/// Result of each GitHub write. One failing never prevents the other.
#[derive(Debug)]
pub struct ReportOutcome {
	pub check_run: Result<CheckRun, GithubAppError>,
	pub comment: Result<IssueComment, GithubAppError>,
}

impl ReportOutcome {
	pub fn fully_delivered(&self) -> bool {
		self.check_run.is_ok() && self.comment.is_ok()
	}
}

#[derive(Clone)]
pub struct Reporter {
	github: Arc<dyn GithubApi>,
	check_run_name: String,
}

impl Reporter {
	pub fn new(github: Arc<dyn GithubApi>, check_run_name: impl Into<String>) -> Self {
		Self {
			github,
			check_run_name: check_run_name.into(),
		}
	}

	#[instrument(
		skip(self, target, verdict),
		fields(repo = %target.full_name(), pr_number = target.pr_number, decision = %verdict.decision)
	)]
	pub async fn report(&self, target: &PullRequestTarget, verdict: &Verdict) -> ReportOutcome {
		let request = check_run_request(&self.check_run_name, &target.head_sha, verdict);
		let body = render_comment(verdict);

		let (check_run, comment) = tokio::join!(
			self.github.create_check_run(
				target.installation_id,
				&target.owner,
				&target.repo,
				&request
			),
			self.github.create_issue_comment(
				target.installation_id,
				&target.owner,
				&target.repo,
				target.pr_number,
				&body
			),
		);

		match &check_run {
			Ok(run) => info!(check_run_id = run.id, "report: check run created"),
			Err(e) => warn!(error = %e, "report: check run failed"),
		}
		match &comment {
			Ok(c) => info!(comment_id = c.id, "report: comment posted"),
			Err(e) => warn!(error = %e, "report: comment failed"),
		}

		ReportOutcome { check_run, comment }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn verdict(score: u8, decision: Decision, summary: &str) -> Verdict {
		Verdict {
			score,
			decision,
			summary: summary.to_string(),
		}
	}

	#[test]
	fn conclusion_mapping_is_exact() {
		assert_eq!(conclusion_for(Decision::Approve), CheckRunConclusion::Success);
		assert_eq!(conclusion_for(Decision::Block), CheckRunConclusion::Failure);
		assert_eq!(conclusion_for(Decision::Warn), CheckRunConclusion::Neutral);
	}

	#[test]
	fn comment_carries_decision_score_and_summary() {
		let body = render_comment(&verdict(92, Decision::Approve, "Implements the export flow."));
		assert!(body.starts_with("## ⚡ FeaturePulse Report"));
		assert!(body.contains("**Decision:** APPROVE ✅"));
		assert!(body.contains("92/100"));
		assert!(body.contains("Implements the export flow."));
		assert!(body.trim_end().ends_with("*Analyzed by FeaturePulse AI*"));
	}

	#[test]
	fn fallback_comment_reads_warn_zero() {
		let body = render_comment(&Verdict::fallback());
		assert!(body.contains("WARN ⚠️"));
		assert!(body.contains("0/100"));
		assert!(body.contains(crate::verdict::FALLBACK_SUMMARY));
	}

	#[test]
	fn check_run_is_completed_on_head_sha() {
		let request = check_run_request(
			"FeaturePulse Guard",
			"deadbeef",
			&verdict(10, Decision::Block, "Adds unrequested tracking."),
		);
		assert_eq!(request.name, "FeaturePulse Guard");
		assert_eq!(request.head_sha, "deadbeef");
		assert_eq!(request.conclusion, Some(CheckRunConclusion::Failure));
		assert!(request.output.title.contains("BLOCK"));
		assert!(request.output.summary.contains("Adds unrequested tracking."));

		let json = serde_json::to_value(&request).unwrap();
		assert_eq!(json["status"], "completed");
		assert_eq!(json["conclusion"], "failure");
	}

	proptest! {
		#[test]
		fn every_decision_maps_to_its_conclusion(idx in 0usize..3, score in 0u8..=100) {
			let decision = Decision::ALL[idx];
			let request = check_run_request("g", "sha", &verdict(score, decision, "s"));
			let expected = match decision {
				Decision::Approve => "success",
				Decision::Block => "failure",
				Decision::Warn => "neutral",
			};
			prop_assert_eq!(request.conclusion.map(|c| c.as_str()), Some(expected));
			let score_text = format!("{score}/100");
			prop_assert!(render_comment(&verdict(score, decision, "s")).contains(&score_text));
		}
	}
}
