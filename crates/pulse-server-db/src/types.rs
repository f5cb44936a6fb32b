// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DbError;

/// Verdict recorded for a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
	Approve,
	Warn,
	Block,
}

impl Decision {
	pub const ALL: [Decision; 3] = [Decision::Approve, Decision::Warn, Decision::Block];

	pub fn as_str(&self) -> &'static str {
		match self {
			Decision::Approve => "APPROVE",
			Decision::Warn => "WARN",
			Decision::Block => "BLOCK",
		}
	}
}

impl fmt::Display for Decision {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Exact, case-sensitive match on the stored literal.
impl FromStr for Decision {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"APPROVE" => Ok(Decision::Approve),
			"WARN" => Ok(Decision::Warn),
			"BLOCK" => Ok(Decision::Block),
			other => Err(format!("unknown decision '{other}'")),
		}
	}
}

pub(crate) fn parse_decision(raw: &str) -> Result<Decision, DbError> {
	raw.parse().map_err(DbError::Internal)
}

/// Fixed-width UTC timestamp so text ordering matches time ordering.
pub(crate) fn now_timestamp() -> String {
	Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Installation {
	pub id: i64,
	pub github_installation_id: i64,
	pub account_name: String,
	pub repo_name: String,
	pub intent_text: String,
	pub created_at: String,
}

/// Label stored for installations created from webhooks.
pub const DEFAULT_REPO_NAME: &str = "global";
/// Placeholder intent stored at install time; the live intent is read from the repository.
pub const DEFAULT_INTENT_TEXT: &str = "Default intent";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnalysisLog {
	/// GitHub's installation id, not the local row id.
	pub github_installation_id: i64,
	pub pr_number: i64,
	pub commit_sha: String,
	pub decision: Decision,
	pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisLog {
	pub id: i64,
	pub installation_id: i64,
	pub pr_number: i64,
	pub commit_sha: String,
	pub decision: Decision,
	pub score: i64,
	pub created_at: String,
}

/// One dashboard row: an analysis joined with its installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentAnalysis {
	pub id: i64,
	pub repo_name: String,
	pub account_name: String,
	pub pr_number: i64,
	pub commit_sha: String,
	pub decision: Decision,
	pub score: i64,
	pub created_at: String,
}
