// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Analysis log rows, one per completed pull request evaluation.
//!
//! Rows are immutable. The dashboard reads them joined with their installation.

use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::types::{now_timestamp, parse_decision, AnalysisLog, NewAnalysisLog, RecentAnalysis};

/// Rows shown on the dashboard.
pub const RECENT_ANALYSES_LIMIT: i64 = 10;

#[async_trait]
pub trait AnalysisLogStore: Send + Sync {
	/// Insert one row for the installation identified by GitHub's id.
	///
	/// Fails with [`DbError::Referential`] when that installation was never recorded.
	async fn record_analysis(&self, log: &NewAnalysisLog) -> Result<i64, DbError>;
	async fn list_recent_analyses(&self, limit: i64) -> Result<Vec<RecentAnalysis>, DbError>;
	async fn list_analyses_for_pull_request(
		&self,
		github_installation_id: i64,
		pr_number: i64,
	) -> Result<Vec<AnalysisLog>, DbError>;
	async fn count_analyses(&self) -> Result<i64, DbError>;
}

#[async_trait]
impl AnalysisLogStore for AnalysisLogRepository {
	async fn record_analysis(&self, log: &NewAnalysisLog) -> Result<i64, DbError> {
		self.record_analysis(log).await
	}

	async fn list_recent_analyses(&self, limit: i64) -> Result<Vec<RecentAnalysis>, DbError> {
		self.list_recent_analyses(limit).await
	}

	async fn list_analyses_for_pull_request(
		&self,
		github_installation_id: i64,
		pr_number: i64,
	) -> Result<Vec<AnalysisLog>, DbError> {
		self
			.list_analyses_for_pull_request(github_installation_id, pr_number)
			.await
	}

	async fn count_analyses(&self) -> Result<i64, DbError> {
		self.count_analyses().await
	}
}

#[derive(Clone)]
pub struct AnalysisLogRepository {
	pool: SqlitePool,
}

impl AnalysisLogRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(
		skip(self, log),
		fields(
			github_installation_id = log.github_installation_id,
			pr_number = log.pr_number,
			decision = %log.decision
		)
	)]
	pub async fn record_analysis(&self, log: &NewAnalysisLog) -> Result<i64, DbError> {
		// Resolve and insert in one statement so a missing installation inserts nothing.
		let result = sqlx::query(
			r#"
			INSERT INTO analysis_logs (
				installation_id, pr_number, commit_sha, decision, score, created_at
			)
			SELECT id, ?2, ?3, ?4, ?5, ?6
			FROM installations
			WHERE github_installation_id = ?1
			"#,
		)
		.bind(log.github_installation_id)
		.bind(log.pr_number)
		.bind(&log.commit_sha)
		.bind(log.decision.as_str())
		.bind(log.score)
		.bind(now_timestamp())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::Referential(format!(
				"installation {} has not been recorded",
				log.github_installation_id
			)));
		}

		let id = result.last_insert_rowid();
		tracing::info!(analysis_log_id = id, score = log.score, "analysis_log: recorded");
		Ok(id)
	}

	/// Newest first, joined with the owning installation.
	#[tracing::instrument(skip(self))]
	pub async fn list_recent_analyses(&self, limit: i64) -> Result<Vec<RecentAnalysis>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT a.id, i.repo_name, i.account_name, a.pr_number, a.commit_sha,
				a.decision, a.score, a.created_at
			FROM analysis_logs a
			JOIN installations i ON i.id = a.installation_id
			ORDER BY a.created_at DESC, a.id DESC
			LIMIT ?1
			"#,
		)
		.bind(limit.max(0))
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(recent_from_row).collect()
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_analyses_for_pull_request(
		&self,
		github_installation_id: i64,
		pr_number: i64,
	) -> Result<Vec<AnalysisLog>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT a.id, a.installation_id, a.pr_number, a.commit_sha, a.decision, a.score,
				a.created_at
			FROM analysis_logs a
			JOIN installations i ON i.id = a.installation_id
			WHERE i.github_installation_id = ?1 AND a.pr_number = ?2
			ORDER BY a.created_at ASC, a.id ASC
			"#,
		)
		.bind(github_installation_id)
		.bind(pr_number)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(log_from_row).collect()
	}

	#[tracing::instrument(skip(self))]
	pub async fn count_analyses(&self) -> Result<i64, DbError> {
		let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM analysis_logs")
			.fetch_one(&self.pool)
			.await?;
		Ok(count)
	}
}

fn recent_from_row(row: &SqliteRow) -> Result<RecentAnalysis, DbError> {
	Ok(RecentAnalysis {
		id: row.get("id"),
		repo_name: row.get("repo_name"),
		account_name: row.get("account_name"),
		pr_number: row.get("pr_number"),
		commit_sha: row.get("commit_sha"),
		decision: parse_decision(row.get("decision"))?,
		score: row.get("score"),
		created_at: row.get("created_at"),
	})
}

fn log_from_row(row: &SqliteRow) -> Result<AnalysisLog, DbError> {
	Ok(AnalysisLog {
		id: row.get("id"),
		installation_id: row.get("installation_id"),
		pr_number: row.get("pr_number"),
		commit_sha: row.get("commit_sha"),
		decision: parse_decision(row.get("decision"))?,
		score: row.get("score"),
		created_at: row.get("created_at"),
	})
}
