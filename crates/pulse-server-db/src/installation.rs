// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! GitHub App installations.
//!
//! Rows are created from `installation.created` webhooks and never updated or
//! deleted. Redelivered events are no-ops.

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::types::{now_timestamp, Installation, DEFAULT_INTENT_TEXT, DEFAULT_REPO_NAME};

#[async_trait]
pub trait InstallationStore: Send + Sync {
	/// Insert the installation unless it already exists. Returns `true` when a row was created.
	async fn record_installation(
		&self,
		github_installation_id: i64,
		account_name: &str,
	) -> Result<bool, DbError>;
	async fn get_installation_by_github_id(
		&self,
		github_installation_id: i64,
	) -> Result<Option<Installation>, DbError>;
	async fn count_installations(&self) -> Result<i64, DbError>;
}

#[async_trait]
impl InstallationStore for InstallationRepository {
	async fn record_installation(
		&self,
		github_installation_id: i64,
		account_name: &str,
	) -> Result<bool, DbError> {
		self
			.record_installation(github_installation_id, account_name)
			.await
	}

	async fn get_installation_by_github_id(
		&self,
		github_installation_id: i64,
	) -> Result<Option<Installation>, DbError> {
		self
			.get_installation_by_github_id(github_installation_id)
			.await
	}

	async fn count_installations(&self) -> Result<i64, DbError> {
		self.count_installations().await
	}
}

#[derive(Clone)]
pub struct InstallationRepository {
	pool: SqlitePool,
}

impl InstallationRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self))]
	pub async fn record_installation(
		&self,
		github_installation_id: i64,
		account_name: &str,
	) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			INSERT INTO installations (
				github_installation_id, account_name, repo_name, intent_text, created_at
			) VALUES (?1, ?2, ?3, ?4, ?5)
			ON CONFLICT(github_installation_id) DO NOTHING
			"#,
		)
		.bind(github_installation_id)
		.bind(account_name)
		.bind(DEFAULT_REPO_NAME)
		.bind(DEFAULT_INTENT_TEXT)
		.bind(now_timestamp())
		.execute(&self.pool)
		.await?;

		let inserted = result.rows_affected() > 0;
		if inserted {
			tracing::info!(github_installation_id, account_name, "installation: recorded");
		} else {
			tracing::debug!(github_installation_id, "installation: already recorded");
		}

		Ok(inserted)
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_installation_by_github_id(
		&self,
		github_installation_id: i64,
	) -> Result<Option<Installation>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, github_installation_id, account_name, repo_name, intent_text, created_at
			FROM installations
			WHERE github_installation_id = ?1
			"#,
		)
		.bind(github_installation_id)
		.fetch_optional(&self.pool)
		.await?;

		Ok(row.map(|row| Installation {
			id: row.get("id"),
			github_installation_id: row.get("github_installation_id"),
			account_name: row.get("account_name"),
			repo_name: row.get("repo_name"),
			intent_text: row.get("intent_text"),
			created_at: row.get("created_at"),
		}))
	}

	#[tracing::instrument(skip(self))]
	pub async fn count_installations(&self) -> Result<i64, DbError> {
		let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM installations")
			.fetch_one(&self.pool)
			.await?;
		Ok(count)
	}
}
