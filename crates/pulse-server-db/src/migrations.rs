// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Schema migrations. Every statement is idempotent, so this runs on each start.

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const MIGRATIONS: &[(&str, &str)] = &[
	(
		"001_create_installations",
		include_str!("../migrations/001_create_installations.sql"),
	),
	(
		"002_create_analysis_logs",
		include_str!("../migrations/002_create_analysis_logs.sql"),
	),
];

#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	for (name, sql) in MIGRATIONS {
		for stmt in statements(sql) {
			sqlx::query(stmt).execute(pool).await?;
		}
		tracing::debug!(migration = name, "migration applied");
	}

	tracing::info!(count = MIGRATIONS.len(), "database migrations complete");
	Ok(())
}

/// Split a migration file into statements, dropping comment-only fragments.
fn statements(sql: &str) -> impl Iterator<Item = &str> {
	sql.split(';').filter(|stmt| {
		stmt
			.lines()
			.map(str::trim)
			.any(|line| !line.is_empty() && !line.starts_with("--"))
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;

	#[test]
	fn comment_header_is_not_a_statement() {
		let sql = "-- header\n-- more\n\nCREATE TABLE t (id INTEGER);\n\nCREATE INDEX i ON t(id);\n";
		let stmts: Vec<&str> = statements(sql).collect();
		assert_eq!(stmts.len(), 2);
		assert!(stmts[0].contains("CREATE TABLE"));
	}

	#[tokio::test]
	async fn migrations_are_idempotent() {
		let pool = create_test_pool().await;
		run_migrations(&pool).await.unwrap();
		run_migrations(&pool).await.unwrap();

		let tables: Vec<(String,)> = sqlx::query_as(
			"SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('installations', 'analysis_logs') ORDER BY name",
		)
		.fetch_all(&pool)
		.await
		.unwrap();
		assert_eq!(
			tables,
			vec![("analysis_logs".to_string(),), ("installations".to_string(),)]
		);
	}
}
