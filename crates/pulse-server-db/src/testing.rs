// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::migrations::run_migrations;

/// Single-connection in-memory pool with the full schema.
pub async fn create_test_pool() -> SqlitePool {
	let options = SqliteConnectOptions::from_str(":memory:")
		.unwrap()
		.foreign_keys(true);

	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.connect_with(options)
		.await
		.expect("Failed to create test pool");

	run_migrations(&pool).await.unwrap();
	pool
}

pub async fn seed_installation(pool: &SqlitePool, github_installation_id: i64, account_name: &str) {
	sqlx::query(
		"INSERT INTO installations (github_installation_id, account_name, created_at) VALUES (?1, ?2, ?3)",
	)
	.bind(github_installation_id)
	.bind(account_name)
	.bind(crate::types::now_timestamp())
	.execute(pool)
	.await
	.unwrap();
}
