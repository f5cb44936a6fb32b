// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! # pulse-server-db
//!
//! SQLite persistence for FeaturePulse via sqlx: GitHub App installations and
//! the per-pull-request analysis log the dashboard reads.
//!
//! Each table has a `*Store` trait (what handlers depend on) and a
//! `*Repository` struct holding the pool that implements it.
//!
//! | Variant | Meaning |
//! |---------|---------|
//! | `Referential` | An analysis referenced an installation that was never recorded |
//! | `Sqlx` | Anything the database itself rejected |
//! | `Internal` | Stored data that cannot be interpreted |

pub mod analysis;
mod error;
pub mod installation;
pub mod migrations;
pub mod pool;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use analysis::{AnalysisLogRepository, AnalysisLogStore, RECENT_ANALYSES_LIMIT};
pub use error::{DbError, Result};
pub use installation::{InstallationRepository, InstallationStore};
pub use migrations::run_migrations;
pub use pool::{create_pool, ping};
pub use types::{
	AnalysisLog, Decision, Installation, NewAnalysisLog, RecentAnalysis, DEFAULT_INTENT_TEXT,
	DEFAULT_REPO_NAME,
};
