// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! GitHub App client for FeaturePulse.
//!
//! Authenticates as the App (RS256 JWT) and as an installation (cached access
//! tokens), and exposes the handful of REST operations the analysis pipeline
//! needs: reading repository files, fetching pull request diffs, commenting on
//! pull requests and publishing check runs. Webhook payload types and signature
//! verification live here as well.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;
pub mod webhook;

pub use api::GithubApi;
pub use client::GithubAppClient;
pub use config::GithubAppConfig;
pub use error::GithubAppError;
pub use types::{
	CheckRun, CheckRunConclusion, CheckRunOutput, CheckRunStatus, CreateCheckRunRequest,
	FileContents, InstallationAccount, InstallationWebhookPayload, IssueComment,
	PullRequestWebhookPayload, RepositoryOwner, WebhookCommitRef, WebhookInstallation,
	WebhookInstallationRef, WebhookPullRequest, WebhookRepository,
};
pub use webhook::{compute_webhook_signature, verify_webhook_signature};
