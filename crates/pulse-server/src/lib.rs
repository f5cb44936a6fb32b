// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! FeaturePulse webhook server.
//!
//! Receives GitHub App deliveries, checks pull request diffs against the
//! repository's intent document with a language model, and reports the verdict
//! back to GitHub as a check run and a comment.

pub mod api;
pub mod deliveries;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod pipeline;
pub mod reporter;
pub mod routes;
pub mod verdict;

pub use api::{create_app_state, create_router, AppState, Integrations, WebhookState};
pub use error::ServerError;
pub use pulse_server_config::ServerConfig;
