// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod analysis;
mod database;
mod github_app;
mod http;
mod llm;
mod logging;

pub use analysis::*;
pub use database::*;
pub use github_app::*;
pub use http::*;
pub use llm::*;
pub use logging::*;
