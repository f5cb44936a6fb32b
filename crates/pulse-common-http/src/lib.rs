// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP client construction.
//!
//! Every outbound call (GitHub, completion service) goes through a client built
//! here so the User-Agent is consistent. GitHub rejects requests without one.

use reqwest::{Client, ClientBuilder};
use std::time::Duration;

const PRODUCT: &str = "featurepulse";

/// Client builder carrying the standard User-Agent.
///
/// ```ignore
/// let client = pulse_common_http::builder()
///     .timeout(Duration::from_secs(30))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

pub fn builder_with_timeout(timeout: Duration) -> ClientBuilder {
	builder().timeout(timeout)
}

/// `featurepulse/{version} ({os}-{arch})`
pub fn user_agent() -> String {
	format!(
		"{PRODUCT}/{} ({}-{})",
		env!("CARGO_PKG_VERSION"),
		std::env::consts::OS,
		std::env::consts::ARCH
	)
}
