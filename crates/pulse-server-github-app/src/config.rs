// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Configuration for GitHub App client.

use pulse_common_config::{Secret, SecretString};
use reqwest::Url;
use tracing::warn;

use crate::error::GithubAppError;

const DEFAULT_BASE_URL: &str = "https://api.github.com/";

/// Configuration for the GitHub App client.
///
/// The private key and webhook secret are [`SecretString`]s and never appear in
/// `Debug` output.
#[derive(Clone)]
pub struct GithubAppConfig {
	app_id: u64,
	private_key_pem: SecretString,
	webhook_secret: Option<SecretString>,
	/// Always ends with `/` so relative joins keep any `/api/v3` prefix.
	base_url: Url,
}

impl std::fmt::Debug for GithubAppConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("GithubAppConfig")
			.field("app_id", &self.app_id)
			.field("private_key_pem", &self.private_key_pem)
			.field("webhook_secret", &self.webhook_secret)
			.field("base_url", &self.base_url.as_str())
			.finish()
	}
}

impl GithubAppConfig {
	/// Parse a base URL, requiring https and a non-loopback host.
	pub fn validate_base_url(raw: &str) -> Result<Url, GithubAppError> {
		let mut url = Url::parse(raw)
			.map_err(|e| GithubAppError::Config(format!("Invalid GitHub base URL '{raw}': {e}")))?;

		if url.scheme() != "https" {
			return Err(GithubAppError::Config(format!(
				"GitHub base URL must use https, got '{}'",
				url.scheme()
			)));
		}

		let host = url
			.host_str()
			.ok_or_else(|| GithubAppError::Config("GitHub base URL must include a host".to_string()))?;

		if host == "localhost" || host == "127.0.0.1" || host == "[::1]" {
			return Err(GithubAppError::Config(
				"GitHub base URL must not be localhost".to_string(),
			));
		}

		if !url.path().ends_with('/') {
			let path = format!("{}/", url.path());
			url.set_path(&path);
		}

		Ok(url)
	}

	/// Configuration against `https://api.github.com` with no webhook secret.
	pub fn new(app_id: u64, private_key_pem: impl Into<String>) -> Self {
		Self {
			app_id,
			private_key_pem: Secret::new(private_key_pem.into()),
			webhook_secret: None,
			base_url: default_base_url(),
		}
	}

	/// Point the client at a GitHub Enterprise API root.
	///
	/// An invalid URL is logged and the previous value is kept.
	pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
		let url_str = url.into();
		match Self::validate_base_url(&url_str) {
			Ok(validated) => self.base_url = validated,
			Err(e) => {
				warn!(error = %e, url = %url_str, "Invalid base_url in with_base_url, keeping previous value");
			}
		}
		self
	}

	pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
		self.webhook_secret = Some(Secret::new(secret.into()));
		self
	}

	pub fn app_id(&self) -> u64 {
		self.app_id
	}

	pub(crate) fn private_key_pem(&self) -> &str {
		self.private_key_pem.expose()
	}

	pub fn webhook_secret(&self) -> Option<&str> {
		self.webhook_secret.as_ref().map(|s| s.expose().as_str())
	}

	pub fn base_url(&self) -> &Url {
		&self.base_url
	}
}

fn default_base_url() -> Url {
	Url::parse(DEFAULT_BASE_URL).expect("default URL is valid")
}
