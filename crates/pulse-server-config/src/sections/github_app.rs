// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! GitHub App configuration section.

use pulse_common_config::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Configuration layer for the GitHub App (all fields optional for layering).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubAppConfigLayer {
	/// GitHub App numeric ID.
	pub app_id: Option<u64>,
	/// PEM-encoded RSA private key for JWT signing.
	pub private_key_pem: Option<SecretString>,
	/// Secret shared with GitHub for `X-Hub-Signature-256`.
	pub webhook_secret: Option<SecretString>,
	/// Base URL for the GitHub REST API.
	pub base_url: Option<String>,
}

impl GitHubAppConfigLayer {
	pub fn merge(&mut self, other: GitHubAppConfigLayer) {
		if other.app_id.is_some() {
			self.app_id = other.app_id;
		}
		if other.private_key_pem.is_some() {
			self.private_key_pem = other.private_key_pem;
		}
		if other.webhook_secret.is_some() {
			self.webhook_secret = other.webhook_secret;
		}
		if other.base_url.is_some() {
			self.base_url = other.base_url;
		}
	}

	/// Any field set, including a lone webhook secret.
	pub fn has_any_field(&self) -> bool {
		self.app_id.is_some()
			|| self.private_key_pem.is_some()
			|| self.webhook_secret.is_some()
			|| self.base_url.is_some()
	}

	/// Build the final config, returning `None` when nothing is set.
	///
	/// A partially configured app is an error: the webhook route cannot verify
	/// signatures and the pipeline cannot authenticate without all three of
	/// `app_id`, `private_key_pem` and `webhook_secret`.
	pub fn build(self) -> Result<Option<GitHubAppConfig>, ConfigError> {
		if !self.has_any_field() {
			return Ok(None);
		}

		let app_id = self
			.app_id
			.ok_or_else(|| ConfigError::Validation("GitHub App app_id is required".to_string()))?;

		let private_key_pem = self.private_key_pem.ok_or_else(|| {
			ConfigError::Validation(
				"GitHub App private_key_pem is required when app_id is set".to_string(),
			)
		})?;
		if private_key_pem.expose().trim().is_empty() {
			return Err(ConfigError::Validation(
				"GitHub App private_key_pem cannot be empty".to_string(),
			));
		}

		let webhook_secret = self.webhook_secret.ok_or_else(|| {
			ConfigError::Validation(
				"GitHub App webhook_secret is required to accept deliveries".to_string(),
			)
		})?;
		if webhook_secret.expose().is_empty() {
			return Err(ConfigError::Validation(
				"GitHub App webhook_secret cannot be empty".to_string(),
			));
		}

		let base_url = self
			.base_url
			.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
		validate_base_url(&base_url)?;

		Ok(Some(GitHubAppConfig {
			app_id,
			private_key_pem,
			webhook_secret,
			base_url,
		}))
	}
}

fn validate_base_url(url: &str) -> Result<(), ConfigError> {
	if !url.starts_with("https://") {
		return Err(ConfigError::Validation(format!(
			"GitHub App base_url must use HTTPS, got: {url}"
		)));
	}

	if url.contains("localhost") || url.contains("127.0.0.1") || url.contains("::1") {
		return Err(ConfigError::Validation(
			"GitHub App base_url must not be localhost".to_string(),
		));
	}

	Ok(())
}

/// Validated GitHub App configuration.
#[derive(Debug, Clone)]
pub struct GitHubAppConfig {
	app_id: u64,
	private_key_pem: SecretString,
	webhook_secret: SecretString,
	base_url: String,
}

impl GitHubAppConfig {
	pub fn app_id(&self) -> u64 {
		self.app_id
	}

	pub fn private_key_pem(&self) -> &str {
		self.private_key_pem.expose()
	}

	pub fn webhook_secret(&self) -> &str {
		self.webhook_secret.expose()
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}
}
