// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Completion service (LLM) configuration.

use std::time::Duration;

use pulse_common_config::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_LLM_MODEL: &str = "google/gemini-2.0-flash-001";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;

/// LLM configuration (runtime, fully resolved).
///
/// `api_key` is optional: without it the server still starts and every verdict
/// takes the fallback path.
#[derive(Debug, Clone)]
pub struct LlmConfig {
	pub api_key: Option<SecretString>,
	pub base_url: String,
	pub model: String,
	pub timeout: Duration,
}

impl LlmConfig {
	pub fn is_configured(&self) -> bool {
		self.api_key.is_some()
	}
}

impl Default for LlmConfig {
	fn default() -> Self {
		Self {
			api_key: None,
			base_url: DEFAULT_LLM_BASE_URL.to_string(),
			model: DEFAULT_LLM_MODEL.to_string(),
			timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
		}
	}
}

/// LLM configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmConfigLayer {
	#[serde(default)]
	pub api_key: Option<SecretString>,
	#[serde(default)]
	pub base_url: Option<String>,
	#[serde(default)]
	pub model: Option<String>,
	#[serde(default)]
	pub timeout_secs: Option<u64>,
}

impl LlmConfigLayer {
	pub fn merge(&mut self, other: LlmConfigLayer) {
		if other.api_key.is_some() {
			self.api_key = other.api_key;
		}
		if other.base_url.is_some() {
			self.base_url = other.base_url;
		}
		if other.model.is_some() {
			self.model = other.model;
		}
		if other.timeout_secs.is_some() {
			self.timeout_secs = other.timeout_secs;
		}
	}

	pub fn finalize(self) -> Result<LlmConfig, ConfigError> {
		let timeout_secs = self.timeout_secs.unwrap_or(DEFAULT_LLM_TIMEOUT_SECS);
		if timeout_secs == 0 {
			return Err(ConfigError::InvalidValue {
				key: "llm.timeout_secs".to_string(),
				message: "must be greater than zero".to_string(),
			});
		}

		Ok(LlmConfig {
			api_key: self.api_key.filter(|key| !key.expose().is_empty()),
			base_url: self
				.base_url
				.unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
			model: self
				.model
				.unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
			timeout: Duration::from_secs(timeout_secs),
		})
	}
}
