// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Wire types for the OpenAI-compatible chat completions API.

use std::time::Duration;

use pulse_common_config::{Secret, SecretString};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-001";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
	pub api_key: SecretString,
	pub base_url: String,
	pub model: String,
	pub timeout: Duration,
	/// Sent as `X-Title`; OpenRouter uses it for app attribution.
	pub app_title: Option<String>,
}

impl OpenRouterConfig {
	pub fn new(api_key: impl Into<String>) -> Self {
		Self {
			api_key: Secret::new(api_key.into()),
			base_url: DEFAULT_BASE_URL.to_string(),
			model: DEFAULT_MODEL.to_string(),
			timeout: DEFAULT_TIMEOUT,
			app_title: Some("FeaturePulse".to_string()),
		}
	}

	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into().trim_end_matches('/').to_string();
		self
	}

	pub fn with_model(mut self, model: impl Into<String>) -> Self {
		self.model = model.into();
		self
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn with_app_title(mut self, title: Option<String>) -> Self {
		self.app_title = title;
		self
	}
}

/// Provider-neutral request handed to a [`crate::CompletionClient`].
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
	pub messages: Vec<ChatMessage>,
	/// Ask the provider to constrain output to a single JSON object.
	pub json_object: bool,
	pub temperature: Option<f32>,
}

impl CompletionRequest {
	pub fn json_prompt(prompt: impl Into<String>) -> Self {
		Self {
			messages: vec![ChatMessage::user(prompt)],
			json_object: true,
			temperature: None,
		}
	}
}

/// Text of the first choice plus bookkeeping.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
	pub content: String,
	pub model: Option<String>,
	pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseFormat {
	#[serde(rename = "type")]
	pub format_type: String,
}

impl ResponseFormat {
	pub fn json_object() -> Self {
		Self {
			format_type: "json_object".to_string(),
		}
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
	pub model: String,
	pub messages: Vec<ChatMessage>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub response_format: Option<ResponseFormat>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub temperature: Option<f32>,
}

impl ChatCompletionRequest {
	pub fn from_completion_request(model: &str, request: CompletionRequest) -> Self {
		Self {
			model: model.to_string(),
			messages: request.messages,
			response_format: request.json_object.then(ResponseFormat::json_object),
			temperature: request.temperature,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
	pub role: String,
	#[serde(default)]
	pub content: Option<String>,
}

impl ChatMessage {
	pub fn user(content: impl Into<String>) -> Self {
		Self {
			role: "user".to_string(),
			content: Some(content.into()),
		}
	}

	pub fn system(content: impl Into<String>) -> Self {
		Self {
			role: "system".to_string(),
			content: Some(content.into()),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
	#[serde(default)]
	pub id: Option<String>,
	#[serde(default)]
	pub model: Option<String>,
	#[serde(default)]
	pub choices: Vec<ChatChoice>,
	#[serde(default)]
	pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
	#[serde(default)]
	pub index: u32,
	pub message: ChatMessage,
	#[serde(default)]
	pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
	pub prompt_tokens: u32,
	pub completion_tokens: u32,
	#[serde(default)]
	pub total_tokens: u32,
}

/// `{"error": {"message": ..., "code": ...}}`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorEnvelope {
	pub(crate) error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorDetail {
	pub(crate) message: String,
	#[serde(default)]
	pub(crate) code: Option<serde_json::Value>,
}
