// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! OpenRouter chat completions client.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, info, instrument, trace};

use crate::error::LlmError;
use crate::types::{
	ChatCompletionRequest, ChatCompletionResponse, CompletionRequest, CompletionResponse,
	ErrorEnvelope, OpenRouterConfig,
};

/// A single-shot, non-streaming chat completion service.
#[async_trait]
pub trait CompletionClient: Send + Sync {
	/// Returns the first choice's message content. A response with no choices
	/// or an empty message is [`LlmError::InvalidResponse`].
	async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// OpenRouter API client.
///
/// Requests are not repeated on failure; the configured timeout bounds the
/// whole exchange.
pub struct OpenRouterClient {
	config: OpenRouterConfig,
	http_client: Client,
}

impl OpenRouterClient {
	pub fn new(config: OpenRouterConfig) -> Result<Self, LlmError> {
		if config.api_key.expose().trim().is_empty() {
			return Err(LlmError::MissingApiKey);
		}

		let http_client = pulse_common_http::builder_with_timeout(config.timeout)
			.build()
			.map_err(|e| LlmError::Http(e.to_string()))?;

		info!(
				model = %config.model,
				base_url = %config.base_url,
				timeout_secs = config.timeout.as_secs(),
				"Initialized OpenRouter client"
		);

		Ok(Self {
			config,
			http_client,
		})
	}

	pub fn model(&self) -> &str {
		&self.config.model
	}

	fn build_request(&self, request: CompletionRequest) -> reqwest::RequestBuilder {
		let wire = ChatCompletionRequest::from_completion_request(&self.config.model, request);
		let url = format!("{}/chat/completions", self.config.base_url);

		trace!(
				url = %url,
				model = %wire.model,
				message_count = wire.messages.len(),
				json_object = wire.response_format.is_some(),
				"Building OpenRouter request"
		);

		let mut builder = self
			.http_client
			.post(&url)
			.bearer_auth(self.config.api_key.expose())
			.json(&wire);

		if let Some(title) = &self.config.app_title {
			builder = builder.header("X-Title", title);
		}

		builder
	}

	async fn handle_error_response(&self, response: reqwest::Response) -> LlmError {
		let status = response.status();
		let status_code = status.as_u16();

		debug!(status = %status, "Received error response from OpenRouter");

		if status_code == 401 {
			return LlmError::Api("Authentication failed".to_string());
		}

		if status_code == 429 {
			let retry_after = response
				.headers()
				.get("retry-after")
				.and_then(|v| v.to_str().ok())
				.and_then(|v| v.parse().ok());

			return LlmError::RateLimited {
				retry_after_secs: retry_after,
			};
		}

		match response.json::<ErrorEnvelope>().await {
			Ok(envelope) => {
				error!(
						code = ?envelope.error.code,
						message = %envelope.error.message,
						"OpenRouter API error"
				);
				LlmError::Api(envelope.error.message)
			}
			Err(e) => {
				error!(status = %status, parse_error = %e, "Failed to parse OpenRouter error response");
				LlmError::Api(format!("HTTP {status}"))
			}
		}
	}
}

#[async_trait]
impl CompletionClient for OpenRouterClient {
	#[instrument(skip(self, request), fields(model = %self.config.model))]
	async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
		debug!(
			message_count = request.messages.len(),
			"Starting completion request"
		);

		let response = self.build_request(request).send().await.map_err(|e| {
			if e.is_timeout() {
				LlmError::Timeout
			} else {
				LlmError::Http(e.to_string())
			}
		})?;

		if !response.status().is_success() {
			return Err(self.handle_error_response(response).await);
		}

		let body: ChatCompletionResponse = response
			.json()
			.await
			.map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

		trace!(response_id = ?body.id, model = ?body.model, "Received OpenRouter response");

		let content = body
			.choices
			.into_iter()
			.next()
			.ok_or_else(|| LlmError::InvalidResponse("response contained no choices".to_string()))?
			.message
			.content
			.filter(|c| !c.is_empty())
			.ok_or_else(|| LlmError::InvalidResponse("first choice has no content".to_string()))?;

		info!(
				content_len = content.len(),
				input_tokens = body.usage.as_ref().map(|u| u.prompt_tokens).unwrap_or(0),
				output_tokens = body.usage.as_ref().map(|u| u.completion_tokens).unwrap_or(0),
				"Completion request successful"
		);

		Ok(CompletionResponse {
			content,
			model: body.model,
			usage: body.usage,
		})
	}
}
