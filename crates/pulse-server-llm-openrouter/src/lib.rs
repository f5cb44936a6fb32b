// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Chat completion client for OpenRouter and other OpenAI-compatible
//! `/chat/completions` endpoints.
//!
//! Callers depend on the [`CompletionClient`] trait; [`OpenRouterClient`] is the
//! production implementation.

mod client;
mod error;
mod types;

pub use client::{CompletionClient, OpenRouterClient};
pub use error::LlmError;
pub use types::{
	ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, CompletionRequest,
	CompletionResponse, OpenRouterConfig, ResponseFormat, Usage, DEFAULT_BASE_URL, DEFAULT_MODEL,
	DEFAULT_TIMEOUT,
};
