// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Error types for GitHub App client.

use thiserror::Error;

/// Errors that can occur when interacting with the GitHub App API.
#[derive(Debug, Error)]
pub enum GithubAppError {
	/// Network-level error during HTTP communication.
	#[error("Network error: {0}")]
	Network(#[from] reqwest::Error),

	#[error("Request timed out")]
	Timeout,

	/// Bad credentials. For installation calls this usually means a stale token.
	#[error("Unauthorized or invalid app configuration")]
	Unauthorized,

	#[error("Forbidden or insufficient permissions")]
	Forbidden,

	#[error("Rate limit exceeded")]
	RateLimited,

	#[error("GitHub API error: {status} - {message}")]
	ApiError { status: u16, message: String },

	#[error("Invalid response from GitHub: {0}")]
	InvalidResponse(String),

	#[error("Configuration error: {0}")]
	Config(String),

	#[error("JWT error: {0}")]
	Jwt(String),

	#[error("Invalid webhook signature")]
	InvalidWebhookSignature,
}

impl GithubAppError {
	pub fn api_error(status: u16, message: impl Into<String>) -> Self {
		Self::ApiError {
			status,
			message: message.into(),
		}
	}

	/// HTTP status reported by GitHub, when the failure came from a response.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Unauthorized => Some(401),
			Self::Forbidden | Self::RateLimited => Some(403),
			Self::ApiError { status, .. } => Some(*status),
			_ => None,
		}
	}
}
