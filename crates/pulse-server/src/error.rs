// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error("Database error: {0}")]
	Db(#[from] pulse_server_db::DbError),

	/// Invalid request (missing headers, unreadable body).
	#[error("Invalid request: {0}")]
	BadRequest(String),

	/// Webhook signature did not verify.
	#[error("Unauthorized: {0}")]
	Unauthorized(String),

	/// A required integration is not configured.
	#[error("Service unavailable: {0}")]
	ServiceUnavailable(String),

	#[error("Internal error: {0}")]
	Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

impl ServerError {
	fn status_and_code(&self) -> (StatusCode, &'static str) {
		match self {
			ServerError::Db(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
			ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
			ServerError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
			ServerError::ServiceUnavailable(_) => {
				(StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
			}
			ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
		}
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let (status, code) = self.status_and_code();

		let message = match &self {
			ServerError::Db(e) => {
				tracing::error!(error = %e, "database error");
				"A database error occurred".to_string()
			}
			ServerError::Internal(m) => {
				tracing::error!(error = %m, "internal error");
				"An internal error occurred".to_string()
			}
			ServerError::BadRequest(m)
			| ServerError::Unauthorized(m)
			| ServerError::ServiceUnavailable(m) => m.clone(),
		};

		(
			status,
			Json(ErrorResponse {
				error: code.to_string(),
				message,
			}),
		)
			.into_response()
	}
}
