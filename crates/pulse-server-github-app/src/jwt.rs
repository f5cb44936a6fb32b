// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! App-level JWT used to mint installation access tokens.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::GithubAppError;

/// GitHub caps App JWTs at ten minutes; stay a minute under.
pub const JWT_VALIDITY: Duration = Duration::from_secs(9 * 60);

/// Backdating applied to `iat` to tolerate clock drift against GitHub.
const CLOCK_SKEW: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
	pub(crate) iat: u64,
	pub(crate) exp: u64,
	pub(crate) iss: String,
}

impl Claims {
	fn issued_now(app_id: u64, now: Duration) -> Self {
		Self {
			iat: now.as_secs().saturating_sub(CLOCK_SKEW.as_secs()),
			exp: now.as_secs() + JWT_VALIDITY.as_secs(),
			iss: app_id.to_string(),
		}
	}
}

/// Sign an RS256 JWT identifying the App.
#[instrument(skip(private_key_pem))]
pub fn generate_app_jwt(app_id: u64, private_key_pem: &str) -> Result<String, GithubAppError> {
	let now = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map_err(|e| GithubAppError::Jwt(format!("System time error: {e}")))?;

	let claims = Claims::issued_now(app_id, now);

	let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
		.map_err(|e| GithubAppError::Jwt(format!("Invalid RSA private key: {e}")))?;

	let token = encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
		.map_err(|e| GithubAppError::Jwt(format!("Failed to encode JWT: {e}")))?;

	debug!(app_id, exp = claims.exp, "Generated GitHub App JWT");

	Ok(token)
}
