// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! `X-Hub-Signature-256` verification.

use tracing::{debug, warn};

use crate::error::GithubAppError;

const PREFIX: &str = "sha256=";

/// Verify the `X-Hub-Signature-256` header (`sha256=<hex>`) against the raw
/// request body.
///
/// `body` must be the bytes exactly as received. Parsing and re-encoding the
/// JSON first will change the digest.
pub fn verify_webhook_signature(
	secret: &str,
	signature_header: &str,
	body: &[u8],
) -> Result<(), GithubAppError> {
	let Some(expected_hex) = signature_header.strip_prefix(PREFIX) else {
		warn!("Invalid webhook signature format: missing 'sha256=' prefix");
		return Err(GithubAppError::InvalidWebhookSignature);
	};

	if pulse_common_webhook::verify_hmac_sha256(secret.as_bytes(), body, expected_hex) {
		debug!("Webhook signature verified");
		Ok(())
	} else {
		warn!("Webhook signature verification failed");
		Err(GithubAppError::InvalidWebhookSignature)
	}
}

/// Header value GitHub would send for `body`. Used by tests and tooling.
pub fn compute_webhook_signature(secret: &str, body: &[u8]) -> String {
	let signature = pulse_common_webhook::compute_hmac_sha256(secret.as_bytes(), body);
	format!("{PREFIX}{signature}")
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	const SECRET: &str = "featurepulse-webhook-secret";
	const BODY: &[u8] = br#"{"action":"opened","number":1}"#;

	#[test]
	fn accepts_signature_from_same_secret() {
		let header = compute_webhook_signature(SECRET, BODY);
		assert!(verify_webhook_signature(SECRET, &header, BODY).is_ok());
	}

	#[test]
	fn header_has_prefix_and_sha256_width() {
		let header = compute_webhook_signature(SECRET, BODY);
		assert!(header.starts_with("sha256="));
		assert_eq!(header.len(), PREFIX.len() + 64);
	}

	#[test]
	fn rejects_sha1_header() {
		let err = verify_webhook_signature(SECRET, "sha1=abc123", BODY).unwrap_err();
		assert!(matches!(err, GithubAppError::InvalidWebhookSignature));
	}

	#[test]
	fn rejects_bare_hex_without_prefix() {
		let bare = pulse_common_webhook::compute_hmac_sha256(SECRET.as_bytes(), BODY);
		assert!(verify_webhook_signature(SECRET, &bare, BODY).is_err());
	}

	#[test]
	fn rejects_zeroed_and_non_hex_signatures() {
		let zeros = format!("sha256={}", "0".repeat(64));
		assert!(verify_webhook_signature(SECRET, &zeros, BODY).is_err());
		assert!(verify_webhook_signature(SECRET, "sha256=not-valid-hex", BODY).is_err());
	}

	#[test]
	fn rejects_wrong_secret() {
		let header = compute_webhook_signature(SECRET, BODY);
		assert!(verify_webhook_signature("another-secret", &header, BODY).is_err());
	}

	proptest! {
		#[test]
		fn valid_header_always_verifies(
			secret in "[a-zA-Z0-9]{8,64}",
			body in proptest::collection::vec(any::<u8>(), 1..1000)
		) {
			let header = compute_webhook_signature(&secret, &body);
			prop_assert!(verify_webhook_signature(&secret, &header, &body).is_ok());
		}

		#[test]
		fn single_byte_body_change_fails(
			secret in "[a-zA-Z0-9]{8,64}",
			body in proptest::collection::vec(any::<u8>(), 1..500),
			index in any::<prop::sample::Index>()
		) {
			let header = compute_webhook_signature(&secret, &body);
			let mut tampered = body.clone();
			let i = index.index(tampered.len());
			tampered[i] = tampered[i].wrapping_add(1);
			prop_assert!(verify_webhook_signature(&secret, &header, &tampered).is_err());
		}

		#[test]
		fn single_hex_digit_change_fails(
			secret in "[a-zA-Z0-9]{8,64}",
			body in proptest::collection::vec(any::<u8>(), 0..500),
			index in 0usize..64
		) {
			let header = compute_webhook_signature(&secret, &body);
			let mut chars: Vec<char> = header.chars().collect();
			let pos = PREFIX.len() + index;
			chars[pos] = if chars[pos] == '0' { '1' } else { '0' };
			let tampered: String = chars.into_iter().collect();
			prop_assert!(verify_webhook_signature(&secret, &tampered, &body).is_err());
		}
	}
}
