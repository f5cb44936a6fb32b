// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration primitives shared by every FeaturePulse crate.
//!
//! - [`Secret`] keeps webhook secrets, private keys and API keys out of logs.
//! - [`load_secret_env`] reads a secret from `VAR` or from the file named by `VAR_FILE`.

pub mod env;
pub mod secret;

pub use env::{load_secret_env, require_secret_env, RequiredSecretError, SecretEnvError};
pub use secret::{Secret, SecretString, REDACTED};
