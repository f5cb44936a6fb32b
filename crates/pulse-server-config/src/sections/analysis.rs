// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Analysis pipeline tunables.

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_MAX_DIFF_CHARS: usize = 5000;
pub const DEFAULT_CHECK_RUN_NAME: &str = "FeaturePulse Guard";
pub const DEFAULT_INTENT_PATHS: [&str; 2] = [".featurepulse/intent.md", "intent.md"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
	/// Diff prefix length, in characters, sent to the model.
	pub max_diff_chars: usize,
	pub check_run_name: String,
	/// Candidate intent document paths, tried in order.
	pub intent_paths: Vec<String>,
}

impl Default for AnalysisConfig {
	fn default() -> Self {
		Self {
			max_diff_chars: DEFAULT_MAX_DIFF_CHARS,
			check_run_name: DEFAULT_CHECK_RUN_NAME.to_string(),
			intent_paths: default_intent_paths(),
		}
	}
}

fn default_intent_paths() -> Vec<String> {
	DEFAULT_INTENT_PATHS.iter().map(|p| p.to_string()).collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisConfigLayer {
	#[serde(default)]
	pub max_diff_chars: Option<usize>,
	#[serde(default)]
	pub check_run_name: Option<String>,
	#[serde(default)]
	pub intent_paths: Option<Vec<String>>,
}

impl AnalysisConfigLayer {
	pub fn merge(&mut self, other: AnalysisConfigLayer) {
		if other.max_diff_chars.is_some() {
			self.max_diff_chars = other.max_diff_chars;
		}
		if other.check_run_name.is_some() {
			self.check_run_name = other.check_run_name;
		}
		if other.intent_paths.is_some() {
			self.intent_paths = other.intent_paths;
		}
	}

	pub fn finalize(self) -> Result<AnalysisConfig, ConfigError> {
		let max_diff_chars = self.max_diff_chars.unwrap_or(DEFAULT_MAX_DIFF_CHARS);
		if max_diff_chars == 0 {
			return Err(ConfigError::InvalidValue {
				key: "analysis.max_diff_chars".to_string(),
				message: "must be greater than zero".to_string(),
			});
		}

		let intent_paths = self.intent_paths.unwrap_or_else(default_intent_paths);
		if intent_paths.iter().all(|p| p.trim().is_empty()) {
			return Err(ConfigError::Validation(
				"analysis.intent_paths must name at least one path".to_string(),
			));
		}

		Ok(AnalysisConfig {
			max_diff_chars,
			check_run_name: self
				.check_run_name
				.unwrap_or_else(|| DEFAULT_CHECK_RUN_NAME.to_string()),
			intent_paths: intent_paths
				.into_iter()
				.map(|p| p.trim().trim_start_matches('/').to_string())
				.filter(|p| !p.is_empty())
				.collect(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults() {
		let config = AnalysisConfigLayer::default().finalize().unwrap();
		assert_eq!(config, AnalysisConfig::default());
		assert_eq!(
			config.intent_paths,
			vec![".featurepulse/intent.md", "intent.md"]
		);
	}

	#[test]
	fn intent_paths_are_normalized() {
		let layer = AnalysisConfigLayer {
			intent_paths: Some(vec![" /docs/intent.md".to_string(), "".to_string()]),
			..Default::default()
		};
		let config = layer.finalize().unwrap();
		assert_eq!(config.intent_paths, vec!["docs/intent.md"]);
	}

	#[test]
	fn empty_intent_paths_rejected() {
		let layer = AnalysisConfigLayer {
			intent_paths: Some(vec![]),
			..Default::default()
		};
		assert!(layer.finalize().is_err());
	}

	#[test]
	fn zero_diff_budget_rejected() {
		let layer = AnalysisConfigLayer {
			max_diff_chars: Some(0),
			..Default::default()
		};
		assert!(layer.finalize().is_err());
	}

	#[test]
	fn deserialize_partial_toml() {
		let layer: AnalysisConfigLayer = toml::from_str("max_diff_chars = 8000\n").unwrap();
		assert_eq!(layer.max_diff_chars, Some(8000));
		assert!(layer.intent_paths.is_none());
	}
}
