// ABOUTME: Environment configuration management for the Solace client core
// ABOUTME: Handles environment variables and runtime configuration parsing
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Environment-based configuration management

use crate::identity::SignOutBehavior;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::info;

/// Environment variable for the mood-history analysis window
const ANALYSIS_WINDOW_ENV: &str = "SOLACE_ANALYSIS_WINDOW";

/// Environment variable selecting sign-out semantics
const SIGN_OUT_BEHAVIOR_ENV: &str = "SOLACE_SIGN_OUT_BEHAVIOR";

/// Environment variable for the device storage namespace
const STORAGE_NAMESPACE_ENV: &str = "SOLACE_STORAGE_NAMESPACE";

/// Default number of most-recent mood entries pulled for analysis
const DEFAULT_ANALYSIS_WINDOW: usize = 30;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Most-recent mood entries considered by the insight engine
    pub analysis_window: usize,
    /// What an explicit sign-out does to a coexisting anonymous identity
    pub sign_out_behavior: SignOutBehavior,
    /// Namespace for the file-backed device key-value store
    pub storage_namespace: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            analysis_window: DEFAULT_ANALYSIS_WINDOW,
            sign_out_behavior: SignOutBehavior::default(),
            storage_namespace: "solace".into(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable
    #[must_use]
    pub fn from_env() -> Self {
        let analysis_window = env::var(ANALYSIS_WINDOW_ENV)
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|w| *w > 0)
            .unwrap_or(DEFAULT_ANALYSIS_WINDOW);

        let sign_out_behavior = env::var(SIGN_OUT_BEHAVIOR_ENV)
            .ok()
            .map(|v| SignOutBehavior::from_str_or_default(&v))
            .unwrap_or_default();

        let storage_namespace =
            env::var(STORAGE_NAMESPACE_ENV).unwrap_or_else(|_| "solace".into());

        let config = Self {
            analysis_window,
            sign_out_behavior,
            storage_namespace,
        };

        info!(
            analysis_window = config.analysis_window,
            sign_out_behavior = %config.sign_out_behavior,
            "client configuration loaded"
        );

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_defaults_without_environment() {
        env::remove_var(ANALYSIS_WINDOW_ENV);
        env::remove_var(SIGN_OUT_BEHAVIOR_ENV);
        env::remove_var(STORAGE_NAMESPACE_ENV);

        let config = ClientConfig::from_env();
        assert_eq!(config.analysis_window, DEFAULT_ANALYSIS_WINDOW);
        assert_eq!(
            config.sign_out_behavior,
            SignOutBehavior::EndAuthenticatedOnly
        );
        assert_eq!(config.storage_namespace, "solace");
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        env::set_var(ANALYSIS_WINDOW_ENV, "14");
        env::set_var(SIGN_OUT_BEHAVIOR_ENV, "exit-anonymous");

        let config = ClientConfig::from_env();
        assert_eq!(config.analysis_window, 14);
        assert_eq!(config.sign_out_behavior, SignOutBehavior::ExitAnonymousToo);

        env::remove_var(ANALYSIS_WINDOW_ENV);
        env::remove_var(SIGN_OUT_BEHAVIOR_ENV);
    }

    #[test]
    #[serial]
    fn test_invalid_window_falls_back() {
        env::set_var(ANALYSIS_WINDOW_ENV, "zero");
        let config = ClientConfig::from_env();
        assert_eq!(config.analysis_window, DEFAULT_ANALYSIS_WINDOW);
        env::remove_var(ANALYSIS_WINDOW_ENV);
    }
}
