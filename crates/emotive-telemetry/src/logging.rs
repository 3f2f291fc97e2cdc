// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Logger installation.

use serde::{Deserialize, Serialize};

/// Logger settings. `RUST_LOG` always wins over `default_filter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset, e.g. `"info"` or
    /// `"emotive_control=debug,info"`.
    pub default_filter: String,
    /// Prefix lines with a millisecond timestamp.
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            timestamps: true,
        }
    }
}

/// Installs `env_logger` as the global logger.
///
/// Returns `false` if a logger was already installed, in which case nothing
/// changes.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let env = env_logger::Env::default().default_filter_or(config.default_filter.as_str());
    let mut builder = env_logger::Builder::from_env(env);
    if config.timestamps {
        builder.format_timestamp_millis();
    } else {
        builder.format_timestamp(None);
    }
    match builder.try_init() {
        Ok(()) => {
            log::debug!("Logger initialized (default filter '{}')", config.default_filter);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_a_no_op() {
        let config = LoggingConfig {
            default_filter: "warn".into(),
            timestamps: false,
        };
        // Another test in this binary may have installed a logger already.
        let _ = init_logging(&config);
        assert!(!init_logging(&config));
    }

    #[test]
    fn test_config_defaults() {
        let config: LoggingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, LoggingConfig::default());
    }
}
