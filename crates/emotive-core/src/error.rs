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

//! Contract errors raised at the public boundaries of the engine.
//!
//! These signal caller bugs (an invalid target frame rate, a misspelled
//! feature name) and are always returned to the caller. Conditions that occur
//! during normal degraded operation are reported as values instead.

use thiserror::Error;

/// A violated precondition on a public operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractError {
    /// The requested frame rate is not a finite, strictly positive number.
    #[error("invalid target fps {0}: expected a finite value greater than zero")]
    InvalidTargetFps(f64),
    /// A priority ordinal outside the known tiers.
    #[error("invalid priority ordinal {0}: expected 0 (critical) through 4 (idle)")]
    InvalidPriority(u8),
    /// A feature name that the degradation controller does not know.
    #[error("unknown feature '{0}'")]
    UnknownFeature(String),
    /// A particle behavior tag with no matching behavior.
    #[error("unknown particle behavior '{0}'")]
    UnknownBehavior(String),
    /// A degradation level name or index that does not exist.
    #[error("unknown degradation level '{0}'")]
    UnknownLevel(String),
    /// A performance sample carrying non-finite or negative readings.
    #[error("invalid performance sample: {0}")]
    InvalidSample(String),
}

/// A specialized `Result` for boundary operations.
pub type ContractResult<T> = Result<T, ContractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_offending_value() {
        let err = ContractError::InvalidTargetFps(-3.0);
        assert!(err.to_string().contains("-3"));

        let err = ContractError::UnknownFeature("sparkles".into());
        assert_eq!(err.to_string(), "unknown feature 'sparkles'");
    }
}
