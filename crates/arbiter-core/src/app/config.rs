//! DispatchConfig - dispatcher の設定
//!
//! JSON で書き、欠けた項目は既定値で埋めます。
//!
//! ```json
//! {
//!   "traits": { "minimum": 0.0, "maximum": 1.0 },
//!   "intent_threshold": 0.3,
//!   "case_insensitive_patterns": true,
//!   "method_score": 1.0
//! }
//! ```

use std::cmp::Ordering;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scorable::ScoreTraits;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Normalized score range inside a priority band.
    pub traits: ScoreTraits,
    /// Intents scoring below this never reach their handlers.
    pub intent_threshold: f64,
    pub case_insensitive_patterns: bool,
    /// Score of a band's plain handler group.
    pub method_score: f64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            traits: ScoreTraits::NORMALIZED,
            intent_threshold: 0.0,
            case_insensitive_patterns: true,
            method_score: 1.0,
        }
    }
}

impl DispatchConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let traits = self.traits;
        if traits.minimum.partial_cmp(&traits.maximum) != Some(Ordering::Less) {
            return Err(ConfigError::Invalid(format!(
                "score range [{}, {}] is empty",
                traits.minimum, traits.maximum
            )));
        }
        if !traits.contains(self.intent_threshold) {
            return Err(ConfigError::Invalid(format!(
                "intent_threshold {} is outside [{}, {}]",
                self.intent_threshold, traits.minimum, traits.maximum
            )));
        }
        if !traits.contains(self.method_score) {
            return Err(ConfigError::Invalid(format!(
                "method_score {} is outside [{}, {}]",
                self.method_score, traits.minimum, traits.maximum
            )));
        }
        Ok(())
    }
}
