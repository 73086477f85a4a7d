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

//! Runtime configuration of a [`Context`](crate::context::Context).

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for event dispatch and persistence.
///
/// Every field has a default, so a configuration file only needs to list
/// the values it changes:
///
/// ```rust
/// use dry_core::config::ContextConfig;
///
/// let config = ContextConfig::from_ron_str("(max_event_depth: 8)").unwrap();
/// assert_eq!(config.max_event_depth, 8);
/// assert!(config.isolate_handler_panics);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Catch panics raised by event handlers, log them and keep dispatching.
    pub isolate_handler_panics: bool,
    /// Maximum nesting of `send_event` calls. Sends beyond this depth are dropped.
    pub max_event_depth: usize,
    /// Log unknown attribute names in text records at `warn` instead of `debug`.
    pub warn_on_unknown_attributes: bool,
    /// Emit indented text records.
    pub pretty_text: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            isolate_handler_panics: true,
            max_event_depth: 64,
            warn_on_unknown_attributes: true,
            pretty_text: true,
        }
    }
}

impl ContextConfig {
    /// Parses a configuration from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        ron::de::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reads a configuration from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    /// Formats this configuration as pretty RON.
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        let pretty_config = ron::ser::PrettyConfig::default().indentor("  ".to_string());
        ron::ser::to_string_pretty(self, pretty_config).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
