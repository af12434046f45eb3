// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./config_test.rs"]
mod tests;

use serde::Deserialize;
use std::path::Path;

//
// ConfigError
//

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
  #[error("failed to read config: {0}")]
  Io(#[from] std::io::Error),

  #[error("failed to parse config: {0}")]
  Yaml(#[from] serde_yaml::Error),

  #[error("invalid header pattern: {0}")]
  Regex(#[from] regex::Error),
}

//
// ParserConfig
//

/// Tunables for the extractors. Every field has a default so an empty document is valid.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ParserConfig {
  pub processes: PsConfig,
  pub alarms: AlarmConfig,
}

impl ParserConfig {
  pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
    // serde_yaml rejects an empty document, which we treat as "all defaults".
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    let config: Self = serde_yaml::from_str(contents)?;
    config.processes.header_regex()?;
    Ok(config)
  }

  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Self::from_yaml(&std::fs::read_to_string(path)?)
  }
}

//
// PsConfig
//

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PsConfig {
  /// Candidate section names, tried in order.
  pub sections: Vec<String>,
  pub header_pattern: String,
  /// Number of leading lines searched for the header row.
  pub header_search_lines: usize,
  /// Confidence attached to names reported to the process name registry.
  pub name_confidence: u32,
}

impl PsConfig {
  pub fn header_regex(&self) -> Result<regex::Regex, regex::Error> {
    regex::Regex::new(&self.header_pattern)
  }
}

impl Default for PsConfig {
  fn default() -> Self {
    Self {
      sections: vec!["PROCESSES AND THREADS".to_string(), "PROCESSES".to_string()],
      header_pattern: "USER +PID +(TID +)?PPID".to_string(),
      header_search_lines: 10,
      name_confidence: 10,
    }
  }
}

//
// AlarmConfig
//

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AlarmConfig {
  pub sections: Vec<String>,
  /// Exact text of the node holding the alarm list.
  pub banner: String,
  /// Prefix of the child switching from alarm entries to per package stats.
  pub stats_banner: String,
}

impl Default for AlarmConfig {
  fn default() -> Self {
    Self {
      sections: vec!["DUMP OF SERVICE alarm".to_string()],
      banner: "Current Alarm Manager state:".to_string(),
      stats_banner: "Alarm Stats:".to_string(),
    }
  }
}
