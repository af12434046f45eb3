// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./names_test.rs"]
mod tests;

use crate::diagnostics::ProcessNameRegistry;
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
struct NameSuggestion {
  name: String,
  confidence: u32,
}

//
// ProcessNames
//

/// In-memory `ProcessNameRegistry` that keeps the most confident name seen for each pid.
#[derive(Debug, Default)]
pub struct ProcessNames {
  names: Mutex<BTreeMap<u32, NameSuggestion>>,
}

impl ProcessNames {
  #[must_use]
  pub fn name(&self, pid: u32) -> Option<String> {
    self.names.lock().get(&pid).map(|s| s.name.clone())
  }

  /// Snapshot of all resolved names ordered by pid.
  #[must_use]
  pub fn snapshot(&self) -> Vec<(u32, String)> {
    self
      .names
      .lock()
      .iter()
      .map(|(pid, suggestion)| (*pid, suggestion.name.clone()))
      .collect()
  }
}

impl ProcessNameRegistry for ProcessNames {
  fn suggest_name(&self, pid: u32, name: &str, confidence: u32) {
    if name.is_empty() {
      return;
    }

    let mut names = self.names.lock();
    let replace = names
      .get(&pid)
      .is_none_or(|current| confidence > current.confidence);
    if replace {
      names.insert(
        pid,
        NameSuggestion {
          name: name.to_owned(),
          confidence,
        },
      );
    }
  }
}
