// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! Collaborators injected into every extraction call.

//
// Severity
//

/// Numeric diagnostic level. Lower values are more important.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Severity(pub u8);

impl Severity {
  /// A whole section or node is missing and the caller degrades.
  pub const NOTICE: Self = Self(3);
  /// A single row or entry was skipped.
  pub const DETAIL: Self = Self(4);
}

impl std::fmt::Display for Severity {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

//
// DiagnosticSink
//

/// Receives soft failures. Implementations must not fail or block for long.
#[cfg_attr(test, mockall::automock)]
pub trait DiagnosticSink: Send + Sync {
  fn report(&self, severity: Severity, message: &str);
}

//
// LogSink
//

/// Forwards diagnostics to the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
  fn report(&self, severity: Severity, message: &str) {
    if severity <= Severity::NOTICE {
      log::warn!("{message}");
    } else if severity == Severity::DETAIL {
      log::info!("{message}");
    } else {
      log::debug!("[{severity}] {message}");
    }
  }
}

//
// ProcessNameRegistry
//

/// Shared registry of process names. Implementations synchronize internally since several
/// extractors may suggest names concurrently.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessNameRegistry: Send + Sync {
  /// Suggest `name` for `pid`. Higher confidence wins over earlier, weaker suggestions.
  fn suggest_name(&self, pid: u32, name: &str, confidence: u32);
}
