// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use super::*;
use crate::diagnostics::MockDiagnosticSink;
use pretty_assertions::assert_eq;

#[test]
fn section_lines() {
  let section = Section::from_text("PROCESSES", "USER PID PPID\nroot 1 0\n");
  assert_eq!("PROCESSES", section.name());
  assert_eq!(2, section.line_count());
  assert_eq!(Some("root 1 0"), section.line(1));
  assert_eq!(None, section.line(2));
}

#[test]
fn find_first_prefers_primary() {
  let sections: SectionMap = [
    Section::from_text("PROCESSES", "fallback"),
    Section::from_text("PROCESSES AND THREADS", "primary"),
  ]
  .into_iter()
  .collect();

  let mut sink = MockDiagnosticSink::new();
  sink.expect_report().never();

  let found = find_first(&sections, &["PROCESSES AND THREADS", "PROCESSES"], &sink).unwrap();
  assert_eq!("PROCESSES AND THREADS", found.name());
}

#[test]
fn find_first_falls_back_and_reports_missing() {
  let sections: SectionMap = std::iter::once(Section::from_text("PROCESSES", "fallback")).collect();

  let mut sink = MockDiagnosticSink::new();
  sink
    .expect_report()
    .withf(|severity, message| {
      *severity == Severity::NOTICE && message.contains("PROCESSES AND THREADS")
    })
    .times(1)
    .return_const(());

  let found = find_first(&sections, &["PROCESSES AND THREADS", "PROCESSES"], &sink).unwrap();
  assert_eq!("PROCESSES", found.name());
}

#[test]
fn find_first_none() {
  let sections = SectionMap::default();
  let mut sink = MockDiagnosticSink::new();
  sink.expect_report().times(2).return_const(());

  assert!(find_first(&sections, &["A", "B"], &sink).is_none());
}
