// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use super::*;
use crate::diagnostics::{MockDiagnosticSink, MockProcessNameRegistry};
use crate::names::ProcessNames;
use crate::ps_tree::Parent;
use crate::section::SectionMap;
use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

const PS_FIXTURE: &str = include_str!("../fixtures/ps.txt");

fn quiet_sink() -> MockDiagnosticSink {
  let mut sink = MockDiagnosticSink::new();
  sink.expect_report().never();
  sink
}

fn any_names() -> MockProcessNameRegistry {
  let mut names = MockProcessNameRegistry::new();
  names.expect_suggest_name().return_const(());
  names
}

fn record(pid: u32, ppid: Option<u32>, name: &str) -> ProcessRecord {
  ProcessRecord {
    pid,
    ppid,
    niceness: None,
    scheduling_class: SchedulingClass::Unknown,
    name: name.to_string(),
  }
}

#[test]
fn fixture_builds_hierarchy() {
  let config = PsConfig::default();
  let sections: SectionMap =
    std::iter::once(Section::from_text("PROCESSES AND THREADS", PS_FIXTURE)).collect();

  let mut sink = MockDiagnosticSink::new();
  sink
    .expect_report()
    .withf(|severity, message| {
      *severity == Severity::DETAIL
        && message == "Error parsing line 8: media     330   1     960    420"
    })
    .times(1)
    .return_const(());
  let mut names = MockProcessNameRegistry::new();
  names
    .expect_suggest_name()
    .withf(|_, _, confidence| *confidence == 10)
    .times(7)
    .return_const(());

  let scanner = PsScanner::new(&config, &sink, &names).unwrap();
  let ps = scanner.run(&sections).unwrap();

  assert_eq!("PROCESSES AND THREADS", ps.section);
  assert_eq!(None, ps.aborted_by);

  let hierarchy = &ps.hierarchy;
  assert_eq!(7, hierarchy.len());
  assert_eq!(&[1, 2], hierarchy.root_children());
  assert_eq!(&[512], hierarchy.children(1));
  assert_eq!(&[3, 7], hierarchy.children(2));
  assert_eq!(&[1234, 1301], hierarchy.children(512));
  assert_eq!(Some(Parent::Process(512)), hierarchy.parent(1234));

  assert_eq!(
    Some(&ProcessRecord {
      pid: 1,
      ppid: Some(0),
      niceness: Some(0),
      scheduling_class: SchedulingClass::Normal,
      name: "/init".to_string(),
    }),
    hierarchy.get(1)
  );
  assert_eq!(Some(-20), hierarchy.get(7).unwrap().niceness);
  assert_eq!(
    SchedulingClass::Batch,
    hierarchy.get(1234).unwrap().scheduling_class
  );

  let sync = hierarchy.get(1301).unwrap();
  assert_eq!(Some(10), sync.niceness);
  assert_eq!(SchedulingClass::Fifo, sync.scheduling_class);
  assert_eq!("com.example.sync", sync.name);
}

#[test]
fn falls_back_when_primary_section_missing() {
  let config = PsConfig::default();
  let sections: SectionMap = std::iter::once(Section::from_text(
    "PROCESSES",
    "USER PID PPID NAME\nroot 1 0 init\n",
  ))
  .collect();

  let mut sink = MockDiagnosticSink::new();
  sink
    .expect_report()
    .withf(|severity, message| {
      *severity == Severity::NOTICE
        && message == "Cannot find section: PROCESSES AND THREADS (ignoring it)"
    })
    .times(1)
    .return_const(());
  let names = any_names();

  let ps = PsScanner::new(&config, &sink, &names)
    .unwrap()
    .run(&sections)
    .unwrap();
  assert_eq!("PROCESSES", ps.section);
  assert_eq!(1, ps.hierarchy.len());
}

#[test]
fn falls_back_when_header_not_found() {
  let config = PsConfig::default();
  let sections: SectionMap = [
    Section::from_text("PROCESSES AND THREADS", "ps: permission denied\n"),
    Section::from_text("PROCESSES", "USER PID PPID NAME\nroot 1 0 init\n"),
  ]
  .into_iter()
  .collect();

  let mut sink = MockDiagnosticSink::new();
  sink
    .expect_report()
    .withf(|severity, message| {
      *severity == Severity::DETAIL && message.contains("table header not found")
    })
    .times(1)
    .return_const(());
  let names = any_names();

  let ps = PsScanner::new(&config, &sink, &names)
    .unwrap()
    .run(&sections)
    .unwrap();
  assert_eq!("PROCESSES", ps.section);
}

#[test]
fn none_when_every_candidate_fails() {
  let config = PsConfig::default();
  let mut sink = MockDiagnosticSink::new();
  sink
    .expect_report()
    .withf(|severity, _| *severity == Severity::NOTICE)
    .times(2)
    .return_const(());
  let names = any_names();

  assert!(
    PsScanner::new(&config, &sink, &names)
      .unwrap()
      .run(&SectionMap::default())
      .is_none()
  );
}

#[test]
fn malformed_pid_keeps_earlier_rows() {
  let config = PsConfig::default();
  let section = Section::from_text(
    "PROCESSES",
    "USER PID PPID NAME\nroot 1 0 init\nroot x 0 broken\nroot 3 0 never\n",
  );

  let mut sink = MockDiagnosticSink::new();
  sink
    .expect_report()
    .withf(|severity, _| *severity == Severity::DETAIL)
    .times(1)
    .return_const(());
  let names = any_names();

  let scan = PsScanner::new(&config, &sink, &names)
    .unwrap()
    .scan(&section)
    .unwrap();
  assert_eq!(vec![record(1, Some(0), "init")], scan.records);
  assert_matches!(
    scan.aborted_by,
    Some(Error::MalformedRow { column: "pid", value, line })
      if value == "x" && line == "root x 0 broken"
  );
}

#[test]
fn malformed_nice_aborts() {
  let config = PsConfig::default();
  let section = Section::from_text("PROCESSES", "USER PID PPID NICE NAME\nroot 1 0 high init\n");
  let mut sink = MockDiagnosticSink::new();
  sink.expect_report().times(1).return_const(());
  let names = any_names();

  let scan = PsScanner::new(&config, &sink, &names)
    .unwrap()
    .scan(&section)
    .unwrap();
  assert!(scan.records.is_empty());
  assert_matches!(
    scan.aborted_by,
    Some(Error::MalformedRow { column: "nice", .. })
  );
}

#[test]
fn malformed_ppid_aborts() {
  let config = PsConfig::default();
  let section = Section::from_text("PROCESSES", "USER PID PPID NAME\nroot 1 x init\n");
  let mut sink = MockDiagnosticSink::new();
  sink
    .expect_report()
    .withf(|severity, _| *severity == Severity::DETAIL)
    .times(1)
    .return_const(());
  let names = any_names();

  let scan = PsScanner::new(&config, &sink, &names)
    .unwrap()
    .scan(&section)
    .unwrap();
  assert!(scan.records.is_empty());
  assert_matches!(
    scan.aborted_by,
    Some(Error::MalformedRow { column: "ppid", value, .. }) if value == "x"
  );
}

#[test]
fn negative_ppid_is_unknown() {
  let config = PsConfig::default();
  let section = Section::from_text("PROCESSES", "USER PID PPID NAME\nroot 0 -1 swapper\n");
  let sink = quiet_sink();
  let names = any_names();

  let scan = PsScanner::new(&config, &sink, &names)
    .unwrap()
    .scan(&section)
    .unwrap();
  assert_eq!(vec![record(0, None, "swapper")], scan.records);
}

#[test]
fn absent_optional_columns_use_sentinels() {
  let config = PsConfig::default();
  let section = Section::from_text("PROCESSES", "USER PID PPID CMD\nroot 1 0 S /init --second-stage\n");
  let sink = quiet_sink();
  let names = any_names();

  let scan = PsScanner::new(&config, &sink, &names)
    .unwrap()
    .scan(&section)
    .unwrap();
  assert_eq!(
    vec![record(1, Some(0), "/init --second-stage")],
    scan.records
  );
}

#[test]
fn unrecognized_policy_is_other() {
  let config = PsConfig::default();
  let section = Section::from_text(
    "PROCESSES",
    "USER PID PPID NICE PCY NAME\nroot 1 0 0 ta init\nroot 2 0 0 fg kthreadd\n",
  );
  let sink = quiet_sink();
  let names = any_names();

  let scan = PsScanner::new(&config, &sink, &names)
    .unwrap()
    .scan(&section)
    .unwrap();
  let classes: Vec<_> = scan.records.iter().map(|r| r.scheduling_class).collect();
  assert_eq!(vec![SchedulingClass::Other, SchedulingClass::Normal], classes);
}

#[test]
fn short_row_policy_before_start_is_unknown() {
  let config = PsConfig {
    header_pattern: "PID".to_string(),
    ..Default::default()
  };
  let section = Section::from_text("PROCESSES", "PCY PID PPID X NAME\nfg 1 0 init\n");
  let sink = quiet_sink();
  let names = any_names();

  let scan = PsScanner::new(&config, &sink, &names)
    .unwrap()
    .scan(&section)
    .unwrap();
  assert_eq!(vec![record(1, Some(0), "init")], scan.records);
}

#[test]
fn duplicate_pid_replaces_in_place() {
  let config = PsConfig::default();
  let section = Section::from_text(
    "PROCESSES",
    "USER PID PPID NAME\nroot 5 0 first\nroot 6 0 other\nroot 5 1 second\n",
  );

  let mut sink = MockDiagnosticSink::new();
  sink
    .expect_report()
    .withf(|severity, message| {
      *severity == Severity::DETAIL && message.starts_with("Duplicate pid 5")
    })
    .times(1)
    .return_const(());
  let names = any_names();

  let scan = PsScanner::new(&config, &sink, &names)
    .unwrap()
    .scan(&section)
    .unwrap();
  assert_eq!(
    vec![record(5, Some(1), "second"), record(6, Some(0), "other")],
    scan.records
  );
}

#[test]
fn names_reach_registry() {
  let config = PsConfig {
    name_confidence: 3,
    ..Default::default()
  };
  let section = Section::from_text(
    "PROCESSES",
    "USER PID PPID NAME\nroot 1 0 S /init\nsystem 512 1 system_server\n",
  );
  let sink = quiet_sink();
  let names = ProcessNames::default();

  PsScanner::new(&config, &sink, &names)
    .unwrap()
    .scan(&section)
    .unwrap();
  assert_eq!(
    vec![(1, "/init".to_string()), (512, "system_server".to_string())],
    names.snapshot()
  );
}

#[test]
fn scheduling_class_tokens() {
  assert_eq!(SchedulingClass::Normal, SchedulingClass::from_policy("fg"));
  assert_eq!(SchedulingClass::Batch, SchedulingClass::from_policy("bg"));
  assert_eq!(SchedulingClass::Fifo, SchedulingClass::from_policy("un"));
  assert_eq!(SchedulingClass::Other, SchedulingClass::from_policy("FG"));
}
