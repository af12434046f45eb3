// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! Plain text views of the extracted models for inspecting a bugreport from a terminal.

#[cfg(test)]
#[path = "./report_test.rs"]
mod tests;

use bd_bugreport_parsers::ps_tree::ProcessHierarchy;
use bd_bugreport_parsers::{SectionLookup, SectionMap};
use std::fmt::Write;

/// One `<lines> <name>` row per section, sorted by name.
#[must_use]
pub fn section_listing(sections: &SectionMap) -> String {
  let mut names: Vec<_> = sections.names().collect();
  names.sort_unstable();

  let mut out = String::new();
  for name in names {
    let count = sections
      .find_section(name)
      .map_or(0, |section| section.line_count());
    let _ = writeln!(out, "{count:>8} {name}");
  }
  out
}

/// The hierarchy as an indented tree, two spaces per level.
#[must_use]
pub fn process_tree(hierarchy: &ProcessHierarchy) -> String {
  let mut out = String::new();
  for (depth, record) in hierarchy.walk() {
    let niceness = record
      .niceness
      .map_or_else(|| "?".to_string(), |n| n.to_string());
    let _ = writeln!(
      out,
      "{:indent$}{} {} [nice {niceness}, {:?}]",
      "",
      record.pid,
      record.name,
      record.scheduling_class,
      indent = depth * 2
    );
  }
  out
}

/// One `<pid> <name>` row per resolved name.
#[must_use]
pub fn name_listing(names: &[(u32, String)]) -> String {
  let mut out = String::new();
  for (pid, name) in names {
    let _ = writeln!(out, "{pid:>8} {name}");
  }
  out
}
