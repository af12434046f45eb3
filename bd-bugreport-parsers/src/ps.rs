// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./ps_test.rs"]
mod tests;

use crate::config::PsConfig;
use crate::diagnostics::{DiagnosticSink, ProcessNameRegistry, Severity};
use crate::ps_tree::ProcessHierarchy;
use crate::section::{Section, SectionLookup};
use crate::table::{Anchor, ColumnLayout, ColumnSpec, Row, TableScanner};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;

// Older builds print the process state without a header, so it ends up prefixed to the name.
const STATE_PREFIX: &str = "S ";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum PsColumn {
  Pid,
  Ppid,
  Nice,
  Policy,
  Name,
}

impl PsColumn {
  const fn label(self) -> &'static str {
    match self {
      Self::Pid => "pid",
      Self::Ppid => "ppid",
      Self::Nice => "nice",
      Self::Policy => "pcy",
      Self::Name => "name",
    }
  }
}

const PS_COLUMNS: &[ColumnSpec<PsColumn>] = &[
  ColumnSpec {
    key: PsColumn::Pid,
    aliases: &["PID"],
    anchor: Anchor::Leading,
    required: true,
  },
  ColumnSpec {
    key: PsColumn::Ppid,
    aliases: &["PPID"],
    anchor: Anchor::Leading,
    required: false,
  },
  ColumnSpec {
    key: PsColumn::Nice,
    aliases: &["NICE", "NI"],
    anchor: Anchor::Trailing,
    required: false,
  },
  ColumnSpec {
    key: PsColumn::Policy,
    aliases: &["PCY"],
    anchor: Anchor::Trailing,
    required: false,
  },
  ColumnSpec {
    key: PsColumn::Name,
    aliases: &["NAME", "CMD"],
    anchor: Anchor::Trailing,
    required: false,
  },
];

//
// SchedulingClass
//

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SchedulingClass {
  Normal,
  Batch,
  Fifo,
  Other,
  Unknown,
}

impl SchedulingClass {
  /// Maps the `PCY` column token.
  #[must_use]
  pub fn from_policy(token: &str) -> Self {
    match token {
      "fg" => Self::Normal,
      "bg" => Self::Batch,
      "un" => Self::Fifo,
      _ => Self::Other,
    }
  }
}

//
// ProcessRecord
//

/// One row of the process table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProcessRecord {
  pub pid: u32,
  /// `None` when the table has no parent column or the parent id is negative.
  pub ppid: Option<u32>,
  /// `None` when the table has no nice column.
  pub niceness: Option<i32>,
  pub scheduling_class: SchedulingClass,
  pub name: String,
}

//
// PsScan
//

/// Records read from one section. `aborted_by` is set when a malformed numeric column stopped the
/// scan early; the records parsed before that row are kept.
#[derive(Debug, PartialEq)]
pub struct PsScan {
  pub records: Vec<ProcessRecord>,
  pub aborted_by: Option<Error>,
}

//
// PsRecords
//

#[derive(Debug)]
pub struct PsRecords {
  /// Name of the section the records were read from.
  pub section: String,
  pub hierarchy: ProcessHierarchy,
  pub aborted_by: Option<Error>,
}

//
// PsScanner
//

/// Reads the `ps` output of a bugreport.
pub struct PsScanner<'a> {
  config: &'a PsConfig,
  table: TableScanner<PsColumn>,
  sink: &'a dyn DiagnosticSink,
  names: &'a dyn ProcessNameRegistry,
}

impl<'a> PsScanner<'a> {
  pub fn new(
    config: &'a PsConfig,
    sink: &'a dyn DiagnosticSink,
    names: &'a dyn ProcessNameRegistry,
  ) -> Result<Self> {
    let table = TableScanner::new(
      config.header_regex()?,
      PS_COLUMNS,
      config.header_search_lines,
    );
    Ok(Self {
      config,
      table,
      sink,
      names,
    })
  }

  /// Scans the configured sections in order and builds the hierarchy from the first one with a
  /// recognizable header.
  pub fn run(&self, sections: &dyn SectionLookup) -> Option<PsRecords> {
    for name in &self.config.sections {
      let Some(section) = sections.find_section(name) else {
        self.sink.report(
          Severity::NOTICE,
          &format!("Cannot find section: {name} (ignoring it)"),
        );
        continue;
      };

      match self.scan(section) {
        Ok(scan) => {
          return Some(PsRecords {
            section: section.name().to_owned(),
            hierarchy: ProcessHierarchy::build(scan.records, self.sink),
            aborted_by: scan.aborted_by,
          });
        },
        Err(e) => self.sink.report(Severity::DETAIL, &e.to_string()),
      }
    }
    None
  }

  pub fn scan(&self, section: &Section) -> Result<PsScan> {
    let layout = self.table.locate(section)?;

    let mut records: Vec<ProcessRecord> = Vec::new();
    let mut positions: HashMap<u32, usize> = HashMap::new();
    for (index, line) in layout.body(section) {
      let Some(row) = layout.split(line) else {
        self.sink.report(
          Severity::DETAIL,
          &format!("Error parsing line {index}: {line}"),
        );
        continue;
      };

      let record = match Self::parse_record(&layout, &row, line) {
        Ok(record) => record,
        Err(e) => {
          self.sink.report(Severity::DETAIL, &e.to_string());
          return Ok(PsScan {
            records,
            aborted_by: Some(e),
          });
        },
      };

      self
        .names
        .suggest_name(record.pid, &record.name, self.config.name_confidence);

      if let Some(&position) = positions.get(&record.pid) {
        self.sink.report(
          Severity::DETAIL,
          &format!("Duplicate pid {} replaces earlier row: {line}", record.pid),
        );
        records[position] = record;
      } else {
        positions.insert(record.pid, records.len());
        records.push(record);
      }
    }

    Ok(PsScan {
      records,
      aborted_by: None,
    })
  }

  fn parse_record(
    layout: &ColumnLayout<PsColumn>,
    row: &Row<'_>,
    line: &str,
  ) -> Result<ProcessRecord> {
    // The header is only accepted with a pid column, so this is always present.
    let pid = numeric::<u32>(layout, row, PsColumn::Pid, line)?.unwrap_or_default();
    let ppid = numeric::<i64>(layout, row, PsColumn::Ppid, line)?
      .and_then(|ppid| u32::try_from(ppid).ok());
    let niceness = numeric::<i32>(layout, row, PsColumn::Nice, line)?;

    let scheduling_class = layout
      .get(row, PsColumn::Policy)
      .map_or(SchedulingClass::Unknown, SchedulingClass::from_policy);

    let name = layout.get(row, PsColumn::Name).unwrap_or_default();
    let name = name.strip_prefix(STATE_PREFIX).unwrap_or(name);

    Ok(ProcessRecord {
      pid,
      ppid,
      niceness,
      scheduling_class,
      name: name.to_owned(),
    })
  }
}

// Reads a numeric column. A column missing from the header yields `None`; a column present in the
// header but unreadable on this row means the layout is wrong and is an error.
fn numeric<T: FromStr>(
  layout: &ColumnLayout<PsColumn>,
  row: &Row<'_>,
  column: PsColumn,
  line: &str,
) -> Result<Option<T>> {
  if !layout.contains(column) {
    return Ok(None);
  }

  let value = layout.get(row, column).unwrap_or_default();
  value
    .parse()
    .map(Some)
    .map_err(|_| Error::MalformedRow {
      column: column.label(),
      value: value.to_owned(),
      line: line.to_owned(),
    })
}
