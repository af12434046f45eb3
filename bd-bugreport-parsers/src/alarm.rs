// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! Extraction of the pending alarm list and per package alarm statistics from the alarm manager
//! service dump.

#[cfg(test)]
#[path = "./alarm_test.rs"]
mod tests;

use crate::config::AlarmConfig;
use crate::diagnostics::{DiagnosticSink, Severity};
use crate::duration::parse_millis;
use crate::indent_tree::{IndentTree, TreeNode};
use crate::section::{Section, SectionLookup, find_first};
use crate::{Error, Result};
use regex::{Captures, Regex};
use serde::Serialize;
use std::str::FromStr;

//
// AlarmKind
//

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum AlarmKind {
  Elapsed,
  ElapsedWakeup,
  Rtc,
  RtcWakeup,
}

impl AlarmKind {
  #[must_use]
  pub fn from_token(token: &str) -> Option<Self> {
    match token {
      "ELAPSED" => Some(Self::Elapsed),
      "ELAPSED_WAKEUP" => Some(Self::ElapsedWakeup),
      "RTC" => Some(Self::Rtc),
      "RTC_WAKEUP" => Some(Self::RtcWakeup),
      _ => None,
    }
  }

  #[must_use]
  pub const fn as_str(self) -> &'static str {
    match self {
      Self::Elapsed => "ELAPSED",
      Self::ElapsedWakeup => "ELAPSED_WAKEUP",
      Self::Rtc => "RTC",
      Self::RtcWakeup => "RTC_WAKEUP",
    }
  }

  // Entry lines start with the kind token followed by a space.
  fn of_entry(line: &str) -> Option<Self> {
    line
      .split_once(' ')
      .and_then(|(token, _)| Self::from_token(token))
  }
}

impl std::fmt::Display for AlarmKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

//
// Alarm
//

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Alarm {
  pub kind: AlarmKind,
  pub owner_package: String,
  /// The `when=` value as printed, e.g. `+21h37m38s459ms`.
  pub when_raw: String,
  pub when_millis: i64,
  pub repeat_interval_millis: i64,
  pub trigger_count: i64,
  pub operation_package: String,
  pub operation_method: String,
}

//
// AlarmAction
//

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AlarmAction {
  pub invocation_count: u64,
  pub action_description: String,
}

//
// AlarmStat
//

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AlarmStat {
  pub package_name: String,
  pub total_runtime_millis: i64,
  pub wakeup_count: i64,
  pub actions: Vec<AlarmAction>,
  /// Sum of `invocation_count` over `actions`.
  pub total_alarm_count: u64,
}

//
// AlarmManagerState
//

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AlarmManagerState {
  pub alarms: Vec<Alarm>,
  pub stats: Vec<AlarmStat>,
}

struct Patterns {
  entry: Regex,
  properties: Regex,
  operation: Regex,
  stat_summary: Regex,
  stat_action: Regex,
}

impl Patterns {
  fn new() -> Result<Self> {
    Ok(Self {
      entry: Regex::new(r"^([A-Z_]+) #[0-9]+: Alarm\{[a-f0-9]+ type [0-3] (.*)\}$")?,
      properties: Regex::new(r"^type=(.?) when=(.*) repeatInterval=(.*) count=(.*)$")?,
      operation: Regex::new(
        r"^operation=PendingIntent\{[0-9a-f]+: PendingIntentRecord\{[0-9a-f]+ (.*) ([a-zA-Z]*)\}\}$",
      )?,
      stat_summary: Regex::new(r"^(.*)ms running, (.*) wakeups$")?,
      stat_action: Regex::new(r"^(.*) alarms: (.*)$")?,
    })
  }
}

//
// AlarmExtractor
//

pub struct AlarmExtractor<'a> {
  config: &'a AlarmConfig,
  patterns: Patterns,
  sink: &'a dyn DiagnosticSink,
}

impl<'a> AlarmExtractor<'a> {
  pub fn new(config: &'a AlarmConfig, sink: &'a dyn DiagnosticSink) -> Result<Self> {
    Ok(Self {
      config,
      patterns: Patterns::new()?,
      sink,
    })
  }

  /// Extracts from the first configured section present in `sections`.
  pub fn run(&self, sections: &dyn SectionLookup) -> Result<AlarmManagerState> {
    let section = find_first(sections, &self.config.sections, self.sink)
      .ok_or_else(|| Error::SectionAbsent(self.config.sections.join(", ")))?;
    self.extract(section)
  }

  /// Walks the children of the banner node. Alarm entries come first; the stats banner switches
  /// every following child to a per package stat. Malformed entries are reported and dropped.
  pub fn extract(&self, section: &Section) -> Result<AlarmManagerState> {
    let tree = IndentTree::parse(section.lines());
    let Some(banner) = tree.find_text(&self.config.banner) else {
      self.sink.report(
        Severity::NOTICE,
        &format!("Cannot find node '{}'", self.config.banner),
      );
      return Err(Error::NodeNotFound(self.config.banner.clone()));
    };

    let mut state = AlarmManagerState::default();
    let mut in_stats = false;
    for item in banner.children() {
      let line = item.text();
      if in_stats {
        match self.parse_stat(item) {
          Ok(stat) => state.stats.push(stat),
          Err(e) => self.skip(item, &e),
        }
      } else if line.starts_with(&self.config.stats_banner) {
        in_stats = true;
      } else if let Some(kind) = AlarmKind::of_entry(line) {
        match self.parse_alarm(kind, item) {
          Ok(alarm) => state.alarms.push(alarm),
          Err(e) => self.skip(item, &e),
        }
      }
    }

    log::debug!(
      "extracted {} alarms and {} alarm stats from {:?}",
      state.alarms.len(),
      state.stats.len(),
      section.name()
    );
    Ok(state)
  }

  // The entry line is included since the error may only name a child line or a value.
  fn skip(&self, item: &TreeNode, error: &Error) {
    self.sink.report(
      Severity::DETAIL,
      &format!("Dropping entry {:?}: {error}", item.text()),
    );
  }

  fn parse_alarm(&self, kind: AlarmKind, item: &TreeNode) -> Result<Alarm> {
    let entry = captures(&self.patterns.entry, item.text(), "alarm")?;

    let properties = child_text(item, 0, "alarm properties")?;
    let props = captures(&self.patterns.properties, properties, "alarm properties")?;
    let when_raw = props[2].to_string();
    let when_millis = parse_millis(&when_raw)?;
    let repeat_interval_millis = number(&props[3], properties, "alarm properties")?;
    let trigger_count = number(&props[4], properties, "alarm properties")?;

    let operation = child_text(item, 1, "alarm operation")?;
    let op = captures(&self.patterns.operation, operation, "alarm operation")?;

    Ok(Alarm {
      kind,
      owner_package: entry[2].to_string(),
      when_raw,
      when_millis,
      repeat_interval_millis,
      trigger_count,
      operation_package: op[1].to_string(),
      operation_method: op[2].to_string(),
    })
  }

  fn parse_stat(&self, item: &TreeNode) -> Result<AlarmStat> {
    let mut stat = AlarmStat {
      package_name: item.text().to_string(),
      ..Default::default()
    };

    let mut children = item.children().iter();
    if let Some(summary) = children.next() {
      let line = summary.text();
      let summary = captures(&self.patterns.stat_summary, line, "alarm stat")?;
      stat.total_runtime_millis = number(&summary[1], line, "alarm stat")?;
      stat.wakeup_count = number(&summary[2], line, "alarm stat")?;
    }

    for child in children {
      let line = child.text();
      let action = captures(&self.patterns.stat_action, line, "alarm stat")?;
      let invocation_count: u64 = number(&action[1], line, "alarm stat")?;
      stat.total_alarm_count = stat.total_alarm_count.saturating_add(invocation_count);
      stat.actions.push(AlarmAction {
        invocation_count,
        action_description: action[2].to_string(),
      });
    }

    Ok(stat)
  }
}

fn mismatch(expected: &'static str, line: &str) -> Error {
  Error::PatternMismatch {
    expected,
    line: line.to_string(),
  }
}

fn captures<'l>(pattern: &Regex, line: &'l str, expected: &'static str) -> Result<Captures<'l>> {
  pattern
    .captures(line)
    .ok_or_else(|| mismatch(expected, line))
}

fn child_text<'n>(item: &'n TreeNode, index: usize, expected: &'static str) -> Result<&'n str> {
  item
    .child(index)
    .map(TreeNode::text)
    .ok_or_else(|| mismatch(expected, item.text()))
}

fn number<T: FromStr>(value: &str, line: &str, expected: &'static str) -> Result<T> {
  value.parse().map_err(|_| mismatch(expected, line))
}
