// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./section_test.rs"]
mod tests;

use crate::diagnostics::{DiagnosticSink, Severity};
use std::collections::HashMap;

//
// Section
//

/// A named, immutable block of lines cut out of a larger bugreport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
  name: String,
  lines: Vec<String>,
}

impl Section {
  pub fn new(name: impl Into<String>, lines: Vec<String>) -> Self {
    Self {
      name: name.into(),
      lines,
    }
  }

  /// Builds a section by splitting `text` into lines.
  pub fn from_text(name: impl Into<String>, text: &str) -> Self {
    Self::new(name, text.lines().map(str::to_owned).collect())
  }

  #[must_use]
  pub fn name(&self) -> &str {
    &self.name
  }

  #[must_use]
  pub fn lines(&self) -> &[String] {
    &self.lines
  }

  #[must_use]
  pub fn line(&self, index: usize) -> Option<&str> {
    self.lines.get(index).map(String::as_str)
  }

  #[must_use]
  pub fn line_count(&self) -> usize {
    self.lines.len()
  }
}

//
// SectionLookup
//

/// Resolves a section by name. Implemented by whatever splits the raw bugreport.
pub trait SectionLookup {
  fn find_section(&self, name: &str) -> Option<&Section>;
}

//
// SectionMap
//

/// Map backed section registry. Adding a section with an existing name replaces it.
#[derive(Debug, Default)]
pub struct SectionMap {
  sections: HashMap<String, Section>,
}

impl SectionMap {
  pub fn insert(&mut self, section: Section) {
    self.sections.insert(section.name.clone(), section);
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.sections.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.sections.is_empty()
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.sections.keys().map(String::as_str)
  }
}

impl FromIterator<Section> for SectionMap {
  fn from_iter<T: IntoIterator<Item = Section>>(iter: T) -> Self {
    let mut map = Self::default();
    for section in iter {
      map.insert(section);
    }
    map
  }
}

impl SectionLookup for SectionMap {
  fn find_section(&self, name: &str) -> Option<&Section> {
    self.sections.get(name)
  }
}

/// Returns the first of `names` present in `lookup`. Every name tried and not found is reported
/// to the sink.
pub fn find_first<'a, S: AsRef<str>>(
  lookup: &'a dyn SectionLookup,
  names: &[S],
  sink: &dyn DiagnosticSink,
) -> Option<&'a Section> {
  names.iter().find_map(|name| {
    let name = name.as_ref();
    let section = lookup.find_section(name);
    if section.is_none() {
      sink.report(
        Severity::NOTICE,
        &format!("Cannot find section: {name} (ignoring it)"),
      );
    }
    section
  })
}
