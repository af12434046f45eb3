// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./sections_test.rs"]
mod tests;

use anyhow::Context;
use bd_bugreport_parsers::{Section, SectionMap};
use regex::Regex;
use std::path::Path;

struct OpenSection {
  name: String,
  lines: Vec<String>,
}

impl OpenSection {
  fn new(name: String) -> Self {
    Self {
      name,
      lines: Vec::new(),
    }
  }

  fn close(self, sections: &mut SectionMap) {
    log::debug!("section {:?}: {} lines", self.name, self.lines.len());
    sections.insert(Section::new(self.name, self.lines));
  }
}

//
// SectionSplitter
//

/// Cuts a raw bugreport into named sections.
///
/// `------ NAME (command) ------` opens a section which runs until
/// `------ 0.123s was the duration of 'NAME' ------` or the next section header. Inside it,
/// `DUMP OF SERVICE svc:` opens a nested `DUMP OF SERVICE svc` section closed by a line of dashes.
/// Lines of a service dump belong to both sections. Text outside any section is dropped, and a
/// repeated name replaces the earlier section.
pub struct SectionSplitter {
  section_start: Regex,
  section_end: Regex,
  service_start: Regex,
  service_end: Regex,
}

impl SectionSplitter {
  pub fn new() -> Result<Self, regex::Error> {
    Ok(Self {
      section_start: Regex::new(r"^------ (.*?) \(.*\) ------$")?,
      section_end: Regex::new(r"^------ [0-9.]+s was the duration of '.*' ------$")?,
      service_start: Regex::new(r"^DUMP OF SERVICE (\S+):$")?,
      service_end: Regex::new(r"^-{20,}$")?,
    })
  }

  #[must_use]
  pub fn split(&self, text: &str) -> SectionMap {
    let mut sections = SectionMap::default();
    let mut outer: Option<OpenSection> = None;
    let mut service: Option<OpenSection> = None;

    for line in text.lines() {
      if self.section_end.is_match(line) {
        close(&mut service, &mut sections);
        close(&mut outer, &mut sections);
        continue;
      }
      if let Some(captures) = self.section_start.captures(line) {
        close(&mut service, &mut sections);
        close(&mut outer, &mut sections);
        outer = Some(OpenSection::new(captures[1].to_string()));
        continue;
      }
      if let Some(captures) = self.service_start.captures(line) {
        close(&mut service, &mut sections);
        service = Some(OpenSection::new(format!("DUMP OF SERVICE {}", &captures[1])));
        continue;
      }
      if service.is_some() && self.service_end.is_match(line) {
        close(&mut service, &mut sections);
        continue;
      }

      for open in [&mut service, &mut outer].into_iter().flatten() {
        open.lines.push(line.to_string());
      }
    }

    close(&mut service, &mut sections);
    close(&mut outer, &mut sections);
    sections
  }
}

fn close(open: &mut Option<OpenSection>, sections: &mut SectionMap) {
  if let Some(section) = open.take() {
    section.close(sections);
  }
}

/// Maps the bugreport at `path` and splits it. Invalid UTF-8 is replaced rather than rejected.
pub fn load_bugreport(path: &Path) -> anyhow::Result<SectionMap> {
  let file =
    std::fs::File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
  if file.metadata()?.len() == 0 {
    return Ok(SectionMap::default());
  }

  // SAFETY: the file is only read, and bugreports are not modified while being analyzed.
  let mmap = unsafe { memmap2::Mmap::map(&file) }
    .with_context(|| format!("cannot map {}", path.display()))?;
  let text = String::from_utf8_lossy(&mmap);
  Ok(SectionSplitter::new()?.split(&text))
}
