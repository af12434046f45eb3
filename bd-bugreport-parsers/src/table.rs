// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! Heuristic scanning of whitespace aligned tables whose column set drifts between builds.

#[cfg(test)]
#[path = "./table_test.rs"]
mod tests;

use crate::section::Section;
use crate::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::hash::Hash;

/// A line starting with this character ends the table body.
const TRAILER_MARKER: char = '[';

//
// Anchor
//

/// Where a column's value is found when a row is one token short.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
  /// Always read at the header index. Used for columns preceding any optional column.
  Leading,
  /// Read by counting back from the end of the row when the row is short.
  Trailing,
}

//
// ColumnSpec
//

#[derive(Clone, Copy, Debug)]
pub struct ColumnSpec<K> {
  pub key: K,
  /// Case sensitive header tokens naming this column.
  pub aliases: &'static [&'static str],
  pub anchor: Anchor,
  /// The header is rejected if a required column is missing.
  pub required: bool,
}

//
// TableScanner
//

pub struct TableScanner<K: 'static> {
  header: Regex,
  columns: &'static [ColumnSpec<K>],
  search_lines: usize,
}

impl<K: Copy + Eq + Hash> TableScanner<K> {
  pub fn new(header: Regex, columns: &'static [ColumnSpec<K>], search_lines: usize) -> Self {
    Self {
      header,
      columns,
      search_lines,
    }
  }

  /// Looks for the header among the first `search_lines` lines. Only the first line matching the
  /// header pattern is considered.
  pub fn locate(&self, section: &Section) -> Result<ColumnLayout<K>> {
    let header_not_found = || Error::HeaderNotFound(section.name().to_owned());

    let (header_index, header) = section
      .lines()
      .iter()
      .take(self.search_lines)
      .enumerate()
      .find(|(_, line)| self.header.is_match(line))
      .ok_or_else(header_not_found)?;

    let tokens: Vec<&str> = header.split_whitespace().collect();
    let mut columns = HashMap::new();
    for (index, token) in tokens.iter().enumerate() {
      if let Some(spec) = self.columns.iter().find(|spec| spec.aliases.contains(token)) {
        columns.insert(spec.key, (index, spec.anchor));
      }
    }

    let missing_required = self
      .columns
      .iter()
      .any(|spec| spec.required && !columns.contains_key(&spec.key));
    if missing_required {
      return Err(header_not_found());
    }

    Ok(ColumnLayout {
      columns,
      width: tokens.len(),
      body_start: header_index + 1,
    })
  }
}

//
// ColumnLayout
//

/// Column positions resolved from a header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout<K: Eq + Hash> {
  columns: HashMap<K, (usize, Anchor)>,
  width: usize,
  body_start: usize,
}

impl<K: Copy + Eq + Hash> ColumnLayout<K> {
  /// Number of tokens in the header row.
  #[must_use]
  pub fn width(&self) -> usize {
    self.width
  }

  /// Index of the first line after the header.
  #[must_use]
  pub fn body_start(&self) -> usize {
    self.body_start
  }

  #[must_use]
  pub fn index_of(&self, key: K) -> Option<usize> {
    self.columns.get(&key).map(|(index, _)| *index)
  }

  #[must_use]
  pub fn contains(&self, key: K) -> bool {
    self.columns.contains_key(&key)
  }

  /// Body lines with their section index, up to the trailer marker or the end of the section.
  pub fn body<'s>(&self, section: &'s Section) -> impl Iterator<Item = (usize, &'s str)> {
    section
      .lines()
      .iter()
      .enumerate()
      .skip(self.body_start)
      .map(|(index, line)| (index, line.as_str()))
      .take_while(|(_, line)| !line.starts_with(TRAILER_MARKER))
  }

  /// Splits a body line into at most `width` tokens so that a free text last column keeps its
  /// embedded spaces. Rows more than one token short are rejected.
  #[must_use]
  pub fn split<'l>(&self, line: &'l str) -> Option<Row<'l>> {
    let tokens = split_limited(line, self.width);
    (tokens.len() + 1 >= self.width).then_some(Row { tokens })
  }

  /// Value of `key` in `row`. Trailing columns of a short row are located relative to the row end,
  /// and the header's last column maps to the row's last token.
  #[must_use]
  pub fn get<'l>(&self, row: &Row<'l>, key: K) -> Option<&'l str> {
    let (index, anchor) = *self.columns.get(&key)?;
    let tokens = &row.tokens;
    if anchor == Anchor::Leading || tokens.len() >= self.width {
      return tokens.get(index).copied();
    }

    if index + 1 == self.width {
      return tokens.last().copied();
    }
    let from_end = self.width - index;
    tokens
      .len()
      .checked_sub(1 + from_end)
      .and_then(|offset| tokens.get(offset))
      .copied()
  }
}

//
// Row
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row<'l> {
  tokens: Vec<&'l str>,
}

impl<'l> Row<'l> {
  #[must_use]
  pub fn tokens(&self) -> &[&'l str] {
    &self.tokens
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.tokens.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.tokens.is_empty()
  }
}

/// Splits on runs of whitespace into at most `limit` tokens. The last token holds the unsplit
/// remainder of the line.
fn split_limited(line: &str, limit: usize) -> Vec<&str> {
  let mut tokens = Vec::new();
  let mut rest = line.trim();
  while !rest.is_empty() {
    if tokens.len() + 1 >= limit {
      tokens.push(rest);
      break;
    }
    match rest.find(char::is_whitespace) {
      Some(end) => {
        tokens.push(&rest[.. end]);
        rest = rest[end ..].trim_start();
      },
      None => {
        tokens.push(rest);
        break;
      },
    }
  }
  tokens
}
