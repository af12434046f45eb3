// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#![deny(
  clippy::expect_used,
  clippy::panic,
  clippy::todo,
  clippy::unimplemented,
  clippy::unreachable,
  clippy::unwrap_used
)]

//! Extraction of typed models from Android bugreport text sections: indentation trees, tolerant
//! `ps` tables, process hierarchies, duration strings and the alarm manager service dump.

use nom::character::complete::one_of;
use nom::combinator::{map_res, recognize};
use nom::error::{FromExternalError, ParseError};
use nom::multi::many1;
use nom::{IResult, Parser};

pub mod alarm;
pub mod config;
pub mod diagnostics;
pub mod duration;
pub mod indent_tree;
pub mod names;
pub mod ps;
pub mod ps_tree;
pub mod section;
pub mod table;

pub use config::ParserConfig;
pub use diagnostics::{DiagnosticSink, LogSink, ProcessNameRegistry, Severity};
pub use section::{Section, SectionLookup, SectionMap};

#[cfg(test)]
#[ctor::ctor]
fn test_global_init() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}

//
// Error
//

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
  #[error("section not found: {0}")]
  SectionAbsent(String),

  #[error("node not found: {0:?}")]
  NodeNotFound(String),

  #[error("table header not found in section {0:?}")]
  HeaderNotFound(String),

  #[error("malformed {column} value {value:?} in row {line:?}")]
  MalformedRow {
    column: &'static str,
    value: String,
    line: String,
  },

  #[error("cannot parse {expected}: {line:?}")]
  PatternMismatch {
    expected: &'static str,
    line: String,
  },

  #[error("malformed duration: {0:?}")]
  MalformedDuration(String),

  #[error("invalid regex: {0}")]
  Regex(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

// Parses a run of ASCII digits. Values which do not fit the target type fail instead of wrapping.
fn decimal<'a, T, E>(input: &'a str) -> IResult<&'a str, T, E>
where
  T: std::str::FromStr,
  E: ParseError<&'a str> + FromExternalError<&'a str, T::Err>,
{
  map_res(recognize(many1(one_of("0123456789"))), str::parse::<T>).parse(input)
}
