// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./duration_test.rs"]
mod tests;

use crate::{Error, Result, decimal};
use nom::character::complete::char;
use nom::combinator::opt;
use nom::error::{FromExternalError, ParseError};
use nom::sequence::terminated;
use nom::{IResult, Parser};
use std::num::ParseIntError;

const MILLIS_PER_SECOND: i64 = 1_000;
const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

/// Components of a compact duration such as `1d2h3m4s5`, each present only if its unit letter
/// was found.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DurationParts {
  pub days: Option<i64>,
  pub hours: Option<i64>,
  pub minutes: Option<i64>,
  pub seconds: Option<i64>,
  pub millis: Option<i64>,
}

impl DurationParts {
  fn is_empty(&self) -> bool {
    *self == Self::default()
  }

  fn total_millis(&self) -> Option<i64> {
    [
      (self.days, MILLIS_PER_DAY),
      (self.hours, MILLIS_PER_HOUR),
      (self.minutes, MILLIS_PER_MINUTE),
      (self.seconds, MILLIS_PER_SECOND),
      (self.millis, 1),
    ]
    .into_iter()
    .try_fold(0_i64, |total, (value, unit)| {
      total.checked_add(value.unwrap_or_default().checked_mul(unit)?)
    })
  }
}

/// Parses an elapsed time string as printed by Android dumps (`-1h23m4s567ms`, `+45m`, `3d`) into
/// milliseconds.
///
/// A single leading sign is consumed but not applied, so `-1s` and `+1s` both yield `1000`.
// TODO(bugreport): Confirm whether a leading '-' should negate the result.
pub fn parse_millis(text: &str) -> Result<i64> {
  let trimmed = text.trim();
  let unsigned = trimmed.strip_prefix(['-', '+']).unwrap_or(trimmed);
  let body = unsigned.strip_suffix("ms").unwrap_or(unsigned);
  let body = body.trim_start_matches(|c: char| !c.is_ascii_digit());

  let malformed = || Error::MalformedDuration(text.to_owned());
  match duration_parts::<nom::error::Error<&str>>(body) {
    Ok(("", parts)) if !parts.is_empty() => parts.total_millis().ok_or_else(malformed),
    _ => Err(malformed()),
  }
}

pub(crate) fn duration_parts<'a, E>(input: &'a str) -> IResult<&'a str, DurationParts, E>
where
  E: ParseError<&'a str> + FromExternalError<&'a str, ParseIntError>,
{
  let (remainder, (days, hours, minutes, seconds, millis)) = (
    opt(terminated(decimal::<i64, E>, char('d'))),
    opt(terminated(decimal::<i64, E>, char('h'))),
    opt(terminated(decimal::<i64, E>, char('m'))),
    opt(terminated(decimal::<i64, E>, char('s'))),
    opt(decimal::<i64, E>),
  )
    .parse(input)?;

  Ok((
    remainder,
    DurationParts {
      days,
      hours,
      minutes,
      seconds,
      millis,
    },
  ))
}
