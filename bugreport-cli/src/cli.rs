// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
  Json,
  Tree,
}

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Options {
  /// YAML parser configuration. Built-in defaults are used when absent.
  #[clap(env = "BUGREPORT_CONFIG", long)]
  pub config: Option<PathBuf>,

  /// Bugreport text file
  pub bugreport: PathBuf,

  /// Command to run
  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// List the sections found in the bugreport
  Sections,

  /// Print the process hierarchy
  Ps(PsCommand),

  /// Print the process names suggested while scanning the process table
  Names,

  /// Print the alarm manager state as JSON
  Alarms,
}

#[derive(Args, Debug)]
pub struct PsCommand {
  /// Output format
  #[arg(long, value_enum, default_value_t = OutputFormat::Tree)]
  pub format: OutputFormat,
}
