// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use crate::cli::{Command, Options, OutputFormat};
use anyhow::Context;
use bd_bugreport_parsers::alarm::AlarmExtractor;
use bd_bugreport_parsers::names::ProcessNames;
use bd_bugreport_parsers::ps::{PsRecords, PsScanner};
use bd_bugreport_parsers::{LogSink, ParserConfig, SectionMap};
use bugreport_cli::report;
use bugreport_cli::sections::load_bugreport;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

mod cli;

fn main() -> anyhow::Result<()> {
  init_tracing();
  let args = Options::parse();

  let config = match &args.config {
    Some(path) => ParserConfig::load(path)
      .with_context(|| format!("cannot load config {}", path.display()))?,
    None => ParserConfig::default(),
  };
  let sections = load_bugreport(&args.bugreport)?;
  log::debug!(
    "{} sections in {}",
    sections.len(),
    args.bugreport.display()
  );

  match args.command {
    Command::Sections => print!("{}", report::section_listing(&sections)),
    Command::Ps(cmd) => {
      let names = ProcessNames::default();
      let ps = scan_processes(&config, &sections, &names)?;
      if let Some(error) = &ps.aborted_by {
        log::warn!("process table truncated: {error}");
      }
      match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ps.hierarchy)?),
        OutputFormat::Tree => print!("{}", report::process_tree(&ps.hierarchy)),
      }
    },
    Command::Names => {
      let names = ProcessNames::default();
      scan_processes(&config, &sections, &names)?;
      print!("{}", report::name_listing(&names.snapshot()));
    },
    Command::Alarms => {
      let state = AlarmExtractor::new(&config.alarms, &LogSink)?.run(&sections)?;
      println!("{}", serde_json::to_string_pretty(&state)?);
    },
  }

  Ok(())
}

fn scan_processes(
  config: &ParserConfig,
  sections: &SectionMap,
  names: &ProcessNames,
) -> anyhow::Result<PsRecords> {
  PsScanner::new(&config.processes, &LogSink, names)?
    .run(sections)
    .with_context(|| {
      format!(
        "no process table in any of {:?}",
        config.processes.sections
      )
    })
}

fn init_tracing() {
  // ANSI colors are opt in so that redirected output stays clean.
  let stderr = tracing_subscriber::fmt::layer()
    .with_writer(std::io::stderr)
    .with_ansi(std::env::var("BUGREPORT_LOG_ANSI").is_ok())
    .with_line_number(true)
    .compact();

  let filter = EnvFilter::new(std::env::var("RUST_LOG").as_deref().unwrap_or("info"));

  Registry::default().with(filter).with(stderr).init();
  log::set_max_level(tracing_log::AsLog::as_log(
    &tracing_subscriber::filter::LevelFilter::current(),
  ));
}
