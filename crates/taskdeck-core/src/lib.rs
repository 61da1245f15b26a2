pub mod board;
pub mod category;
pub mod category_store;
pub mod cli;
pub mod codec;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod gateway;
pub mod id;
pub mod preferences;
pub mod render;
pub mod service;
pub mod storage;
pub mod task;
pub mod task_store;
pub mod view;

use std::ffi::OsString;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting taskdeck CLI"
  );

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  )?;

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let gateway =
    gateway::Gateway::open_dir(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open data store at \
         {}",
        data_dir.display()
      )
    })?;

  let zone = datetime::Zone::from_config(
    cfg.get("timezone").as_deref()
  );
  let now = Utc::now();
  let mut board = board::Board::open(
    gateway,
    now,
    zone.today(now)
  )?;
  commands::seed_preferences(
    &board, &cfg
  )?;

  let mut renderer =
    render::Renderer::new(&cfg);
  let command =
    cli.command.unwrap_or_else(|| {
      cli::Command::List(
        cli::ListArgs::default()
      )
    });
  debug!(?command, "resolved command");

  let mut ctx =
    commands::CommandContext {
      cfg: &cfg,
      renderer: &mut renderer,
      zone
    };
  commands::dispatch(
    &mut board, &mut ctx, command
  )?;

  info!("done");
  Ok(())
}
