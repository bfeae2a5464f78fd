pub mod board;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod filter;
pub mod mutation;
pub mod remote;
pub mod render;
pub mod session;
pub mod state;
pub mod task;
pub mod toggle;

use std::ffi::OsString;
use std::sync::Arc;

use anyhow::{
  Context,
  anyhow
};
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting docket"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.docketrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .iter()
        .map(|kv| {
          (kv.key.clone(), kv.value.clone())
        })
    )
  );

  let api =
    config::ApiSettings::from_config(
      &cfg
    )?;
  let remote = Arc::new(
    remote::HttpRemote::new(&api)
      .context(
        "failed to build HTTP client"
      )?
  );

  let coordinator_name = cfg
    .get("coordinator")
    .unwrap_or_else(|| {
      "reconciling".to_string()
    });
  let coordinator =
    mutation::coordinator_named(
      &coordinator_name
    )
    .ok_or_else(|| {
      anyhow!(
        "unknown coordinator \
         '{coordinator_name}' (expected \
         reconciling or optimistic)"
      )
    })?;

  let renderer =
    render::Renderer::new(&cfg)?;
  let mut board =
    board::TaskBoard::new(
      remote,
      coordinator
    );

  let view = commands::ViewArgs {
    query:    cli.search.clone(),
    selector: cli.selector()
  };
  let command = cli
    .command
    .clone()
    .unwrap_or(cli::Command::List);

  info!(
    base_url = %api.base_url,
    coordinator = board.coordinator_name(),
    command = commands::command_name(&command),
    "dispatching"
  );

  let runtime =
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .context(
        "failed to start async runtime"
      )?;
  runtime.block_on(commands::dispatch(
    &mut board,
    &renderer,
    view,
    command
  ))?;

  info!("done");
  Ok(())
}
