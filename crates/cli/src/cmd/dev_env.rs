//! Implementation of the `odoo-ops manage-dev-env` subcommands.

use anyhow::{Context, Result};

use odoo_ops_lib::config::Settings;
use odoo_ops_lib::database::PgConnector;
use odoo_ops_lib::dev_env::{add_dev_env, remove_all_dev_envs, remove_dev_env};
use odoo_ops_lib::runtime::DockerCompose;

use super::{block_on, load_workspace};
use crate::output::{print_stat, print_success};

pub fn cmd_dev_env_add(settings: Settings, pr: &str) -> Result<()> {
  let mut ws = load_workspace(settings)?;
  let runtime = DockerCompose::from_settings(&ws.settings);

  let env = block_on(add_dev_env(&mut ws, &runtime, &PgConnector, pr))?
    .with_context(|| format!("Failed to add environment for {pr}"))?;

  print_success(&format!("Added {env}"));
  print_stat("Domain", &env.domain(ws.domain()?));
  Ok(())
}

pub fn cmd_dev_env_remove(settings: Settings, pr: &str) -> Result<()> {
  let mut ws = load_workspace(settings)?;
  let runtime = DockerCompose::from_settings(&ws.settings);

  let env = block_on(remove_dev_env(&mut ws, &runtime, &PgConnector, pr))?
    .with_context(|| format!("Failed to remove environment for {pr}"))?;

  print_success(&format!("Removed {env}"));
  Ok(())
}

pub fn cmd_dev_env_remove_all(settings: Settings) -> Result<()> {
  let mut ws = load_workspace(settings)?;
  let runtime = DockerCompose::from_settings(&ws.settings);

  let removed =
    block_on(remove_all_dev_envs(&mut ws, &runtime, &PgConnector))?.context("Failed to remove environments")?;

  for env in &removed {
    print_success(&format!("Removed {env}"));
  }
  Ok(())
}
