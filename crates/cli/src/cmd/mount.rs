//! Implementation of the `odoo-ops mount-modules` command.

use anyhow::{Context, Result};

use odoo_ops_lib::config::Settings;
use odoo_ops_lib::mount::mount_modules;
use odoo_ops_lib::runtime::DockerCompose;

use super::{block_on, load_workspace};
use crate::output::{print_stat, print_success};

pub fn cmd_mount_modules(settings: Settings) -> Result<()> {
  let mut ws = load_workspace(settings)?;
  let runtime = DockerCompose::from_settings(&ws.settings);

  let envs = block_on(mount_modules(&mut ws, &runtime))?.context("Failed to mount modules")?;

  print_success("Modules mounted");
  for env in &envs {
    let src = ws.settings.service_volume(&env.service_name()).join("src");
    print_stat(&env.service_name(), &src.display().to_string());
  }
  Ok(())
}
