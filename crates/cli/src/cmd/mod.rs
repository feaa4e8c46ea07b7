mod dev_env;
mod domain;
mod generate;
mod init;
mod inspect;
mod mount;
mod refresh;

use std::future::Future;

use anyhow::{Context, Result};
use tracing::debug;

use odoo_ops_lib::Error;
use odoo_ops_lib::config::Settings;
use odoo_ops_lib::runtime::{ContainerRuntime, DockerCompose};
use odoo_ops_lib::workspace::Workspace;

pub use dev_env::{cmd_dev_env_add, cmd_dev_env_remove, cmd_dev_env_remove_all};
pub use domain::cmd_change_domain;
pub use generate::cmd_generate;
pub use init::cmd_init;
pub use inspect::cmd_inspect;
pub use mount::cmd_mount_modules;
pub use refresh::cmd_refresh;

/// Run one command future to completion on a fresh runtime.
fn block_on<F: Future>(future: F) -> Result<F::Output> {
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  Ok(rt.block_on(future))
}

fn load_workspace(settings: Settings) -> Result<Workspace> {
  let dir = settings.work_dir().display().to_string();
  Workspace::load(settings).with_context(|| format!("Failed to load working directory {dir}"))
}

/// Fail with [`Error::DockerNotRunning`] unless both the runtime and its
/// compose plugin answer a version query.
pub fn require_docker(settings: &Settings) -> Result<()> {
  let runtime = DockerCompose::from_settings(settings);
  let versions = block_on(runtime.versions())?;
  debug!(docker = ?versions.docker, compose = ?versions.compose, "runtime versions");
  if !versions.is_available() {
    return Err(Error::DockerNotRunning.into());
  }
  Ok(())
}
