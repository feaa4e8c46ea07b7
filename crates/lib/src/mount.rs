//! Switching application sources to host bind mounts.

use tracing::info;

use crate::consts::{MODULE_MODE_MOUNTED, ODOO_SRC_PATH, keys};
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::generate::{GenerateOptions, generate};
use crate::guard::require_initialized;
use crate::runtime::ContainerRuntime;
use crate::workspace::Workspace;

/// Copy the sources out of every application container into
/// `volumes/<name>/src`, switch to `mounted` and restart the stack.
///
/// Returns the environments whose sources were copied.
pub async fn mount_modules<R: ContainerRuntime>(ws: &mut Workspace, runtime: &R) -> Result<Vec<Environment>> {
  require_initialized(ws)?;
  if ws.module_mode() == MODULE_MODE_MOUNTED {
    return Err(Error::ModulesAlreadyMounted);
  }

  let mut envs = vec![Environment::Live, Environment::Pre];
  envs.extend(ws.dev_environments());

  for env in &envs {
    let name = env.service_name();
    let dest = ws.settings.service_volume(&name).join("src");
    runtime.copy_from(&name, ODOO_SRC_PATH, &dest).await?;
    info!(environment = %name, dest = %dest.display(), "copied module sources");
  }

  ws.env.set(keys::MODULE_MODE, MODULE_MODE_MOUNTED);
  ws.env.save()?;

  generate(ws, &GenerateOptions::default())?;
  runtime.up(&[]).await?;
  Ok(envs)
}
