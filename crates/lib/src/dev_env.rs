//! Per-pull-request environments.

use tracing::{info, warn};

use crate::compose::ComposeError;
use crate::consts::{LIVE_SERVICE, MODULE_MODE_MOUNTED, ODOO_SRC_PATH, POSTGRES_DB};
use crate::database::{Connector, DatabaseOperator, create_role, drop_role};
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::generate::environment_service;
use crate::guard::{require_healthy_database, require_initialized};
use crate::runtime::ContainerRuntime;
use crate::util::secret::generate_password;
use crate::workspace::Workspace;

/// Add `odoo_dev_pr<pr>`: manifest entry, database role, secret, and a running
/// container.
pub async fn add_dev_env<R, C>(ws: &mut Workspace, runtime: &R, connector: &C, pr: &str) -> Result<Environment>
where
  R: ContainerRuntime,
  C: Connector,
{
  require_initialized(ws)?;
  let env = Environment::from_pr(pr)?;
  let name = env.service_name();
  require_healthy_database(runtime).await?;

  if ws.env.contains(&env.password_key()) {
    return Err(Error::EnvironmentAlreadyExists(name));
  }
  let descriptor = environment_service(ws, env)?;
  match ws.compose.add_service(&descriptor) {
    Err(ComposeError::AlreadyExists(_)) => return Err(Error::EnvironmentAlreadyExists(name)),
    other => other?,
  }

  let password = generate_password();
  let mut client = connector.connect(&ws.admin_connection(POSTGRES_DB)?).await?;
  create_role(&mut client, &env.database(), &password).await?;

  ws.compose.save()?;
  ws.env.add(&env.password_key(), password)?;
  ws.env.save()?;

  if ws.module_mode() == MODULE_MODE_MOUNTED {
    let dest = ws.settings.service_volume(&name).join("src");
    runtime.copy_from(LIVE_SERVICE, ODOO_SRC_PATH, &dest).await?;
  }

  runtime.up(&[name.as_str()]).await?;
  info!(environment = %name, "development environment added");
  Ok(env)
}

/// Remove `odoo_dev_pr<pr>` with its container, database, role and secret.
pub async fn remove_dev_env<R, C>(ws: &mut Workspace, runtime: &R, connector: &C, pr: &str) -> Result<Environment>
where
  R: ContainerRuntime,
  C: Connector,
{
  require_initialized(ws)?;
  let env = Environment::from_pr(pr)?;
  remove_environment(ws, runtime, connector, env).await?;
  Ok(env)
}

/// Remove every dynamic environment in the manifest.
pub async fn remove_all_dev_envs<R, C>(ws: &mut Workspace, runtime: &R, connector: &C) -> Result<Vec<Environment>>
where
  R: ContainerRuntime,
  C: Connector,
{
  require_initialized(ws)?;
  let envs = ws.dev_environments();
  if envs.is_empty() {
    return Err(Error::NoDevEnvironments);
  }
  for env in &envs {
    remove_environment(ws, runtime, connector, *env).await?;
  }
  Ok(envs)
}

async fn remove_environment<R, C>(ws: &mut Workspace, runtime: &R, connector: &C, env: Environment) -> Result<()>
where
  R: ContainerRuntime,
  C: Connector,
{
  let name = env.service_name();
  if !ws.compose.contains(&name) {
    return Err(Error::EnvironmentNotFound(name));
  }
  require_healthy_database(runtime).await?;

  // Stop while compose still knows the service.
  runtime.stop(&[name.as_str()]).await?;

  let database = env.database();
  let db = DatabaseOperator::new(runtime);
  if db.exists(&database).await? {
    db.drop_database(&database).await?;
  }
  let mut client = connector.connect(&ws.admin_connection(POSTGRES_DB)?).await?;
  drop_role(&mut client, &database).await?;

  ws.compose.remove_service(&name)?;
  ws.compose.save()?;

  let key = env.password_key();
  if ws.env.contains(&key) {
    ws.env.remove(&key)?;
  } else {
    warn!(key = %key, "no stored password for environment");
  }
  ws.env.save()?;

  info!(environment = %name, "development environment removed");
  Ok(())
}
