//! Preconditions checked at the top of command handlers.

use tracing::debug;

use crate::consts::DB_SERVICE;
use crate::database;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::runtime::ContainerRuntime;
use crate::workspace::Workspace;

pub fn require_initialized(ws: &Workspace) -> Result<()> {
  if !ws.is_initialized() {
    return Err(Error::NotInitialized);
  }
  Ok(())
}

/// Parse an environment name, refusing production in any spelling.
pub fn prevent_protected(name: &str) -> Result<Environment> {
  if database::is_protected(name) {
    return Err(Error::ProtectedEnvironment(name.to_string()));
  }
  let env: Environment = name.parse()?;
  if env.is_protected() {
    return Err(Error::ProtectedEnvironment(name.to_string()));
  }
  Ok(env)
}

pub async fn require_healthy_database<R: ContainerRuntime>(runtime: &R) -> Result<()> {
  match runtime.health(DB_SERVICE).await? {
    None => Err(Error::DatabaseNotRunning),
    Some(status) if status.is_ready() => {
      debug!(status = %status, "database is healthy");
      Ok(())
    }
    Some(status) => Err(Error::DatabaseUnhealthy(status)),
  }
}

pub fn require_environment(ws: &Workspace, env: Environment) -> Result<()> {
  let name = env.service_name();
  if !ws.compose.contains(&name) {
    return Err(Error::EnvironmentNotFound(name));
  }
  Ok(())
}
