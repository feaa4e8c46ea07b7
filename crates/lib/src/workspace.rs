//! The two managed files, loaded once per command.

use crate::compose::ComposeFile;
use crate::config::Settings;
use crate::consts::{MODULE_MODE_INCLUDED, POSTGRES_USER, keys};
use crate::database::ConnectParams;
use crate::env::EnvFile;
use crate::environment::Environment;
use crate::error::Result;

/// Request-scoped state handed to every operation: settings plus the manifest
/// and the env file as read at command start.
#[derive(Debug)]
pub struct Workspace {
  pub settings: Settings,
  pub compose: ComposeFile,
  pub env: EnvFile,
}

impl Workspace {
  pub fn load(settings: Settings) -> Result<Self> {
    let compose = ComposeFile::load(settings.compose_path())?;
    let env = EnvFile::load(settings.env_path())?;
    Ok(Self {
      settings,
      compose,
      env,
    })
  }

  /// The manifest exists on disk.
  pub fn is_initialized(&self) -> bool {
    self.compose.is_initialized()
  }

  pub fn domain(&self) -> Result<&str> {
    Ok(self.env.read(keys::DOMAIN)?)
  }

  pub fn version(&self) -> Result<&str> {
    Ok(self.env.read(keys::VERSION)?)
  }

  /// Development mode: no TLS, no DNS checks.
  pub fn is_dev(&self) -> bool {
    self.env.read_or(keys::DEV, "0") == "1"
  }

  pub fn module_mode(&self) -> &str {
    match self.env.read_or(keys::MODULE_MODE, MODULE_MODE_INCLUDED) {
      "" => MODULE_MODE_INCLUDED,
      mode => mode,
    }
  }

  /// Dynamic environments present in the manifest, in manifest order.
  pub fn dev_environments(&self) -> Vec<Environment> {
    self
      .compose
      .service_names()
      .filter_map(|name| name.parse::<Environment>().ok())
      .filter(Environment::is_dev)
      .collect()
  }

  /// Superuser connection to `database` on the published database port.
  pub fn admin_connection(&self, database: &str) -> Result<ConnectParams> {
    Ok(ConnectParams {
      host: self.settings.db_host.clone(),
      port: self.settings.db_port,
      database: database.to_string(),
      user: POSTGRES_USER.to_string(),
      password: self.env.read(keys::MASTER_DB_PASSWORD)?.to_string(),
    })
  }
}
