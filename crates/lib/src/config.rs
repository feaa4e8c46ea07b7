//! Process-level settings.
//!
//! The managed files are the real configuration; these settings only decide
//! where they live and how the external collaborators are reached.

use std::path::{Path, PathBuf};

use crate::consts::{COMPOSE_FILENAME, ENV_FILENAME, POSTGRES_PORT, VOLUMES_DIR};

pub const DIR_VAR: &str = "ODOO_OPS_DIR";
pub const DOCKER_VAR: &str = "ODOO_OPS_DOCKER";
pub const DB_HOST_VAR: &str = "ODOO_OPS_DB_HOST";
pub const DB_PORT_VAR: &str = "ODOO_OPS_DB_PORT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
  /// Directory holding the manifest, the env file and `volumes/`.
  pub work_dir: PathBuf,
  /// Container runtime binary.
  pub docker_bin: String,
  pub db_host: String,
  pub db_port: u16,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      work_dir: PathBuf::from("."),
      docker_bin: "docker".to_string(),
      db_host: "127.0.0.1".to_string(),
      db_port: POSTGRES_PORT,
    }
  }
}

impl Settings {
  /// Read overrides from the process environment.
  ///
  /// Unparseable port values fall back to the default.
  pub fn from_env() -> Self {
    let defaults = Self::default();
    Self {
      work_dir: std::env::var(DIR_VAR).map(PathBuf::from).unwrap_or(defaults.work_dir),
      docker_bin: std::env::var(DOCKER_VAR).unwrap_or(defaults.docker_bin),
      db_host: std::env::var(DB_HOST_VAR).unwrap_or(defaults.db_host),
      db_port: std::env::var(DB_PORT_VAR)
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(defaults.db_port),
    }
  }

  pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.work_dir = dir.into();
    self
  }

  pub fn compose_path(&self) -> PathBuf {
    self.work_dir.join(COMPOSE_FILENAME)
  }

  pub fn env_path(&self) -> PathBuf {
    self.work_dir.join(ENV_FILENAME)
  }

  pub fn volumes_dir(&self) -> PathBuf {
    self.work_dir.join(VOLUMES_DIR)
  }

  /// Host directory mounted as the data dir of an application service.
  pub fn service_volume(&self, service: &str) -> PathBuf {
    self.volumes_dir().join(service)
  }

  /// File-store of an application service's database.
  pub fn filestore_dir(&self, service: &str) -> PathBuf {
    self.service_volume(service).join("filestore").join(service)
  }

  pub fn work_dir(&self) -> &Path {
    &self.work_dir
  }
}
