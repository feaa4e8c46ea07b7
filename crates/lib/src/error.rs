//! Crate-level error and process exit codes.

use std::path::PathBuf;

use thiserror::Error;

use crate::compose::ComposeError;
use crate::database::DatabaseError;
use crate::env::EnvError;
use crate::environment::UnknownEnvironment;
use crate::refresh::RefreshError;
use crate::runtime::{HealthError, HealthStatus, RuntimeError};
use crate::util::fs::CopyError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Exit codes, one per failure class.
pub mod exit {
  pub const GENERIC: i32 = 1;
  pub const DOCKER_NOT_RUNNING: i32 = 2;
  pub const DOMAIN_NOT_CONFIGURED: i32 = 3;
  pub const HEALTH_TIMEOUT: i32 = 4;
  pub const SERVICE_NOT_RUNNING: i32 = 5;
  pub const SERVICE_UNHEALTHY: i32 = 6;
  pub const PROTECTED_ENVIRONMENT: i32 = 7;
  pub const NO_DEV_ENVIRONMENTS: i32 = 8;
  pub const NOT_INITIALIZED: i32 = 9;
  pub const ENVIRONMENT: i32 = 10;
  /// Malformed command line.
  pub const USAGE: i32 = 64;
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("not initialized: run the 'init' command first")]
  NotInitialized,

  #[error("configuration has already been initialized: {} exists", .0.display())]
  AlreadyInitialized(PathBuf),

  #[error("domain {0} and its subdomains must point to this server's IP")]
  DomainNotConfigured(String),

  #[error("Docker and/or Docker Compose are not installed or running.")]
  DockerNotRunning,

  #[error("cannot run this command for the protected environment {0:?}")]
  ProtectedEnvironment(String),

  #[error("the database service is not running")]
  DatabaseNotRunning,

  #[error("the database service is not healthy ({0})")]
  DatabaseUnhealthy(HealthStatus),

  #[error("service {0} is unhealthy")]
  ServiceUnhealthy(String),

  #[error("service {0} is not running")]
  ServiceNotRunning(String),

  #[error("timed out after {secs}s waiting for {service} to become healthy")]
  HealthTimeout { service: String, secs: u64 },

  #[error(transparent)]
  UnknownEnvironment(#[from] UnknownEnvironment),

  #[error("environment {0} does not exist")]
  EnvironmentNotFound(String),

  #[error("environment {0} already exists")]
  EnvironmentAlreadyExists(String),

  #[error("no development environments found")]
  NoDevEnvironments,

  #[error("modules are already mounted")]
  ModulesAlreadyMounted,

  #[error(transparent)]
  Env(#[from] EnvError),

  #[error(transparent)]
  Compose(#[from] ComposeError),

  #[error(transparent)]
  Runtime(#[from] RuntimeError),

  #[error(transparent)]
  Database(#[from] DatabaseError),

  #[error(transparent)]
  Refresh(#[from] RefreshError),

  #[error(transparent)]
  Copy(#[from] CopyError),
}

impl From<HealthError> for Error {
  fn from(err: HealthError) -> Self {
    match err {
      HealthError::NotRunning(service) => Error::ServiceNotRunning(service),
      HealthError::Unhealthy(service) => Error::ServiceUnhealthy(service),
      HealthError::Timeout { service, waited } => Error::HealthTimeout {
        service,
        secs: waited.as_secs(),
      },
      HealthError::Runtime(e) => Error::Runtime(e),
    }
  }
}

impl Error {
  pub fn exit_code(&self) -> i32 {
    match self {
      Error::DockerNotRunning => exit::DOCKER_NOT_RUNNING,
      Error::DomainNotConfigured(_) => exit::DOMAIN_NOT_CONFIGURED,
      Error::HealthTimeout { .. } => exit::HEALTH_TIMEOUT,
      Error::ServiceNotRunning(_) | Error::DatabaseNotRunning => exit::SERVICE_NOT_RUNNING,
      Error::ServiceUnhealthy(_) | Error::DatabaseUnhealthy(_) => exit::SERVICE_UNHEALTHY,
      Error::ProtectedEnvironment(_) | Error::Database(DatabaseError::OperationDenied { .. }) => {
        exit::PROTECTED_ENVIRONMENT
      }
      Error::NoDevEnvironments => exit::NO_DEV_ENVIRONMENTS,
      Error::NotInitialized => exit::NOT_INITIALIZED,
      Error::UnknownEnvironment(_) | Error::EnvironmentNotFound(_) | Error::EnvironmentAlreadyExists(_) => {
        exit::ENVIRONMENT
      }
      _ => exit::GENERIC,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[test]
  fn exit_codes_are_distinct_per_class() {
    let cases = [
      (Error::DockerNotRunning, 2),
      (Error::DomainNotConfigured("x".into()), 3),
      (Error::HealthTimeout { service: "db".into(), secs: 300 }, 4),
      (Error::DatabaseNotRunning, 5),
      (Error::DatabaseUnhealthy(HealthStatus::Starting), 6),
      (Error::ProtectedEnvironment("live".into()), 7),
      (Error::NoDevEnvironments, 8),
      (Error::NotInitialized, 9),
      (Error::EnvironmentNotFound("odoo_dev_pr1".into()), 10),
      (Error::ModulesAlreadyMounted, 1),
    ];
    for (err, code) in cases {
      assert_eq!(err.exit_code(), code, "{err}");
    }
  }

  #[test]
  fn denied_database_operation_is_protected_code() {
    let err = Error::from(DatabaseError::OperationDenied {
      operation: "drop database",
      name: "live".into(),
    });
    assert_eq!(err.exit_code(), exit::PROTECTED_ENVIRONMENT);
  }

  #[test]
  fn health_errors_map_to_precondition_variants() {
    let err = Error::from(HealthError::Timeout {
      service: "db".into(),
      waited: Duration::from_secs(301),
    });
    assert!(matches!(err, Error::HealthTimeout { secs: 301, .. }));
    assert_eq!(Error::from(HealthError::NotRunning("db".into())).exit_code(), 5);
    assert_eq!(Error::from(HealthError::Unhealthy("db".into())).exit_code(), 6);
  }
}
