//! Container runtime contract.
//!
//! Everything the tool asks of the orchestrator goes through
//! [`ContainerRuntime`]: starting and stopping services, running a shell
//! command inside a service, copying files out of it and reading container
//! health. [`DockerCompose`] implements it by spawning the `docker` CLI.

mod docker;
pub mod health;

use std::fmt;
use std::io;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

pub use docker::DockerCompose;
pub use health::{HealthError, HealthWait, wait_healthy};

#[derive(Debug, Error)]
pub enum RuntimeError {
  /// The process could not be started at all.
  #[error("failed to run {command}: {source}")]
  Spawn { command: String, source: io::Error },

  /// The process ran and exited non-zero.
  #[error("command failed with exit code {code:?}: {command}: {stderr}")]
  CommandFailed {
    command: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("unexpected health status {status:?} for {container}")]
  UnknownHealth { container: String, status: String },
}

/// Container state as reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
  Starting,
  Healthy,
  Unhealthy,
  /// Running, without a health check defined.
  Running,
}

impl HealthStatus {
  pub fn parse(raw: &str) -> Option<Self> {
    match raw.trim() {
      "starting" => Some(HealthStatus::Starting),
      "healthy" => Some(HealthStatus::Healthy),
      "unhealthy" => Some(HealthStatus::Unhealthy),
      "running" => Some(HealthStatus::Running),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      HealthStatus::Starting => "starting",
      HealthStatus::Healthy => "healthy",
      HealthStatus::Unhealthy => "unhealthy",
      HealthStatus::Running => "running",
    }
  }

  /// Ready to serve: healthy, or running with nothing to check.
  pub fn is_ready(&self) -> bool {
    matches!(self, HealthStatus::Healthy | HealthStatus::Running)
  }
}

impl fmt::Display for HealthStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Versions of the runtime and its compose plugin; `None` when unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeVersions {
  pub docker: Option<String>,
  pub compose: Option<String>,
}

impl RuntimeVersions {
  pub fn is_available(&self) -> bool {
    self.docker.is_some() && self.compose.is_some()
  }
}

/// Blocking-in-spirit operations against the container orchestrator. Every
/// call is awaited to completion before the caller proceeds.
#[allow(async_fn_in_trait)]
pub trait ContainerRuntime {
  /// Start services (all services when empty) in the background.
  async fn up(&self, services: &[&str]) -> Result<(), RuntimeError>;

  /// Stop services (all services when empty).
  async fn stop(&self, services: &[&str]) -> Result<(), RuntimeError>;

  /// Run `sh -c <script>` inside a service; returns trimmed stdout.
  async fn exec(&self, service: &str, script: &str) -> Result<String, RuntimeError>;

  /// Copy `src` out of a service's container to `dest` on the host.
  async fn copy_from(&self, service: &str, src: &str, dest: &Path) -> Result<(), RuntimeError>;

  /// Health of a container; `None` if no such container exists.
  async fn health(&self, container: &str) -> Result<Option<HealthStatus>, RuntimeError>;

  async fn versions(&self) -> RuntimeVersions;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_health_status() {
    assert_eq!(HealthStatus::parse("healthy\n"), Some(HealthStatus::Healthy));
    assert_eq!(HealthStatus::parse("unhealthy"), Some(HealthStatus::Unhealthy));
    assert_eq!(HealthStatus::parse("starting"), Some(HealthStatus::Starting));
    assert_eq!(HealthStatus::parse("running"), Some(HealthStatus::Running));
    assert_eq!(HealthStatus::parse("exited"), None);
  }

  #[test]
  fn readiness() {
    assert!(HealthStatus::Healthy.is_ready());
    assert!(HealthStatus::Running.is_ready());
    assert!(!HealthStatus::Starting.is_ready());
    assert!(!HealthStatus::Unhealthy.is_ready());
  }
}
