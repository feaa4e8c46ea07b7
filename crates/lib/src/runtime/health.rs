//! Polling for container health.

use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use super::{ContainerRuntime, HealthStatus, RuntimeError};

#[derive(Debug, Error)]
pub enum HealthError {
  #[error("service {0} is not running")]
  NotRunning(String),

  #[error("service {0} is unhealthy")]
  Unhealthy(String),

  #[error("timed out after {}s waiting for {service} to become healthy", waited.as_secs())]
  Timeout { service: String, waited: Duration },

  #[error(transparent)]
  Runtime(#[from] RuntimeError),
}

/// Poll cadence and deadline for [`wait_healthy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthWait {
  pub interval: Duration,
  pub timeout: Duration,
}

impl Default for HealthWait {
  fn default() -> Self {
    Self {
      interval: Duration::from_secs(5),
      timeout: Duration::from_secs(300),
    }
  }
}

/// Wait until every service reports ready, one after another.
///
/// A missing container or an `unhealthy` report fails at once; `starting`
/// keeps polling until the deadline.
pub async fn wait_healthy<R: ContainerRuntime>(
  runtime: &R,
  services: &[&str],
  wait: &HealthWait,
) -> Result<(), HealthError> {
  for service in services {
    let started = Instant::now();
    loop {
      match runtime.health(service).await? {
        None => return Err(HealthError::NotRunning(service.to_string())),
        Some(HealthStatus::Unhealthy) => return Err(HealthError::Unhealthy(service.to_string())),
        Some(status) if status.is_ready() => {
          info!(service = %service, "service is healthy");
          break;
        }
        Some(status) => debug!(service = %service, status = %status, "waiting for service"),
      }

      let waited = started.elapsed();
      if waited >= wait.timeout {
        return Err(HealthError::Timeout {
          service: service.to_string(),
          waited,
        });
      }
      sleep(wait.interval).await;
    }
  }
  Ok(())
}
