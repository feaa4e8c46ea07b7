//! State report for operators.

use serde::Serialize;

use crate::consts::{DB_SERVICE, PROXY_SERVICE};
use crate::domain::domain_configured;
use crate::runtime::{ContainerRuntime, HealthStatus};
use crate::workspace::Workspace;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectReport {
  pub state: State,
  pub checklist: Checklist,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct State {
  pub initialized: bool,
  pub domain: Option<String>,
  pub odoo_version: Option<String>,
  pub num_dev_envs: usize,
  pub docker_version: Option<String>,
  pub docker_compose_version: Option<String>,
  pub db_health: Option<HealthStatus>,
  pub proxy_health: Option<HealthStatus>,
}

/// `None` entries could not be checked (not initialized).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checklist {
  pub domain_configured: Option<bool>,
  pub subdomain_configured: Option<bool>,
  pub docker_installed: bool,
  pub docker_compose_installed: bool,
}

/// Gather the report. Never fails: anything unavailable is reported as such.
pub async fn inspect<R: ContainerRuntime>(ws: &Workspace, runtime: &R) -> InspectReport {
  let initialized = ws.is_initialized();
  let domain = ws.domain().ok().filter(|_| initialized).map(str::to_string);
  let odoo_version = ws.version().ok().filter(|_| initialized).map(str::to_string);
  let versions = runtime.versions().await;

  let (db_health, proxy_health, configured) = if initialized {
    let db = runtime.health(DB_SERVICE).await.ok().flatten();
    let proxy = runtime.health(PROXY_SERVICE).await.ok().flatten();
    let configured = match &domain {
      Some(domain) => Some(domain_configured(domain, ws.is_dev()).await),
      None => Some(false),
    };
    (db, proxy, configured)
  } else {
    (None, None, None)
  };

  InspectReport {
    state: State {
      initialized,
      domain,
      odoo_version,
      num_dev_envs: ws.dev_environments().len(),
      docker_version: versions.docker.clone(),
      docker_compose_version: versions.compose.clone(),
      db_health,
      proxy_health,
    },
    checklist: Checklist {
      domain_configured: configured,
      subdomain_configured: configured,
      docker_installed: versions.docker.is_some(),
      docker_compose_installed: versions.compose.is_some(),
    },
  }
}
