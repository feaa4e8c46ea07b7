//! Manifest generation from the env file.
//!
//! Rebuilds every managed service descriptor from the current settings and
//! writes the manifest. Existing dynamic environments are regenerated too, so
//! a domain change reaches all of them.

use tracing::{debug, info};

use crate::compose::TextDiff;
use crate::consts::{DB_SERVICE, PDF_SERVICE, PROXY_SERVICE};
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::services::{
  OdooParams, ProxyParams, ServiceDescriptor, odoo_service, pdf_service, postgres_service, proxy_service,
};
use crate::util::secret::generate_password;
use crate::workspace::Workspace;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateOptions {
  /// Expose the proxy dashboard.
  pub dashboard: bool,
  /// Compute the diff without writing.
  pub dry: bool,
}

#[derive(Debug, Clone)]
pub struct GenerateOutcome {
  /// Changes relative to the manifest as loaded.
  pub diff: TextDiff,
  pub saved: bool,
}

/// Descriptor of an application environment under the current settings.
///
/// The database password is a placeholder expanded by compose; the admin
/// password is fresh on every call since nobody logs in with it.
pub fn environment_service(ws: &Workspace, env: Environment) -> Result<ServiceDescriptor> {
  let name = env.service_name();
  let domain = env.domain(ws.domain()?);
  let db_password = env.password_placeholder();
  let admin_password = generate_password();
  Ok(odoo_service(&OdooParams {
    name: &name,
    domain: &domain,
    db_password: &db_password,
    admin_password: &admin_password,
    version: ws.version()?,
    require_basic_auth: !env.is_protected(),
    use_tls: !ws.is_dev(),
    module_mode: ws.module_mode(),
  }))
}

/// Upsert all managed services and save unless `dry`.
pub fn generate(ws: &mut Workspace, options: &GenerateOptions) -> Result<GenerateOutcome> {
  if !ws.env.is_initialized() {
    return Err(Error::NotInitialized);
  }

  let proxy = proxy_service(&ProxyParams {
    name: PROXY_SERVICE,
    domain: ws.domain()?,
    enable_dashboard: options.dashboard,
    use_tls: !ws.is_dev(),
  });

  let mut services = vec![
    proxy,
    environment_service(ws, Environment::Live)?,
    environment_service(ws, Environment::Pre)?,
    postgres_service(DB_SERVICE),
    pdf_service(PDF_SERVICE),
  ];
  for env in ws.dev_environments() {
    debug!(environment = %env, "regenerating dynamic environment");
    services.push(environment_service(ws, env)?);
  }

  for service in &services {
    ws.compose.upsert_service(service)?;
  }

  let diff = ws.compose.diff()?;
  if options.dry {
    info!(insertions = diff.insertions(), deletions = diff.deletions(), "dry run, manifest not written");
    return Ok(GenerateOutcome { diff, saved: false });
  }

  ws.compose.save()?;
  info!(path = %ws.compose.path().display(), services = services.len(), "manifest written");
  Ok(GenerateOutcome { diff, saved: true })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::compose::ComposeFile;
  use crate::config::Settings;
  use std::fs;
  use tempfile::TempDir;

  const ENV: &str = "DEV=0\nMODULE_MODE=included\nDOMAIN=example.com\nVERSION=17.0\nMASTER_DB_PASSWORD=m\n";

  fn workspace(compose: Option<&str>) -> (TempDir, Workspace) {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(".env"), ENV).unwrap();
    if let Some(compose) = compose {
      fs::write(temp.path().join("docker-compose.yml"), compose).unwrap();
    }
    let ws = Workspace::load(Settings::default().with_work_dir(temp.path())).unwrap();
    (temp, ws)
  }

  #[test]
  fn writes_the_five_managed_services() {
    let (temp, mut ws) = workspace(None);

    let outcome = generate(&mut ws, &GenerateOptions::default()).unwrap();
    assert!(outcome.saved);

    let compose = ComposeFile::load(temp.path().join("docker-compose.yml")).unwrap();
    let names: Vec<&str> = compose.service_names().collect();
    assert_eq!(names, vec!["proxy", "live", "pre", "db", "kwkhtmltopdf"]);
  }

  #[test]
  fn live_has_no_basic_auth_and_uses_base_domain() {
    let (_temp, mut ws) = workspace(None);
    generate(&mut ws, &GenerateOptions::default()).unwrap();

    let live = serde_yaml::to_string(ws.compose.service("live").unwrap()).unwrap();
    assert!(live.contains("Host(`example.com`)"));
    assert!(!live.contains("basic_auth@file"));
    assert!(live.contains("${LIVE_DB_PASSWORD}"));

    let pre = serde_yaml::to_string(ws.compose.service("pre").unwrap()).unwrap();
    assert!(pre.contains("Host(`pre.example.com`)"));
    assert!(pre.contains("basic_auth@file"));
  }

  #[test]
  fn dry_run_leaves_file_untouched() {
    let original = "version: '3.8'\nservices:\n  db:\n    image: old\n";
    let (temp, mut ws) = workspace(Some(original));

    let outcome = generate(
      &mut ws,
      &GenerateOptions {
        dashboard: false,
        dry: true,
      },
    )
    .unwrap();

    assert!(!outcome.saved);
    assert!(outcome.diff.has_changes());
    assert_eq!(fs::read_to_string(temp.path().join("docker-compose.yml")).unwrap(), original);
  }

  #[test]
  fn regenerates_existing_dev_environments() {
    let (_temp, mut ws) = workspace(Some("version: '3.8'\nservices:\n  odoo_dev_pr4:\n    image: stale\n"));

    generate(&mut ws, &GenerateOptions::default()).unwrap();

    let dev = serde_yaml::to_string(ws.compose.service("odoo_dev_pr4").unwrap()).unwrap();
    assert!(dev.contains("Host(`pr4.example.com`)"));
    assert!(dev.contains("${ODOO_DEV_PR4_DB_PASSWORD}"));
    assert!(!dev.contains("stale"));
  }

  #[test]
  fn dashboard_flag_reaches_proxy() {
    let (_temp, mut ws) = workspace(None);
    generate(
      &mut ws,
      &GenerateOptions {
        dashboard: true,
        dry: true,
      },
    )
    .unwrap();

    let proxy = serde_yaml::to_string(ws.compose.service("proxy").unwrap()).unwrap();
    assert!(proxy.contains("proxy.example.com"));
  }

  #[test]
  fn requires_env_file() {
    let temp = TempDir::new().unwrap();
    let mut ws = Workspace::load(Settings::default().with_work_dir(temp.path())).unwrap();
    assert!(matches!(
      generate(&mut ws, &GenerateOptions::default()),
      Err(Error::NotInitialized)
    ));
  }
}
