//! First-time setup of a working directory.

use tracing::info;

use crate::consts::{DB_SERVICE, LIVE_SERVICE, MODULE_MODE_INCLUDED, POSTGRES_DB, PRE_SERVICE, keys};
use crate::database::{Connector, create_role};
use crate::domain::check_domain;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::generate::{GenerateOptions, generate};
use crate::runtime::{ContainerRuntime, HealthWait, wait_healthy};
use crate::util::secret::generate_password;
use crate::workspace::Workspace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOptions {
  pub domain: String,
  pub version: String,
  pub dev: bool,
  pub skip_domain_check: bool,
  pub health: HealthWait,
}

impl InitOptions {
  pub fn new(domain: impl Into<String>, version: impl Into<String>) -> Self {
    Self {
      domain: domain.into(),
      version: version.into(),
      dev: false,
      skip_domain_check: false,
      health: HealthWait::default(),
    }
  }
}

/// Write the env file and manifest, start the database, create the `live`
/// and `pre` roles and bring the whole stack up.
pub async fn init<R, C>(ws: &mut Workspace, runtime: &R, connector: &C, options: &InitOptions) -> Result<()>
where
  R: ContainerRuntime,
  C: Connector,
{
  if ws.is_initialized() {
    return Err(Error::AlreadyInitialized(ws.compose.path().to_path_buf()));
  }
  check_domain(&options.domain, options.dev, options.skip_domain_check).await?;

  // A leftover env file without a manifest never got as far as creating
  // roles, so its values are safe to overwrite.
  let master_password = generate_password();
  let live_password = generate_password();
  let pre_password = generate_password();
  ws.env.set(keys::DEV, if options.dev { "1" } else { "0" });
  ws.env.set(keys::MODULE_MODE, MODULE_MODE_INCLUDED);
  ws.env.set(keys::DOMAIN, options.domain.as_str());
  ws.env.set(keys::VERSION, options.version.as_str());
  ws.env.set(keys::MASTER_DB_PASSWORD, master_password);
  ws.env.set(&Environment::Live.password_key(), live_password.as_str());
  ws.env.set(&Environment::Pre.password_key(), pre_password.as_str());
  ws.env.save()?;
  info!(path = %ws.env.path().display(), "env file written");

  generate(ws, &GenerateOptions::default())?;

  runtime.up(&[DB_SERVICE]).await?;
  wait_healthy(runtime, &[DB_SERVICE], &options.health).await?;

  let mut client = connector.connect(&ws.admin_connection(POSTGRES_DB)?).await?;
  create_role(&mut client, LIVE_SERVICE, &live_password).await?;
  create_role(&mut client, PRE_SERVICE, &pre_password).await?;

  runtime.up(&[]).await?;
  info!(domain = %options.domain, version = %options.version, "initialized");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Settings;
  use crate::env::EnvFile;
  use crate::runtime::HealthStatus;
  use crate::util::testutil::{MockConnector, MockRuntime};
  use std::fs;
  use std::time::Duration;
  use tempfile::TempDir;

  fn options() -> InitOptions {
    InitOptions {
      dev: true,
      health: HealthWait {
        interval: Duration::from_millis(1),
        timeout: Duration::from_millis(50),
      },
      ..InitOptions::new("example.com", "17.0")
    }
  }

  fn workspace(temp: &TempDir) -> Workspace {
    Workspace::load(Settings::default().with_work_dir(temp.path())).unwrap()
  }

  #[tokio::test]
  async fn fresh_directory_is_fully_initialized() {
    let temp = TempDir::new().unwrap();
    let mut ws = workspace(&temp);
    let runtime = MockRuntime::healthy(&["db"]);
    let connector = MockConnector::new();

    init(&mut ws, &runtime, &connector, &options()).await.unwrap();

    let env = EnvFile::load(temp.path().join(".env")).unwrap();
    assert_eq!(env.read("DOMAIN").unwrap(), "example.com");
    assert_eq!(env.read("VERSION").unwrap(), "17.0");
    assert_eq!(env.read("DEV").unwrap(), "1");
    assert_eq!(env.read("MODULE_MODE").unwrap(), "included");
    for key in ["MASTER_DB_PASSWORD", "LIVE_DB_PASSWORD", "PRE_DB_PASSWORD"] {
      assert_eq!(env.read(key).unwrap().len(), 43, "{key}");
    }

    let reloaded = workspace(&temp);
    let names: Vec<&str> = reloaded.compose.service_names().collect();
    assert_eq!(names, vec!["proxy", "live", "pre", "db", "kwkhtmltopdf"]);

    assert_eq!(runtime.calls(), vec!["up db", "up"]);
    assert!(connector.has_role("live"));
    assert!(connector.has_role("pre"));

    let conn = &connector.connections()[0];
    assert_eq!(conn.database, "postgres");
    assert_eq!(conn.password, env.read("MASTER_DB_PASSWORD").unwrap());
  }

  #[tokio::test]
  async fn second_init_is_refused() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("docker-compose.yml"), "services: {}\n").unwrap();
    let mut ws = workspace(&temp);
    let runtime = MockRuntime::healthy(&["db"]);

    let err = init(&mut ws, &runtime, &MockConnector::new(), &options()).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyInitialized(_)));
    assert!(runtime.calls().is_empty());
    assert!(!temp.path().join(".env").exists());
  }

  #[tokio::test]
  async fn invalid_domain_stops_before_writing() {
    let temp = TempDir::new().unwrap();
    let mut ws = workspace(&temp);
    let runtime = MockRuntime::new();
    let options = InitOptions {
      domain: "not a domain".into(),
      ..options()
    };

    let err = init(&mut ws, &runtime, &MockConnector::new(), &options).await.unwrap_err();
    assert_eq!(err.exit_code(), 3);
    assert!(!temp.path().join(".env").exists());
  }

  #[tokio::test]
  async fn unhealthy_database_aborts_before_roles() {
    let temp = TempDir::new().unwrap();
    let mut ws = workspace(&temp);
    let runtime = MockRuntime::new();
    runtime.set_health("db", Some(HealthStatus::Unhealthy));
    let connector = MockConnector::new();

    let err = init(&mut ws, &runtime, &connector, &options()).await.unwrap_err();
    assert!(matches!(err, Error::ServiceUnhealthy(_)));
    assert!(connector.statements().is_empty());
    assert_eq!(runtime.calls(), vec!["up db"]);
  }
}
