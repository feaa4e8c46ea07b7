//! Test doubles for the runtime and database seams.
//!
//! Both mocks record what they were asked to do as plain strings so tests can
//! assert on exact command sequences.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::database::{ConnectParams, Connector, DatabaseError, SqlClient};
use crate::runtime::{ContainerRuntime, HealthStatus, RuntimeError, RuntimeVersions};

/// Records every runtime call; `exec` answers from configured outputs.
///
/// Call records look like `up db`, `stop live pre`, `exec db: <script>` and
/// `cp live:/odoo/src/ -> <dest>`. Health checks are counted separately.
#[derive(Default)]
pub struct MockRuntime {
  calls: Mutex<Vec<String>>,
  health: Mutex<HashMap<String, VecDeque<Option<HealthStatus>>>>,
  health_checks: Mutex<HashMap<String, usize>>,
  exec_outputs: Mutex<Vec<(String, String)>>,
  failures: Mutex<Vec<String>>,
  unavailable: bool,
}

impl MockRuntime {
  pub fn new() -> Self {
    Self::default()
  }

  /// A runtime whose daemon is not reachable.
  pub fn unavailable() -> Self {
    Self {
      unavailable: true,
      ..Self::default()
    }
  }

  /// Every service already running and healthy.
  pub fn healthy(services: &[&str]) -> Self {
    let runtime = Self::new();
    for service in services {
      runtime.set_health(service, Some(HealthStatus::Healthy));
    }
    runtime
  }

  pub fn set_health(&self, container: &str, status: Option<HealthStatus>) {
    self
      .health
      .lock()
      .unwrap()
      .insert(container.to_string(), VecDeque::from([status]));
  }

  /// Report `statuses` in order; the last one sticks.
  pub fn set_health_sequence(&self, container: &str, statuses: impl IntoIterator<Item = HealthStatus>) {
    self
      .health
      .lock()
      .unwrap()
      .insert(container.to_string(), statuses.into_iter().map(Some).collect());
  }

  /// `exec` scripts containing `pattern` print `output`.
  pub fn set_exec_output(&self, pattern: &str, output: &str) {
    self
      .exec_outputs
      .lock()
      .unwrap()
      .push((pattern.to_string(), output.to_string()));
  }

  /// Calls whose record contains `pattern` fail with exit code 1.
  pub fn fail_on(&self, pattern: &str) {
    self.failures.lock().unwrap().push(pattern.to_string());
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }

  pub fn health_checks(&self, container: &str) -> usize {
    self.health_checks.lock().unwrap().get(container).copied().unwrap_or(0)
  }

  fn record(&self, call: String) -> Result<(), RuntimeError> {
    self.calls.lock().unwrap().push(call.clone());
    if self.failures.lock().unwrap().iter().any(|p| call.contains(p.as_str())) {
      return Err(RuntimeError::CommandFailed {
        command: call,
        code: Some(1),
        stderr: "mock failure".to_string(),
      });
    }
    Ok(())
  }
}

impl ContainerRuntime for MockRuntime {
  async fn up(&self, services: &[&str]) -> Result<(), RuntimeError> {
    self.record(format!("up {}", services.join(" ")).trim_end().to_string())
  }

  async fn stop(&self, services: &[&str]) -> Result<(), RuntimeError> {
    self.record(format!("stop {}", services.join(" ")).trim_end().to_string())
  }

  async fn exec(&self, service: &str, script: &str) -> Result<String, RuntimeError> {
    self.record(format!("exec {service}: {script}"))?;
    let outputs = self.exec_outputs.lock().unwrap();
    Ok(
      outputs
        .iter()
        .find(|(pattern, _)| script.contains(pattern.as_str()))
        .map(|(_, out)| out.clone())
        .unwrap_or_default(),
    )
  }

  async fn copy_from(&self, service: &str, src: &str, dest: &Path) -> Result<(), RuntimeError> {
    self.record(format!("cp {service}:{src} -> {}", dest.display()))?;
    std::fs::create_dir_all(dest).unwrap();
    std::fs::write(dest.join("copied_from"), service).unwrap();
    Ok(())
  }

  async fn health(&self, container: &str) -> Result<Option<HealthStatus>, RuntimeError> {
    *self
      .health_checks
      .lock()
      .unwrap()
      .entry(container.to_string())
      .or_default() += 1;
    let mut health = self.health.lock().unwrap();
    let Some(queue) = health.get_mut(container) else {
      return Ok(None);
    };
    let status = if queue.len() > 1 { queue.pop_front() } else { queue.front().copied() };
    Ok(status.flatten())
  }

  async fn versions(&self) -> RuntimeVersions {
    if self.unavailable {
      return RuntimeVersions::default();
    }
    RuntimeVersions {
      docker: Some("27.1.0".to_string()),
      compose: Some("2.29.1".to_string()),
    }
  }
}

#[derive(Debug, Default)]
struct DbState {
  statements: Vec<(String, String)>,
  connections: Vec<ConnectParams>,
  tables: BTreeSet<String>,
  roles: BTreeSet<String>,
  fail_connect: bool,
}

/// In-memory stand-in for the SQL server.
#[derive(Clone, Default)]
pub struct MockConnector {
  state: Arc<Mutex<DbState>>,
}

pub struct MockClient {
  database: String,
  state: Arc<Mutex<DbState>>,
}

impl MockConnector {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_role(self, role: &str) -> Self {
    self.state.lock().unwrap().roles.insert(role.to_string());
    self
  }

  pub fn with_tables(self, tables: &[&str]) -> Self {
    self
      .state
      .lock()
      .unwrap()
      .tables
      .extend(tables.iter().map(|t| t.to_string()));
    self
  }

  pub fn refusing_connections(self) -> Self {
    self.state.lock().unwrap().fail_connect = true;
    self
  }

  /// Open a client without going through [`Connector::connect`].
  pub fn client(&self, database: &str) -> MockClient {
    MockClient {
      database: database.to_string(),
      state: Arc::clone(&self.state),
    }
  }

  pub fn statements(&self) -> Vec<String> {
    self.state.lock().unwrap().statements.iter().map(|(_, sql)| sql.clone()).collect()
  }

  /// Statements paired with the database they ran against.
  pub fn statements_by_database(&self) -> Vec<(String, String)> {
    self.state.lock().unwrap().statements.clone()
  }

  pub fn connections(&self) -> Vec<ConnectParams> {
    self.state.lock().unwrap().connections.clone()
  }

  pub fn has_role(&self, role: &str) -> bool {
    self.state.lock().unwrap().roles.contains(role)
  }
}

/// Text between the first pair of double quotes.
fn quoted_name(sql: &str) -> Option<&str> {
  let start = sql.find('"')? + 1;
  let len = sql[start..].find('"')?;
  Some(&sql[start..start + len])
}

impl Connector for MockConnector {
  type Client = MockClient;

  async fn connect(&self, params: &ConnectParams) -> Result<MockClient, DatabaseError> {
    let mut state = self.state.lock().unwrap();
    if state.fail_connect {
      return Err(DatabaseError::Connect {
        database: params.database.clone(),
        source: sqlx::Error::PoolClosed,
      });
    }
    state.connections.push(params.clone());
    Ok(self.client(&params.database))
  }
}

impl SqlClient for MockClient {
  async fn execute(&mut self, sql: &str) -> Result<u64, DatabaseError> {
    let mut state = self.state.lock().unwrap();
    if let Some(name) = quoted_name(sql) {
      if sql.starts_with("CREATE ROLE") {
        state.roles.insert(name.to_string());
      } else if sql.starts_with("DROP ROLE") {
        state.roles.remove(name);
      }
    }
    state.statements.push((self.database.clone(), sql.to_string()));
    Ok(1)
  }

  async fn table_exists(&mut self, table: &str) -> Result<bool, DatabaseError> {
    Ok(self.state.lock().unwrap().tables.contains(table))
  }

  async fn role_exists(&mut self, role: &str) -> Result<bool, DatabaseError> {
    Ok(self.state.lock().unwrap().roles.contains(role))
  }
}
