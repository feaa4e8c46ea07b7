//! Database lifecycle operations.
//!
//! Roles are managed over a SQL connection ([`SqlClient`]). Databases, dumps
//! and restores go through the client tools inside the database service via
//! [`ContainerRuntime::exec`]. Every destructive operation refuses to touch
//! the production database.

mod pg;

use std::fmt;

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::{DB_SERVICE, LIVE_SERVICE, POSTGRES_USER};
use crate::runtime::{ContainerRuntime, RuntimeError};
use crate::util::secret::unique_id;

pub use pg::{PgClient, PgConnector};

#[derive(Debug, Error)]
pub enum DatabaseError {
  #[error("refusing to {operation} protected database {name:?}")]
  OperationDenied { operation: &'static str, name: String },

  #[error("role already exists: {0}")]
  RoleExists(String),

  #[error("database already exists: {0}")]
  DatabaseExists(String),

  #[error("invalid identifier: {0:?}")]
  InvalidIdentifier(String),

  #[error("failed to connect to database {database}: {source}")]
  Connect { database: String, source: sqlx::Error },

  #[error(transparent)]
  Sql(#[from] sqlx::Error),

  #[error(transparent)]
  Exec(#[from] RuntimeError),
}

/// Where and as whom to open a SQL connection.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectParams {
  pub host: String,
  pub port: u16,
  pub database: String,
  pub user: String,
  pub password: String,
}

impl fmt::Debug for ConnectParams {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ConnectParams")
      .field("host", &self.host)
      .field("port", &self.port)
      .field("database", &self.database)
      .field("user", &self.user)
      .field("password", &"<redacted>")
      .finish()
  }
}

/// A live SQL session.
#[allow(async_fn_in_trait)]
pub trait SqlClient {
  /// Run one statement, returning the number of affected rows.
  async fn execute(&mut self, sql: &str) -> Result<u64, DatabaseError>;

  async fn table_exists(&mut self, table: &str) -> Result<bool, DatabaseError>;

  async fn role_exists(&mut self, role: &str) -> Result<bool, DatabaseError>;
}

/// Opens [`SqlClient`] sessions.
#[allow(async_fn_in_trait)]
pub trait Connector {
  type Client: SqlClient;

  async fn connect(&self, params: &ConnectParams) -> Result<Self::Client, DatabaseError>;
}

/// Case-insensitive check for the production database name.
pub fn is_protected(name: &str) -> bool {
  name.trim().eq_ignore_ascii_case(LIVE_SERVICE)
}

fn deny_protected(operation: &'static str, name: &str) -> Result<(), DatabaseError> {
  if is_protected(name) {
    return Err(DatabaseError::OperationDenied {
      operation,
      name: name.to_string(),
    });
  }
  Ok(())
}

/// Names go into shell commands and SQL; only allow what service names allow.
fn check_identifier(name: &str) -> Result<(), DatabaseError> {
  let valid = !name.is_empty()
    && name
      .chars()
      .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
  if valid {
    Ok(())
  } else {
    Err(DatabaseError::InvalidIdentifier(name.to_string()))
  }
}

pub fn quote_ident(ident: &str) -> String {
  format!("\"{}\"", ident.replace('"', "\"\""))
}

pub fn quote_literal(value: &str) -> String {
  format!("'{}'", value.replace('\'', "''"))
}

/// Create a login role allowed to create databases.
pub async fn create_role<C: SqlClient>(client: &mut C, name: &str, password: &str) -> Result<(), DatabaseError> {
  check_identifier(name)?;
  if client.role_exists(name).await? {
    return Err(DatabaseError::RoleExists(name.to_string()));
  }
  client
    .execute(&format!(
      "CREATE ROLE {} WITH LOGIN CREATEDB PASSWORD {}",
      quote_ident(name),
      quote_literal(password)
    ))
    .await?;
  info!(role = %name, "created role");
  Ok(())
}

/// Drop a role if present. Never the production role.
pub async fn drop_role<C: SqlClient>(client: &mut C, name: &str) -> Result<(), DatabaseError> {
  deny_protected("drop role", name)?;
  check_identifier(name)?;
  client
    .execute(&format!("DROP ROLE IF EXISTS {}", quote_ident(name)))
    .await?;
  info!(role = %name, "dropped role");
  Ok(())
}

/// Database operations executed inside the database service.
pub struct DatabaseOperator<'r, R> {
  runtime: &'r R,
  service: String,
}

impl<'r, R: ContainerRuntime> DatabaseOperator<'r, R> {
  pub fn new(runtime: &'r R) -> Self {
    Self {
      runtime,
      service: DB_SERVICE.to_string(),
    }
  }

  async fn exec(&self, script: &str) -> Result<String, DatabaseError> {
    debug!(service = %self.service, script = %script, "database command");
    Ok(self.runtime.exec(&self.service, script).await?)
  }

  pub async fn exists(&self, name: &str) -> Result<bool, DatabaseError> {
    check_identifier(name)?;
    let out = self
      .exec(&format!(
        "psql -U {POSTGRES_USER} -tAc \"SELECT 1 FROM pg_database WHERE datname = '{name}'\""
      ))
      .await?;
    Ok(out.trim() == "1")
  }

  /// Create an empty database owned by, and created as, `owner`.
  pub async fn create_database(&self, name: &str, owner: &str) -> Result<(), DatabaseError> {
    deny_protected("create database", name)?;
    check_identifier(name)?;
    check_identifier(owner)?;
    self.exec(&format!("createdb -U {owner} {name}")).await?;
    info!(database = %name, owner = %owner, "created database");
    Ok(())
  }

  /// Drop a database. Fails if it does not exist.
  pub async fn drop_database(&self, name: &str) -> Result<(), DatabaseError> {
    deny_protected("drop database", name)?;
    check_identifier(name)?;
    self.exec(&format!("dropdb -U {POSTGRES_USER} {name}")).await?;
    info!(database = %name, "dropped database");
    Ok(())
  }

  /// Write a custom-format dump of `name` into `dir` inside the database
  /// container; returns the dump path.
  pub async fn dump(&self, name: &str, dir: &str) -> Result<String, DatabaseError> {
    check_identifier(name)?;
    let path = format!("{}/{name}_{}.dump", dir.trim_end_matches('/'), unique_id());
    self
      .exec(&format!("pg_dump -U {POSTGRES_USER} -Fc {name} > {path}"))
      .await?;
    info!(database = %name, path = %path, "dumped database");
    Ok(path)
  }

  /// Create `name` as `owner` and load the dump at `path` into it.
  pub async fn restore(&self, name: &str, owner: &str, path: &str) -> Result<(), DatabaseError> {
    deny_protected("restore into", name)?;
    check_identifier(name)?;
    check_identifier(owner)?;
    if self.exists(name).await? {
      return Err(DatabaseError::DatabaseExists(name.to_string()));
    }
    self.create_database(name, owner).await?;
    self
      .exec(&format!(
        "pg_restore --clean --if-exists --no-acl --no-owner -d {name} -U {owner} {path}"
      ))
      .await?;
    info!(database = %name, path = %path, "restored database");
    Ok(())
  }

  /// Delete a file inside the database container.
  pub async fn remove_file(&self, path: &str) -> Result<(), DatabaseError> {
    self.exec(&format!("rm {path}")).await?;
    debug!(path = %path, "removed file");
    Ok(())
  }
}
