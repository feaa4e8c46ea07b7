//! PostgreSQL client over sqlx.

use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tracing::debug;

use super::{ConnectParams, Connector, DatabaseError, SqlClient};

#[derive(Debug, Clone, Copy, Default)]
pub struct PgConnector;

pub struct PgClient {
  conn: PgConnection,
}

impl Connector for PgConnector {
  type Client = PgClient;

  async fn connect(&self, params: &ConnectParams) -> Result<PgClient, DatabaseError> {
    debug!(host = %params.host, port = params.port, database = %params.database, user = %params.user, "connecting");
    let options = PgConnectOptions::new()
      .host(&params.host)
      .port(params.port)
      .database(&params.database)
      .username(&params.user)
      .password(&params.password);
    let conn = PgConnection::connect_with(&options)
      .await
      .map_err(|source| DatabaseError::Connect {
        database: params.database.clone(),
        source,
      })?;
    Ok(PgClient { conn })
  }
}

impl SqlClient for PgClient {
  async fn execute(&mut self, sql: &str) -> Result<u64, DatabaseError> {
    // Simple query protocol; statements carry no bind parameters.
    let result = sqlx::raw_sql(sql).execute(&mut self.conn).await?;
    Ok(result.rows_affected())
  }

  async fn table_exists(&mut self, table: &str) -> Result<bool, DatabaseError> {
    let exists = sqlx::query_scalar::<_, bool>(
      "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_schema = current_schema() AND table_name = $1)",
    )
    .bind(table)
    .fetch_one(&mut self.conn)
    .await?;
    Ok(exists)
  }

  async fn role_exists(&mut self, role: &str) -> Result<bool, DatabaseError> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM pg_roles WHERE rolname = $1)")
      .bind(role)
      .fetch_one(&mut self.conn)
      .await?;
    Ok(exists)
  }
}
