//! Environment refresh: replace a non-production environment's database and
//! file-store with a scrubbed copy of production.
//!
//! The steps run strictly in order and are never retried. There is no
//! rollback; a failure reports the step that failed and the last one that
//! completed so the operator can resume by hand.

use std::fmt;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::consts::{DB_SERVICE, DUMP_DIR, LIVE_SERVICE};
use crate::database::{Connector, DatabaseError, DatabaseOperator, SqlClient, quote_literal};
use crate::environment::Environment;
use crate::error::Result;
use crate::guard::{prevent_protected, require_environment, require_healthy_database, require_initialized};
use crate::runtime::{ContainerRuntime, RuntimeError};
use crate::util::fs::{CopyError, replace_dir};
use crate::util::secret::unique_id;
use crate::workspace::Workspace;

/// Workflow states, each reached when the step of the same name completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RefreshStep {
  Stopped,
  DatabaseDropped,
  SourceDumped,
  TargetRestored,
  DumpCleaned,
  FilestoreCopied,
  Scrubbed,
  Started,
}

impl RefreshStep {
  pub const ALL: [RefreshStep; 8] = [
    RefreshStep::Stopped,
    RefreshStep::DatabaseDropped,
    RefreshStep::SourceDumped,
    RefreshStep::TargetRestored,
    RefreshStep::DumpCleaned,
    RefreshStep::FilestoreCopied,
    RefreshStep::Scrubbed,
    RefreshStep::Started,
  ];

  /// Progress line shown while the step runs.
  pub fn description(&self) -> &'static str {
    match self {
      RefreshStep::Stopped => "Stopping environment",
      RefreshStep::DatabaseDropped => "Removing old database",
      RefreshStep::SourceDumped => "Dumping live database",
      RefreshStep::TargetRestored => "Restoring dump",
      RefreshStep::DumpCleaned => "Removing dump",
      RefreshStep::FilestoreCopied => "Copying filestore",
      RefreshStep::Scrubbed => "Scrubbing database",
      RefreshStep::Started => "Starting environment",
    }
  }
}

impl fmt::Display for RefreshStep {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      RefreshStep::Stopped => "stopped",
      RefreshStep::DatabaseDropped => "database-dropped",
      RefreshStep::SourceDumped => "source-dumped",
      RefreshStep::TargetRestored => "target-restored",
      RefreshStep::DumpCleaned => "dump-cleaned",
      RefreshStep::FilestoreCopied => "filestore-copied",
      RefreshStep::Scrubbed => "scrubbed",
      RefreshStep::Started => "started",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Error)]
pub enum StepError {
  #[error(transparent)]
  Runtime(#[from] RuntimeError),

  #[error(transparent)]
  Database(#[from] DatabaseError),

  #[error(transparent)]
  Copy(#[from] CopyError),
}

fn describe(step: &Option<RefreshStep>) -> String {
  step.map_or_else(|| "none".to_string(), |s| s.to_string())
}

#[derive(Debug, Error)]
pub enum RefreshError {
  #[error("refresh of {target} failed at {step} (last completed: {}): {source}", describe(last_completed))]
  StepFailed {
    target: String,
    step: RefreshStep,
    last_completed: Option<RefreshStep>,
    #[source]
    source: StepError,
  },

  /// Every step ran, but the temporary dump could not be deleted.
  #[error("refresh of {target} completed but the dump {path} was not removed: {source}")]
  CleanupFailed {
    target: String,
    path: String,
    #[source]
    source: StepError,
  },
}

/// Tables scrubbed after a restore, with the statement applied to each.
fn scrub_statements() -> [(&'static str, String); 4] {
  [
    ("fetchmail_server", "DELETE FROM fetchmail_server".to_string()),
    ("ir_mail_server", "DELETE FROM ir_mail_server".to_string()),
    ("ir_cron", "UPDATE ir_cron SET active = FALSE".to_string()),
    (
      "ir_config_parameter",
      format!(
        "UPDATE ir_config_parameter SET value = {} WHERE key = 'database.uuid'",
        quote_literal(&unique_id())
      ),
    ),
  ]
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrubReport {
  pub applied: Vec<&'static str>,
  /// Tables absent from this schema version.
  pub skipped: Vec<&'static str>,
}

/// Neutralize mail servers, scheduled jobs and the installation identity.
pub async fn scrub<C: SqlClient>(client: &mut C) -> Result<ScrubReport, DatabaseError> {
  let mut report = ScrubReport::default();
  for (table, statement) in scrub_statements() {
    if !client.table_exists(table).await? {
      warn!(table = %table, "table does not exist, skipping scrub");
      report.skipped.push(table);
      continue;
    }
    let rows = client.execute(&statement).await?;
    info!(table = %table, rows, "scrubbed");
    report.applied.push(table);
  }
  Ok(report)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
  pub target: Environment,
  pub dump_path: String,
  pub files_copied: u64,
  pub scrub: ScrubReport,
}

struct Progress<'f, F> {
  target: String,
  last_completed: Option<RefreshStep>,
  on_step: &'f mut F,
}

impl<F: FnMut(RefreshStep)> Progress<'_, F> {
  fn begin(&mut self, step: RefreshStep) {
    info!(target_env = %self.target, step = %step, "{}", step.description());
    (self.on_step)(step);
  }

  fn complete(&mut self, step: RefreshStep) {
    self.last_completed = Some(step);
  }

  fn fail(&self, step: RefreshStep, source: impl Into<StepError>) -> RefreshError {
    let source = source.into();
    error!(
      target_env = %self.target,
      step = %step,
      last_completed = %describe(&self.last_completed),
      error = %source,
      "refresh step failed"
    );
    RefreshError::StepFailed {
      target: self.target.clone(),
      step,
      last_completed: self.last_completed,
      source,
    }
  }
}

/// Refresh `target` from production.
///
/// `on_step` is called as each step begins. Preconditions are checked before
/// anything runs: `target` is not production (in any spelling), the
/// workspace is initialized, the database is healthy and `target` exists in
/// the manifest.
///
/// A failure to delete the temporary dump does not stop the remaining steps;
/// it is returned as [`RefreshError::CleanupFailed`] once they have run.
pub async fn refresh_environment<R, C, F>(
  ws: &Workspace,
  runtime: &R,
  connector: &C,
  target: &str,
  mut on_step: F,
) -> Result<RefreshReport>
where
  R: ContainerRuntime,
  C: Connector,
  F: FnMut(RefreshStep),
{
  let env = prevent_protected(target)?;
  require_initialized(ws)?;
  require_healthy_database(runtime).await?;
  require_environment(ws, env)?;

  let name = env.service_name();
  let database = env.database();
  let admin = ws.admin_connection(&database)?;
  let db = DatabaseOperator::new(runtime);
  let mut progress = Progress {
    target: name.clone(),
    last_completed: None,
    on_step: &mut on_step,
  };
  info!(target_env = %name, "refreshing environment");

  progress.begin(RefreshStep::Stopped);
  runtime
    .stop(&[name.as_str()])
    .await
    .map_err(|e| progress.fail(RefreshStep::Stopped, e))?;
  progress.complete(RefreshStep::Stopped);

  progress.begin(RefreshStep::DatabaseDropped);
  db.drop_database(&database)
    .await
    .map_err(|e| progress.fail(RefreshStep::DatabaseDropped, e))?;
  progress.complete(RefreshStep::DatabaseDropped);

  progress.begin(RefreshStep::SourceDumped);
  let dump_path = db
    .dump(LIVE_SERVICE, DUMP_DIR)
    .await
    .map_err(|e| progress.fail(RefreshStep::SourceDumped, e))?;
  progress.complete(RefreshStep::SourceDumped);

  progress.begin(RefreshStep::TargetRestored);
  db.restore(&database, &database, &dump_path)
    .await
    .map_err(|e| progress.fail(RefreshStep::TargetRestored, e))?;
  progress.complete(RefreshStep::TargetRestored);

  progress.begin(RefreshStep::DumpCleaned);
  let cleanup = db.remove_file(&dump_path).await;
  if let Err(e) = &cleanup {
    warn!(service = DB_SERVICE, path = %dump_path, error = %e, "could not remove dump, continuing");
  }
  progress.complete(RefreshStep::DumpCleaned);

  progress.begin(RefreshStep::FilestoreCopied);
  let files_copied = replace_dir(
    &ws.settings.filestore_dir(LIVE_SERVICE),
    &ws.settings.filestore_dir(&name),
  )
  .map_err(|e| progress.fail(RefreshStep::FilestoreCopied, e))?;
  progress.complete(RefreshStep::FilestoreCopied);

  progress.begin(RefreshStep::Scrubbed);
  let scrubbed = async {
    let mut client = connector.connect(&admin).await?;
    scrub(&mut client).await
  }
  .await
  .map_err(|e| progress.fail(RefreshStep::Scrubbed, e))?;
  progress.complete(RefreshStep::Scrubbed);

  progress.begin(RefreshStep::Started);
  runtime
    .up(&[name.as_str()])
    .await
    .map_err(|e| progress.fail(RefreshStep::Started, e))?;
  progress.complete(RefreshStep::Started);

  if let Err(e) = cleanup {
    return Err(
      RefreshError::CleanupFailed {
        target: name,
        path: dump_path,
        source: e.into(),
      }
      .into(),
    );
  }

  info!(target_env = %name, files = files_copied, "environment refreshed");
  Ok(RefreshReport {
    target: env,
    dump_path,
    files_copied,
    scrub: scrubbed,
  })
}
