//! Implementation of the `odoo-ops refresh-environment` command.

use std::time::Instant;

use anyhow::{Context, Result};

use odoo_ops_lib::config::Settings;
use odoo_ops_lib::database::PgConnector;
use odoo_ops_lib::refresh::refresh_environment;
use odoo_ops_lib::runtime::DockerCompose;

use super::{block_on, load_workspace};
use crate::output::{format_duration, print_stat, print_step, print_success, print_warning};

/// Execute the refresh-environment command.
///
/// Prints each step as it begins. On failure the error names the step that
/// failed and the last one that completed.
pub fn cmd_refresh(settings: Settings, target: &str) -> Result<()> {
  let ws = load_workspace(settings)?;
  let runtime = DockerCompose::from_settings(&ws.settings);

  let started = Instant::now();
  let report = block_on(refresh_environment(&ws, &runtime, &PgConnector, target, |step| {
    print_step(step.description())
  }))?
  .with_context(|| format!("Refresh of {target} failed"))?;

  for table in &report.scrub.skipped {
    print_warning(&format!("Table {table} not found, not scrubbed"));
  }
  print_success(&format!("Refreshed {} from live", report.target));
  print_stat("Dump", &report.dump_path);
  print_stat("Files copied", &report.files_copied.to_string());
  print_stat("Tables scrubbed", &report.scrub.applied.len().to_string());
  print_stat("Took", &format_duration(started.elapsed()));
  Ok(())
}
