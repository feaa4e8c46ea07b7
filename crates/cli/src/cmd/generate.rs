//! Implementation of the `odoo-ops generate` command.

use std::io::IsTerminal;

use anyhow::{Context, Result};

use odoo_ops_lib::config::Settings;
use odoo_ops_lib::generate::{GenerateOptions, generate};

use super::load_workspace;
use crate::output::{print_info, print_stat, print_success};

/// Execute the generate command.
///
/// Rebuilds every service descriptor from the env file. With `dry`, the diff
/// against the manifest on disk is printed and nothing is written.
pub fn cmd_generate(settings: Settings, dashboard: bool, dry: bool) -> Result<()> {
  let mut ws = load_workspace(settings)?;
  let outcome = generate(&mut ws, &GenerateOptions { dashboard, dry }).context("Generate failed")?;
  let diff = &outcome.diff;

  if dry {
    if diff.has_changes() {
      print!("{}", diff.render(std::io::stdout().is_terminal()));
    } else {
      print_info("No changes");
    }
    return Ok(());
  }

  if outcome.saved {
    print_success(&format!("Wrote {}", ws.compose.path().display()));
  }
  print_stat("Lines added", &diff.insertions().to_string());
  print_stat("Lines removed", &diff.deletions().to_string());
  Ok(())
}
