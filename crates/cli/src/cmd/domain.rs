//! Implementation of the `odoo-ops change-domain` command.

use anyhow::{Context, Result};

use odoo_ops_lib::config::Settings;
use odoo_ops_lib::domain::change_domain;

use super::{block_on, load_workspace};
use crate::output::{print_stat, print_success};

pub fn cmd_change_domain(settings: Settings, domain: &str, skip_domain_check: bool) -> Result<()> {
  let mut ws = load_workspace(settings)?;
  let diff = block_on(change_domain(&mut ws, domain, skip_domain_check))?
    .with_context(|| format!("Failed to change domain to {domain}"))?;

  print_success(&format!("Domain changed to {domain}"));
  print_stat("Lines changed", &diff.insertions().to_string());
  Ok(())
}
