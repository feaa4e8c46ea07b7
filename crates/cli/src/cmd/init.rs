//! Implementation of the `odoo-ops init` command.

use std::time::Instant;

use anyhow::{Context, Result};

use odoo_ops_lib::config::Settings;
use odoo_ops_lib::database::PgConnector;
use odoo_ops_lib::init::{InitOptions, init};
use odoo_ops_lib::runtime::DockerCompose;

use super::{block_on, load_workspace};
use crate::output::{format_duration, print_info, print_stat, print_success};

/// Execute the init command.
///
/// Writes the env file with fresh passwords, generates the manifest, waits for
/// the database to become healthy, creates the `live` and `pre` roles and
/// starts the stack.
pub fn cmd_init(settings: Settings, domain: &str, version: &str, dev: bool, skip_domain_check: bool) -> Result<()> {
  let mut ws = load_workspace(settings)?;
  let runtime = DockerCompose::from_settings(&ws.settings);
  let options = InitOptions {
    dev,
    skip_domain_check,
    ..InitOptions::new(domain, version)
  };

  print_info(&format!("Initializing {domain} with Odoo {version}"));
  let started = Instant::now();
  block_on(init(&mut ws, &runtime, &PgConnector, &options))?.context("Initialization failed")?;

  print_success("Initialized");
  print_stat("Manifest", &ws.compose.path().display().to_string());
  print_stat("Env file", &ws.env.path().display().to_string());
  print_stat("Mode", if dev { "development" } else { "production" });
  print_stat("Took", &format_duration(started.elapsed()));
  Ok(())
}
