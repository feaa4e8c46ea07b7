//! Implementation of the `odoo-ops inspect` command.

use anyhow::Result;

use odoo_ops_lib::config::Settings;
use odoo_ops_lib::inspect::{InspectReport, inspect};
use odoo_ops_lib::runtime::{DockerCompose, HealthStatus};

use super::{block_on, load_workspace};
use crate::output::{print_info, print_json, print_stat, print_success, print_warning};

/// Execute the inspect command.
///
/// Works in any directory; nothing here requires an initialized workspace
/// or a running runtime.
pub fn cmd_inspect(settings: Settings, json: bool) -> Result<()> {
  let ws = load_workspace(settings)?;
  let runtime = DockerCompose::from_settings(&ws.settings);
  let report = block_on(inspect(&ws, &runtime))?;

  if json {
    return print_json(&report);
  }
  print_report(&report);
  Ok(())
}

fn or_unknown(value: &Option<String>) -> &str {
  value.as_deref().unwrap_or("-")
}

fn health(status: &Option<HealthStatus>) -> &str {
  status.as_ref().map_or("not running", HealthStatus::as_str)
}

fn check(label: &str, ok: Option<bool>) {
  match ok {
    Some(true) => print_success(label),
    Some(false) => print_warning(label),
    None => print_info(&format!("{label} (not checked)")),
  }
}

fn print_report(report: &InspectReport) {
  let state = &report.state;
  println!("State");
  print_stat("Initialized", if state.initialized { "yes" } else { "no" });
  print_stat("Domain", or_unknown(&state.domain));
  print_stat("Odoo version", or_unknown(&state.odoo_version));
  print_stat("Dev environments", &state.num_dev_envs.to_string());
  print_stat("Docker", or_unknown(&state.docker_version));
  print_stat("Docker Compose", or_unknown(&state.docker_compose_version));
  if state.initialized {
    print_stat("Database", health(&state.db_health));
    print_stat("Proxy", health(&state.proxy_health));
  }

  let checklist = &report.checklist;
  println!();
  println!("Checklist");
  check("Domain configured", checklist.domain_configured);
  check("Subdomains configured", checklist.subdomain_configured);
  check("Docker installed", Some(checklist.docker_installed));
  check("Docker Compose installed", Some(checklist.docker_compose_installed));
}
