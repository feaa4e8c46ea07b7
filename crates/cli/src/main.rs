mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use odoo_ops_lib::config::Settings;
use odoo_ops_lib::error::exit;

use output::print_error;

/// odoo-ops - operator CLI for a multi-tenant Odoo stack
#[derive(Parser)]
#[command(name = "odoo-ops")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Working directory holding docker-compose.yml and .env
  #[arg(short = 'C', long, global = true, value_name = "PATH")]
  dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Write the env file and manifest, then bring the stack up
  Init {
    /// Base domain, e.g. example.com
    domain: String,

    /// Odoo version, e.g. 17.0
    version: String,

    /// Development mode: no TLS, domain syntax check only
    #[arg(short, long)]
    dev: bool,

    /// Skip the DNS check of the domain
    #[arg(long)]
    disable_domain_check: bool,
  },

  /// Regenerate the compose manifest from the env file
  Generate {
    /// Expose the proxy dashboard under proxy.<domain>
    #[arg(long)]
    dashboard: bool,

    /// Print the diff without writing the manifest
    #[arg(long)]
    dry: bool,
  },

  /// Point every environment at a new base domain
  ChangeDomain {
    /// New base domain
    domain: String,

    /// Skip the DNS check of the domain
    #[arg(long)]
    disable_domain_check: bool,
  },

  /// Replace an environment's database and filestore with a scrubbed copy of live
  RefreshEnvironment {
    /// Target environment, e.g. pre or odoo_dev_pr42
    environment: String,
  },

  /// Manage per-pull-request environments
  ManageDevEnv {
    #[command(subcommand)]
    action: DevEnvAction,
  },

  /// Copy module sources to the host and bind-mount them
  MountModules,

  /// Show the state of the working directory and its services
  Inspect {
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },
}

#[derive(Subcommand)]
enum DevEnvAction {
  /// Add the environment for a pull request
  Add {
    /// Pull request number (e.g. 42 or pr42)
    pr: String,
  },

  /// Remove the environment of a pull request
  Remove {
    /// Pull request number (e.g. 42 or pr42)
    pr: String,
  },

  /// Remove every pull request environment
  RemoveAll,
}

fn init_tracing(verbose: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
    if verbose {
      EnvFilter::new("warn,odoo_ops_lib=debug,odoo_ops=debug")
    } else {
      EnvFilter::new("warn")
    }
  });

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
  let mut settings = Settings::from_env();
  if let Some(dir) = cli.dir {
    settings = settings.with_work_dir(dir);
  }

  // inspect reports a missing runtime instead of failing on it
  if !matches!(cli.command, Commands::Inspect { .. }) {
    cmd::require_docker(&settings)?;
  }

  match cli.command {
    Commands::Init {
      domain,
      version,
      dev,
      disable_domain_check,
    } => cmd::cmd_init(settings, &domain, &version, dev, disable_domain_check),
    Commands::Generate { dashboard, dry } => cmd::cmd_generate(settings, dashboard, dry),
    Commands::ChangeDomain {
      domain,
      disable_domain_check,
    } => cmd::cmd_change_domain(settings, &domain, disable_domain_check),
    Commands::RefreshEnvironment { environment } => cmd::cmd_refresh(settings, &environment),
    Commands::ManageDevEnv { action } => match action {
      DevEnvAction::Add { pr } => cmd::cmd_dev_env_add(settings, &pr),
      DevEnvAction::Remove { pr } => cmd::cmd_dev_env_remove(settings, &pr),
      DevEnvAction::RemoveAll => cmd::cmd_dev_env_remove_all(settings),
    },
    Commands::MountModules => cmd::cmd_mount_modules(settings),
    Commands::Inspect { json } => cmd::cmd_inspect(settings, json),
  }
}

/// Exit code of the first library error in the chain.
fn exit_code(err: &anyhow::Error) -> u8 {
  let code = err
    .chain()
    .find_map(|cause| cause.downcast_ref::<odoo_ops_lib::Error>())
    .map_or(exit::GENERIC, |e| e.exit_code());
  u8::try_from(code).unwrap_or(1)
}

/// Single-line rendering of the error chain. Causes whose text is already
/// part of an outer message are skipped.
fn render(err: &anyhow::Error) -> String {
  let mut out = String::new();
  for cause in err.chain() {
    let message = cause.to_string();
    if out.contains(&message) {
      continue;
    }
    if !out.is_empty() {
      out.push_str(": ");
    }
    out.push_str(&message);
  }
  out
}

/// Exit code for a command line clap rejected. Help and version requests succeed.
fn usage_exit_code(err: &clap::Error) -> u8 {
  if err.use_stderr() {
    u8::try_from(exit::USAGE).unwrap_or(1)
  } else {
    0
  }
}

fn main() -> ExitCode {
  let cli = match Cli::try_parse() {
    Ok(cli) => cli,
    Err(err) => {
      let _ = err.print();
      return ExitCode::from(usage_exit_code(&err));
    }
  };
  init_tracing(cli.verbose);

  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&render(&err));
      ExitCode::from(exit_code(&err))
    }
  }
}
