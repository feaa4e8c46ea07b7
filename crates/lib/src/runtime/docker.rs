//! `docker compose` backed runtime.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info};

use super::{ContainerRuntime, HealthStatus, RuntimeError, RuntimeVersions};
use crate::config::Settings;

/// Go template printing the health status, or the plain state when the
/// container defines no health check.
const HEALTH_TEMPLATE: &str = "{{if .State.Health}}{{.State.Health.Status}}{{else}}{{.State.Status}}{{end}}";

/// Runs the `docker` CLI with the manifest directory as working directory.
#[derive(Debug, Clone)]
pub struct DockerCompose {
  bin: String,
  project_dir: PathBuf,
}

impl DockerCompose {
  pub fn new(bin: impl Into<String>, project_dir: impl Into<PathBuf>) -> Self {
    Self {
      bin: bin.into(),
      project_dir: project_dir.into(),
    }
  }

  pub fn from_settings(settings: &Settings) -> Self {
    Self::new(settings.docker_bin.clone(), settings.work_dir())
  }

  fn display(&self, args: &[&str]) -> String {
    let mut cmd = self.bin.clone();
    for arg in args {
      cmd.push(' ');
      cmd.push_str(arg);
    }
    cmd
  }

  /// Run the binary with `args`, returning trimmed stdout on success.
  async fn run(&self, args: &[&str]) -> Result<String, RuntimeError> {
    let cmd = self.display(args);
    info!(cmd = %cmd, "executing command");

    let output = Command::new(&self.bin)
      .args(args)
      .current_dir(&self.project_dir)
      .output()
      .await
      .map_err(|source| RuntimeError::Spawn {
        command: cmd.clone(),
        source,
      })?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
      let stdout = String::from_utf8_lossy(&output.stdout);

      if !stderr.is_empty() {
        debug!(stderr = %stderr, "command stderr");
      }
      if !stdout.is_empty() {
        debug!(stdout = %stdout, "command stdout");
      }

      return Err(RuntimeError::CommandFailed {
        command: cmd,
        code: output.status.code(),
        stderr,
      });
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !stdout.is_empty() {
      debug!(stdout = %stdout, "command output");
    }
    Ok(stdout)
  }
}

impl ContainerRuntime for DockerCompose {
  async fn up(&self, services: &[&str]) -> Result<(), RuntimeError> {
    let mut args = vec!["compose", "up", "-d"];
    args.extend_from_slice(services);
    self.run(&args).await.map(|_| ())
  }

  async fn stop(&self, services: &[&str]) -> Result<(), RuntimeError> {
    let mut args = vec!["compose", "stop"];
    args.extend_from_slice(services);
    self.run(&args).await.map(|_| ())
  }

  async fn exec(&self, service: &str, script: &str) -> Result<String, RuntimeError> {
    self.run(&["compose", "exec", "-T", service, "sh", "-c", script]).await
  }

  async fn copy_from(&self, service: &str, src: &str, dest: &Path) -> Result<(), RuntimeError> {
    let from = format!("{service}:{src}");
    let to = dest.to_string_lossy();
    self.run(&["compose", "cp", &from, &to]).await.map(|_| ())
  }

  async fn health(&self, container: &str) -> Result<Option<HealthStatus>, RuntimeError> {
    match self.run(&["inspect", "--format", HEALTH_TEMPLATE, container]).await {
      Ok(raw) => HealthStatus::parse(&raw)
        .map(Some)
        .ok_or_else(|| RuntimeError::UnknownHealth {
          container: container.to_string(),
          status: raw,
        }),
      Err(RuntimeError::CommandFailed { ref stderr, .. }) if stderr.contains("No such") => Ok(None),
      Err(e) => Err(e),
    }
  }

  async fn versions(&self) -> RuntimeVersions {
    let docker = self.run(&["version", "--format", "{{.Server.Version}}"]).await.ok();
    let compose = self.run(&["compose", "version", "--short"]).await.ok();
    RuntimeVersions { docker, compose }
  }
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;
  use std::os::unix::fs::PermissionsExt;
  use tempfile::TempDir;

  /// Install a stand-in `docker` that logs its arguments and answers a few
  /// queries.
  fn fake_docker(dir: &Path) -> String {
    let script = dir.join("docker");
    let body = r#"#!/bin/sh
echo "$@" >> "$(dirname "$0")/calls.log"
case "$1" in
  inspect)
    case "$4" in
      db) echo healthy ;;
      kwkhtmltopdf) echo running ;;
      *) echo "Error: No such object: $4" >&2; exit 1 ;;
    esac ;;
  version) echo 27.1.0 ;;
esac
if [ "$1 $2" = "compose version" ]; then echo 2.29.1; fi
if [ "$1 $2" = "compose exec" ]; then
  if [ "$7" = "exit 3" ]; then echo boom >&2; exit 3; fi
  echo " out "
fi
"#;
    std::fs::write(&script, body).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script.to_string_lossy().into_owned()
  }

  fn calls(dir: &Path) -> String {
    std::fs::read_to_string(dir.join("calls.log")).unwrap_or_default()
  }

  #[tokio::test]
  async fn up_and_stop_pass_service_names() {
    let temp = TempDir::new().unwrap();
    let docker = DockerCompose::new(fake_docker(temp.path()), temp.path());

    docker.up(&["db"]).await.unwrap();
    docker.stop(&["live", "pre"]).await.unwrap();
    docker.up(&[]).await.unwrap();

    assert_eq!(calls(temp.path()), "compose up -d db\ncompose stop live pre\ncompose up -d\n");
  }

  #[tokio::test]
  async fn exec_returns_trimmed_stdout() {
    let temp = TempDir::new().unwrap();
    let docker = DockerCompose::new(fake_docker(temp.path()), temp.path());

    assert_eq!(docker.exec("db", "true").await.unwrap(), "out");
  }

  #[tokio::test]
  async fn exec_failure_carries_code_and_stderr() {
    let temp = TempDir::new().unwrap();
    let docker = DockerCompose::new(fake_docker(temp.path()), temp.path());

    let err = docker.exec("db", "exit 3").await.unwrap_err();
    match err {
      RuntimeError::CommandFailed { code, stderr, .. } => {
        assert_eq!(code, Some(3));
        assert_eq!(stderr, "boom");
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[tokio::test]
  async fn health_maps_missing_container_to_none() {
    let temp = TempDir::new().unwrap();
    let docker = DockerCompose::new(fake_docker(temp.path()), temp.path());

    assert_eq!(docker.health("db").await.unwrap(), Some(HealthStatus::Healthy));
    assert_eq!(docker.health("kwkhtmltopdf").await.unwrap(), Some(HealthStatus::Running));
    assert_eq!(docker.health("ghost").await.unwrap(), None);
  }

  #[tokio::test]
  async fn versions_report_both_components() {
    let temp = TempDir::new().unwrap();
    let docker = DockerCompose::new(fake_docker(temp.path()), temp.path());

    let versions = docker.versions().await;
    assert_eq!(versions.docker.as_deref(), Some("27.1.0"));
    assert_eq!(versions.compose.as_deref(), Some("2.29.1"));
    assert!(versions.is_available());
  }

  #[tokio::test]
  async fn missing_binary_is_a_spawn_error() {
    let temp = TempDir::new().unwrap();
    let docker = DockerCompose::new(temp.path().join("nope").to_string_lossy(), temp.path());

    assert!(matches!(docker.up(&[]).await, Err(RuntimeError::Spawn { .. })));
    assert!(!docker.versions().await.is_available());
  }
}
