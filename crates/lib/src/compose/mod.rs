//! The compose manifest.
//!
//! [`ComposeFile`] is read fully into memory, mutated only through the
//! add/update/upsert/remove operations (which enforce service existence and
//! naming), and written back in full by [`ComposeFile::save`]. A snapshot of
//! the document as loaded is kept for [`ComposeFile::diff`] previews.

pub mod diff;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::consts::{COMPOSE_SCHEMA_VERSION, DEV_SERVICE_PREFIX};
use crate::services::ServiceDescriptor;

pub use diff::{DiffLine, LineChange, TextDiff};

const VERSION_KEY: &str = "version";
const SERVICES_KEY: &str = "services";

#[derive(Debug, Error)]
pub enum ComposeError {
  #[error("service {0} already exists")]
  AlreadyExists(String),

  #[error("service {0} does not exist")]
  NotFound(String),

  #[error("invalid service name: {0:?}")]
  InvalidName(String),

  #[error("failed to parse {}: {source}", path.display())]
  Parse { path: PathBuf, source: serde_yaml::Error },

  #[error("malformed compose file {}: {reason}", path.display())]
  Malformed { path: PathBuf, reason: String },

  #[error("failed to serialize compose file: {0}")]
  Serialize(#[source] serde_yaml::Error),

  #[error("failed to read {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("failed to write {}: {source}", path.display())]
  Write { path: PathBuf, source: io::Error },
}

/// Check a service name against compose's naming rules and, for the dynamic
/// environments, against the `odoo_dev_pr<N>` convention.
pub fn validate_service_name(name: &str) -> Result<(), ComposeError> {
  let charset_ok = !name.is_empty()
    && name
      .chars()
      .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-' || c == '.')
    && name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());

  let role_ok = match name.strip_prefix("odoo_dev") {
    Some(_) => name
      .strip_prefix(DEV_SERVICE_PREFIX)
      .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit())),
    None => true,
  };

  if charset_ok && role_ok {
    Ok(())
  } else {
    Err(ComposeError::InvalidName(name.to_string()))
  }
}

/// Header of a manifest with no content yet.
fn default_header() -> Mapping {
  let mut header = Mapping::new();
  header.insert(VERSION_KEY.into(), COMPOSE_SCHEMA_VERSION.into());
  header.insert(SERVICES_KEY.into(), Value::Null);
  header
}

#[derive(Debug, Clone)]
pub struct ComposeFile {
  path: PathBuf,
  /// Top-level keys in file order; the `services` entry is a placeholder.
  header: Mapping,
  services: Mapping,
  /// Document as loaded. Never mutated.
  source: Mapping,
  initialized: bool,
}

impl ComposeFile {
  /// Load the manifest, or start from an empty document when the file does
  /// not exist.
  pub fn load(path: impl Into<PathBuf>) -> Result<Self, ComposeError> {
    let path = path.into();

    let content = match fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "compose file absent, starting empty");
        let file = Self {
          path,
          header: default_header(),
          services: Mapping::new(),
          source: Mapping::new(),
          initialized: false,
        };
        return Ok(Self {
          source: file.document(),
          ..file
        });
      }
      Err(source) => return Err(ComposeError::Read { path, source }),
    };

    let document: Value = serde_yaml::from_str(&content).map_err(|source| ComposeError::Parse {
      path: path.clone(),
      source,
    })?;

    let mut header = match document {
      Value::Mapping(map) => map,
      Value::Null => default_header(),
      _ => {
        return Err(ComposeError::Malformed {
          path,
          reason: "top level is not a mapping".to_string(),
        });
      }
    };

    // `services` keeps its slot in `header` as a placeholder so the key order
    // of the file survives a save.
    let services = match header.get_mut(SERVICES_KEY).map(std::mem::take) {
      Some(Value::Mapping(services)) => services,
      Some(Value::Null) => Mapping::new(),
      None => {
        header.insert(SERVICES_KEY.into(), Value::Null);
        Mapping::new()
      }
      Some(_) => {
        return Err(ComposeError::Malformed {
          path,
          reason: "`services` is not a mapping".to_string(),
        });
      }
    };

    for key in services.keys() {
      match key.as_str() {
        Some(name) if validate_service_name(name).is_ok() => {}
        _ => {
          return Err(ComposeError::Malformed {
            path,
            reason: format!("invalid service name {key:?}"),
          });
        }
      }
    }

    let file = Self {
      path,
      header,
      services,
      source: Mapping::new(),
      initialized: true,
    };
    Ok(Self {
      source: file.document(),
      ..file
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// True iff the file existed at load time or has been saved since.
  pub fn is_initialized(&self) -> bool {
    self.initialized
  }

  pub fn contains(&self, name: &str) -> bool {
    self.services.contains_key(name)
  }

  pub fn service(&self, name: &str) -> Option<&Value> {
    self.services.get(name)
  }

  /// Service names in manifest order.
  pub fn service_names(&self) -> impl Iterator<Item = &str> {
    self.services.keys().filter_map(Value::as_str)
  }

  pub fn add_service(&mut self, descriptor: &ServiceDescriptor) -> Result<(), ComposeError> {
    let name = descriptor.name();
    validate_service_name(name)?;
    if self.contains(name) {
      return Err(ComposeError::AlreadyExists(name.to_string()));
    }
    self.services.insert(name.into(), descriptor.to_value());
    debug!(service = %name, "service added");
    Ok(())
  }

  /// Replace an existing service in place, keeping its position.
  pub fn update_service(&mut self, descriptor: &ServiceDescriptor) -> Result<(), ComposeError> {
    let name = descriptor.name();
    validate_service_name(name)?;
    match self.services.get_mut(name) {
      Some(slot) => {
        *slot = descriptor.to_value();
        debug!(service = %name, "service updated");
        Ok(())
      }
      None => Err(ComposeError::NotFound(name.to_string())),
    }
  }

  pub fn upsert_service(&mut self, descriptor: &ServiceDescriptor) -> Result<(), ComposeError> {
    if self.contains(descriptor.name()) {
      self.update_service(descriptor)
    } else {
      self.add_service(descriptor)
    }
  }

  pub fn remove_service(&mut self, name: &str) -> Result<Value, ComposeError> {
    let removed = self
      .services
      .shift_remove(name)
      .ok_or_else(|| ComposeError::NotFound(name.to_string()))?;
    debug!(service = %name, "service removed");
    Ok(removed)
  }

  fn document(&self) -> Mapping {
    let mut document = self.header.clone();
    document.insert(SERVICES_KEY.into(), Value::Mapping(self.services.clone()));
    document
  }

  /// Serialize the in-memory document.
  pub fn render(&self) -> Result<String, ComposeError> {
    serde_yaml::to_string(&self.document()).map_err(ComposeError::Serialize)
  }

  /// Diff between the document as loaded and the in-memory document.
  pub fn diff(&self) -> Result<TextDiff, ComposeError> {
    let before = serde_yaml::to_string(&self.source).map_err(ComposeError::Serialize)?;
    Ok(TextDiff::compute(&before, &self.render()?))
  }

  /// Write the whole document.
  ///
  /// Content goes to a temporary file in the same directory which is then
  /// renamed over the target, so readers never see a partial file.
  pub fn save(&mut self) -> Result<(), ComposeError> {
    let content = self.render()?;
    let dir = match self.path.parent() {
      Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
      _ => PathBuf::from("."),
    };
    let write_err = |source| ComposeError::Write {
      path: self.path.clone(),
      source,
    };

    let mut temp = NamedTempFile::new_in(&dir).map_err(write_err)?;
    temp.write_all(content.as_bytes()).map_err(write_err)?;
    temp.persist(&self.path).map_err(|e| write_err(e.error))?;

    self.initialized = true;
    debug!(path = %self.path.display(), services = self.services.len(), "compose file saved");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn empty_compose() -> (TempDir, ComposeFile) {
    let temp = TempDir::new().unwrap();
    let compose = ComposeFile::load(temp.path().join("docker-compose.yml")).unwrap();
    (temp, compose)
  }

  fn descriptor(name: &str, image: &str) -> ServiceDescriptor {
    ServiceDescriptor::new(name, image)
  }

  #[test]
  fn load_missing_file_gives_empty_default() {
    let (_temp, compose) = empty_compose();
    assert!(!compose.is_initialized());
    assert_eq!(compose.service_names().count(), 0);
    assert_eq!(compose.render().unwrap(), "version: '3.8'\nservices: {}\n");
  }

  #[test]
  fn load_empty_file_gets_default_header() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("docker-compose.yml");
    fs::write(&path, "").unwrap();

    let compose = ComposeFile::load(&path).unwrap();
    assert!(compose.is_initialized());
    assert_eq!(compose.service_names().count(), 0);
    assert_eq!(compose.render().unwrap(), "version: '3.8'\nservices: {}\n");
  }

  #[test]
  fn load_rejects_malformed_yaml() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("docker-compose.yml");
    fs::write(&path, "services: [unclosed\n").unwrap();
    assert!(matches!(ComposeFile::load(&path), Err(ComposeError::Parse { .. })));

    fs::write(&path, "services:\n  - a\n").unwrap();
    assert!(matches!(ComposeFile::load(&path), Err(ComposeError::Malformed { .. })));
  }

  #[test]
  fn add_twice_fails_and_leaves_manifest_unchanged() {
    let (_temp, mut compose) = empty_compose();
    compose.add_service(&descriptor("pre", "a")).unwrap();
    let before = compose.render().unwrap();

    let err = compose.add_service(&descriptor("pre", "b")).unwrap_err();

    assert!(matches!(err, ComposeError::AlreadyExists(name) if name == "pre"));
    assert_eq!(compose.render().unwrap(), before);
  }

  #[test]
  fn update_and_remove_missing_fail_without_change() {
    let (_temp, mut compose) = empty_compose();
    compose.add_service(&descriptor("live", "a")).unwrap();
    let before = compose.render().unwrap();

    assert!(matches!(
      compose.update_service(&descriptor("pre", "a")),
      Err(ComposeError::NotFound(_))
    ));
    assert!(matches!(compose.remove_service("pre"), Err(ComposeError::NotFound(_))));
    assert_eq!(compose.render().unwrap(), before);
  }

  #[test]
  fn update_keeps_insertion_position() {
    let (_temp, mut compose) = empty_compose();
    for name in ["proxy", "live", "db"] {
      compose.add_service(&descriptor(name, "old")).unwrap();
    }

    compose.update_service(&descriptor("live", "new")).unwrap();

    assert_eq!(compose.service_names().collect::<Vec<_>>(), vec!["proxy", "live", "db"]);
    assert_eq!(compose.service("live").unwrap()["image"], Value::from("new"));
  }

  #[test]
  fn upsert_is_idempotent() {
    let (_temp, mut compose) = empty_compose();
    let service = descriptor("pre", "a");

    compose.upsert_service(&service).unwrap();
    let once = compose.render().unwrap();
    compose.upsert_service(&service).unwrap();

    assert_eq!(compose.render().unwrap(), once);
  }

  #[test]
  fn invalid_names_are_rejected() {
    let (_temp, mut compose) = empty_compose();
    for name in ["", "Pre", "odoo_dev_prx", "odoo_dev_pr", "odoo_dev_12", "-live"] {
      assert!(
        matches!(compose.add_service(&descriptor(name, "a")), Err(ComposeError::InvalidName(_))),
        "{name:?} should be rejected"
      );
    }
    compose.add_service(&descriptor("odoo_dev_pr12", "a")).unwrap();
  }

  #[test]
  fn save_then_load_round_trips() {
    let (temp, mut compose) = empty_compose();
    compose.add_service(&crate::services::postgres_service("db")).unwrap();
    compose.add_service(&crate::services::pdf_service("kwkhtmltopdf")).unwrap();
    compose.save().unwrap();
    assert!(compose.is_initialized());

    let reloaded = ComposeFile::load(temp.path().join("docker-compose.yml")).unwrap();

    assert!(reloaded.is_initialized());
    assert_eq!(
      reloaded.service_names().collect::<Vec<_>>(),
      compose.service_names().collect::<Vec<_>>()
    );
    assert_eq!(reloaded.service("db"), compose.service("db"));
    assert_eq!(reloaded.render().unwrap(), compose.render().unwrap());
    assert!(!reloaded.diff().unwrap().has_changes());
  }

  #[test]
  fn load_keeps_unknown_top_level_keys() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("docker-compose.yml");
    fs::write(&path, "version: '3.8'\nnetworks:\n  default: {}\nservices:\n  db:\n    image: x\n").unwrap();

    let compose = ComposeFile::load(&path).unwrap();

    let rendered = compose.render().unwrap();
    assert!(rendered.contains("networks:"));
    assert!(compose.contains("db"));
  }

  #[test]
  fn diff_reflects_pending_changes_only() {
    let (temp, mut compose) = empty_compose();
    compose.add_service(&descriptor("db", "a")).unwrap();
    compose.save().unwrap();

    let mut compose = ComposeFile::load(temp.path().join("docker-compose.yml")).unwrap();
    assert!(!compose.diff().unwrap().has_changes());

    compose.update_service(&descriptor("db", "b")).unwrap();
    let diff = compose.diff().unwrap();
    assert!(diff.has_changes());
    assert!(diff.render(false).contains("-     image: a"));
    assert!(diff.render(false).contains("+     image: b"));
  }
}
