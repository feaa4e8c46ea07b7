//! Flat `KEY=VALUE` env file.
//!
//! Holds the secrets and run-state flags shared with the container
//! orchestrator. Keys are stored uppercase; values are plain strings with no
//! quoting or escaping.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum EnvError {
  #[error("the key \"{0}\" is missing in the env file")]
  KeyNotFound(String),

  #[error("the key \"{0}\" already exists in the env file")]
  KeyExists(String),

  #[error("malformed line {line} in {}: expected KEY=VALUE", path.display())]
  Parse { path: PathBuf, line: usize },

  #[error("failed to read {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("failed to write {}: {source}", path.display())]
  Write { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone)]
pub struct EnvFile {
  path: PathBuf,
  entries: IndexMap<String, String>,
  initialized: bool,
}

impl EnvFile {
  /// Load the env file, or start empty when it does not exist.
  pub fn load(path: impl Into<PathBuf>) -> Result<Self, EnvError> {
    let path = path.into();

    let content = match fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "env file absent, starting empty");
        return Ok(Self {
          path,
          entries: IndexMap::new(),
          initialized: false,
        });
      }
      Err(source) => return Err(EnvError::Read { path, source }),
    };

    let mut entries = IndexMap::new();
    for (idx, line) in content.lines().enumerate() {
      let line = line.trim();
      if line.is_empty() {
        continue;
      }
      let Some((key, value)) = line.split_once('=') else {
        return Err(EnvError::Parse { path, line: idx + 1 });
      };
      entries.insert(key.trim().to_uppercase(), value.to_string());
    }

    Ok(Self {
      path,
      entries,
      initialized: true,
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// True iff the backing file existed at load time or has been saved since.
  pub fn is_initialized(&self) -> bool {
    self.initialized
  }

  pub fn read(&self, key: &str) -> Result<&str, EnvError> {
    let key = key.to_uppercase();
    self
      .entries
      .get(&key)
      .map(String::as_str)
      .ok_or(EnvError::KeyNotFound(key))
  }

  /// Read a key, returning `default` instead of failing when it is absent.
  pub fn read_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
    self.entries.get(&key.to_uppercase()).map(String::as_str).unwrap_or(default)
  }

  pub fn contains(&self, key: &str) -> bool {
    self.entries.contains_key(&key.to_uppercase())
  }

  pub fn add(&mut self, key: &str, value: impl Into<String>) -> Result<(), EnvError> {
    let key = key.to_uppercase();
    if self.entries.contains_key(&key) {
      return Err(EnvError::KeyExists(key));
    }
    self.entries.insert(key, value.into());
    Ok(())
  }

  pub fn update(&mut self, key: &str, value: impl Into<String>) -> Result<(), EnvError> {
    let key = key.to_uppercase();
    match self.entries.get_mut(&key) {
      Some(slot) => {
        *slot = value.into();
        Ok(())
      }
      None => Err(EnvError::KeyNotFound(key)),
    }
  }

  /// Add when absent, update in place when present.
  pub fn set(&mut self, key: &str, value: impl Into<String>) {
    self.entries.insert(key.to_uppercase(), value.into());
  }

  pub fn remove(&mut self, key: &str) -> Result<String, EnvError> {
    let key = key.to_uppercase();
    self.entries.shift_remove(&key).ok_or(EnvError::KeyNotFound(key))
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// Render one `KEY=VALUE` line per entry in current order.
  pub fn render(&self) -> String {
    self.entries.iter().map(|(k, v)| format!("{k}={v}\n")).collect()
  }

  /// Rewrite the whole file.
  pub fn save(&mut self) -> Result<(), EnvError> {
    fs::write(&self.path, self.render()).map_err(|source| EnvError::Write {
      path: self.path.clone(),
      source,
    })?;
    self.initialized = true;
    debug!(path = %self.path.display(), entries = self.entries.len(), "env file saved");
    Ok(())
  }
}
