//! Named application instances.
//!
//! An environment is identified by its manifest key, which is also the name of
//! its database and its database role.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::consts::{DEV_SERVICE_PREFIX, LIVE_SERVICE, PRE_SERVICE};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown environment: {0:?}")]
pub struct UnknownEnvironment(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
  /// Production. Never dropped, refreshed or removed.
  Live,
  Pre,
  /// Per-pull-request environment.
  Dev(u32),
}

impl Environment {
  /// Parse a pull request argument such as `12` or `pr12`.
  pub fn from_pr(arg: &str) -> Result<Self, UnknownEnvironment> {
    let trimmed = arg.trim();
    let digits = trimmed
      .strip_prefix("pr")
      .or_else(|| trimmed.strip_prefix("PR"))
      .unwrap_or(trimmed);
    digits
      .parse()
      .map(Environment::Dev)
      .map_err(|_| UnknownEnvironment(arg.to_string()))
  }

  pub fn service_name(&self) -> String {
    match self {
      Environment::Live => LIVE_SERVICE.to_string(),
      Environment::Pre => PRE_SERVICE.to_string(),
      Environment::Dev(pr) => format!("{DEV_SERVICE_PREFIX}{pr}"),
    }
  }

  /// Database name and role name.
  pub fn database(&self) -> String {
    self.service_name()
  }

  pub fn is_protected(&self) -> bool {
    matches!(self, Environment::Live)
  }

  pub fn is_dev(&self) -> bool {
    matches!(self, Environment::Dev(_))
  }

  /// Public host name under the base domain.
  pub fn domain(&self, base: &str) -> String {
    match self {
      Environment::Live => base.to_string(),
      Environment::Pre => format!("pre.{base}"),
      Environment::Dev(pr) => format!("pr{pr}.{base}"),
    }
  }

  /// Env file key holding the database role password.
  pub fn password_key(&self) -> String {
    format!("{}_DB_PASSWORD", self.service_name().to_uppercase())
  }

  /// Reference to the password that compose expands at start time.
  pub fn password_placeholder(&self) -> String {
    format!("${{{}}}", self.password_key())
  }
}

impl FromStr for Environment {
  type Err = UnknownEnvironment;

  /// Case-insensitive: `LIVE`, `Live` and ` live ` all name production.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let name = s.trim().to_ascii_lowercase();
    match name.as_str() {
      LIVE_SERVICE => Ok(Environment::Live),
      PRE_SERVICE => Ok(Environment::Pre),
      _ => name
        .strip_prefix(DEV_SERVICE_PREFIX)
        .filter(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        .and_then(|n| n.parse().ok())
        .map(Environment::Dev)
        .ok_or_else(|| UnknownEnvironment(s.to_string())),
    }
  }
}

impl fmt::Display for Environment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.service_name())
  }
}
