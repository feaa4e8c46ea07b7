//! Service descriptors for the compose manifest.
//!
//! A [`ServiceDescriptor`] is the typed, in-memory form of one compose service.
//! The builders in this module synthesize the descriptor of each service role
//! from explicit parameters:
//!
//! - [`proxy`] - the reverse proxy routing traffic by container labels
//! - [`odoo`] - an application instance (`live`, `pre`, per-PR environments)
//! - [`postgres`] - the shared database server
//! - [`pdf`] - the document-render helper
//!
//! Builders are pure: identical arguments give identical descriptors.

pub mod odoo;
pub mod pdf;
pub mod postgres;
pub mod proxy;

use std::collections::BTreeMap;

use serde::Serialize;

pub use odoo::{OdooParams, odoo_service};
pub use pdf::pdf_service;
pub use postgres::postgres_service;
pub use proxy::{ProxyParams, proxy_service};

/// Container health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Healthcheck {
  pub test: String,
  pub interval: String,
  pub timeout: String,
  pub retries: u32,
}

/// Desired configuration of one compose service.
///
/// Absent fields are dropped on serialization and `container_name` always
/// mirrors the service name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDescriptor {
  #[serde(skip)]
  name: String,
  pub image: String,
  container_name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub restart: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub command: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub environment: Option<BTreeMap<String, String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub labels: Option<BTreeMap<String, String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ports: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub volumes: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub depends_on: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub healthcheck: Option<Healthcheck>,
}

impl ServiceDescriptor {
  pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
    let name = name.into();
    Self {
      container_name: name.clone(),
      name,
      image: image.into(),
      restart: None,
      command: None,
      environment: None,
      labels: None,
      ports: None,
      volumes: None,
      depends_on: None,
      healthcheck: None,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn container_name(&self) -> &str {
    &self.container_name
  }

  /// Serialized manifest entry.
  pub fn to_value(&self) -> serde_yaml::Value {
    // Only strings, lists and string maps: serialization cannot fail.
    serde_yaml::to_value(self).unwrap_or(serde_yaml::Value::Null)
  }
}

/// Entry point value for routers: TLS-only `websecure` or plain `web`.
pub(crate) fn entrypoint(use_tls: bool) -> &'static str {
  if use_tls { "websecure" } else { "web" }
}
