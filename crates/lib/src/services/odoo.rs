//! Application instance descriptor.
//!
//! Every instance gets two routers on the proxy: the primary HTTP router on
//! `Host(domain)` and a websocket router on `Path(/websocket) && Host(domain)`
//! with a higher priority so the more specific match wins.

use std::collections::BTreeMap;

use super::{ServiceDescriptor, entrypoint};
use crate::consts::{
  CERT_RESOLVER, DB_SERVICE, IMAGE_ODOO, MODULE_MODE_MOUNTED, ODOO_HTTP_PORT, ODOO_WEBSOCKET_PORT, PDF_SERVICE,
  PROXY_SERVICE,
};

pub const HTTP_PRIORITY: u32 = 1;
pub const WEBSOCKET_PRIORITY: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OdooParams<'a> {
  pub name: &'a str,
  pub domain: &'a str,
  /// Usually a `${..._DB_PASSWORD}` placeholder expanded by compose.
  pub db_password: &'a str,
  pub admin_password: &'a str,
  pub version: &'a str,
  /// Only the production instance runs without basic auth.
  pub require_basic_auth: bool,
  pub use_tls: bool,
  /// `mounted` bind-mounts the instance sources from the host.
  pub module_mode: &'a str,
}

pub fn odoo_service(params: &OdooParams<'_>) -> ServiceDescriptor {
  let name = params.name;
  let domain = params.domain;
  let ws = format!("{name}-websocket");
  let entrypoints = entrypoint(params.use_tls);

  let environment = BTreeMap::from([
    ("DB_NAME".to_string(), name.to_string()),
    ("DB_USER".to_string(), name.to_string()),
    ("DB_PASSWORD".to_string(), params.db_password.to_string()),
    ("DB_HOST".to_string(), DB_SERVICE.to_string()),
    ("ADMIN_PASSWD".to_string(), params.admin_password.to_string()),
    (
      "ADDONS_PATH".to_string(),
      "/odoo/src/odoo/addons, /odoo/src/enterprise".to_string(),
    ),
  ]);

  let mut labels = BTreeMap::from([
    ("traefik.enable".to_string(), "true".to_string()),
    (format!("traefik.http.routers.{name}.rule"), format!("Host(`{domain}`)")),
    (format!("traefik.http.routers.{name}.service"), name.to_string()),
    (format!("traefik.http.routers.{name}.priority"), HTTP_PRIORITY.to_string()),
    (format!("traefik.http.routers.{name}.entrypoints"), entrypoints.to_string()),
    (
      format!("traefik.http.services.{name}.loadbalancer.server.port"),
      ODOO_HTTP_PORT.to_string(),
    ),
    (
      format!("traefik.http.routers.{ws}.rule"),
      format!("Path(`/websocket`) && Host(`{domain}`)"),
    ),
    (format!("traefik.http.routers.{ws}.priority"), WEBSOCKET_PRIORITY.to_string()),
    (format!("traefik.http.routers.{ws}.service"), ws.clone()),
    (format!("traefik.http.routers.{ws}.entrypoints"), entrypoints.to_string()),
    (
      format!("traefik.http.services.{ws}.loadbalancer.server.port"),
      ODOO_WEBSOCKET_PORT.to_string(),
    ),
  ]);

  if params.use_tls {
    labels.insert(
      format!("traefik.http.routers.{name}.tls.certresolver"),
      CERT_RESOLVER.to_string(),
    );
    labels.insert(
      format!("traefik.http.routers.{ws}.tls.certresolver"),
      CERT_RESOLVER.to_string(),
    );
  }

  let (http_middlewares, ws_middlewares) = if params.require_basic_auth {
    ("basic_auth@file,gzip@file", "basic_auth@file,websocketHeader@file,gzip@file")
  } else {
    ("gzip@file", "websocketHeader@file,gzip@file")
  };
  labels.insert(
    format!("traefik.http.routers.{name}.middlewares"),
    http_middlewares.to_string(),
  );
  labels.insert(format!("traefik.http.routers.{ws}.middlewares"), ws_middlewares.to_string());

  let mut volumes = vec![format!("./volumes/{name}:/data/odoo/")];
  if params.module_mode == MODULE_MODE_MOUNTED {
    volumes.push(format!("./volumes/{name}/src:/odoo/src/"));
  }

  let mut service = ServiceDescriptor::new(name, format!("{IMAGE_ODOO}:{}", params.version));
  service.restart = Some("always".to_string());
  service.environment = Some(environment);
  service.labels = Some(labels);
  service.volumes = Some(volumes);
  service.depends_on = Some(vec![
    DB_SERVICE.to_string(),
    PROXY_SERVICE.to_string(),
    PDF_SERVICE.to_string(),
  ]);
  service
}
