//! Reverse proxy (traefik) descriptor.

use std::collections::BTreeMap;

use super::{Healthcheck, ServiceDescriptor, entrypoint};
use crate::consts::{ACME_EMAIL, CERT_RESOLVER, IMAGE_TRAEFIK};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyParams<'a> {
  pub name: &'a str,
  pub domain: &'a str,
  /// Expose the proxy API under `proxy.<domain>`, behind basic auth.
  pub enable_dashboard: bool,
  /// Serve on 443 with ACME certificates. Off in dev mode.
  pub use_tls: bool,
}

pub fn proxy_service(params: &ProxyParams<'_>) -> ServiceDescriptor {
  let ProxyParams {
    name,
    domain,
    enable_dashboard,
    use_tls,
  } = *params;

  let mut command = vec![
    "--providers.docker=true".to_string(),
    "--providers.docker.exposedbydefault=false".to_string(),
    "--providers.file.directory=/etc/traefik".to_string(),
    "--entrypoints.web.address=:80".to_string(),
    "--ping".to_string(),
  ];
  let mut ports = vec!["80:80".to_string()];
  let mut volumes = vec!["/var/run/docker.sock:/var/run/docker.sock".to_string()];

  if use_tls {
    command.extend([
      "--entrypoints.websecure.address=:443".to_string(),
      format!("--certificatesresolvers.{CERT_RESOLVER}.acme.tlschallenge=true"),
      format!("--certificatesresolvers.{CERT_RESOLVER}.acme.email={ACME_EMAIL}"),
      format!("--certificatesresolvers.{CERT_RESOLVER}.acme.storage=/letsencrypt/acme.json"),
      "--entrypoints.web.http.redirections.entrypoint.to=websecure".to_string(),
      "--entrypoints.web.http.redirections.entrypoint.scheme=https".to_string(),
    ]);
    ports.push("443:443".to_string());
    volumes.push(format!("./volumes/{name}/letsencrypt:/letsencrypt"));
  }

  let labels = enable_dashboard.then(|| {
    command.push("--api.dashboard=true".to_string());

    let mut labels = BTreeMap::from([
      ("traefik.enable".to_string(), "true".to_string()),
      (
        "traefik.http.routers.proxy.rule".to_string(),
        format!("Host(`proxy.{domain}`)"),
      ),
      (
        "traefik.http.routers.proxy.entrypoints".to_string(),
        entrypoint(use_tls).to_string(),
      ),
      ("traefik.http.routers.proxy.service".to_string(), "api@internal".to_string()),
      (
        "traefik.http.routers.proxy.middlewares".to_string(),
        "basic_auth@file".to_string(),
      ),
    ]);
    if use_tls {
      labels.insert(
        "traefik.http.routers.proxy.tls.certresolver".to_string(),
        CERT_RESOLVER.to_string(),
      );
    }
    labels
  });

  let mut service = ServiceDescriptor::new(name, IMAGE_TRAEFIK);
  service.restart = Some("always".to_string());
  service.command = Some(command);
  service.labels = labels;
  service.ports = Some(ports);
  service.volumes = Some(volumes);
  service.healthcheck = Some(Healthcheck {
    test: "traefik healthcheck --ping".to_string(),
    interval: "5s".to_string(),
    timeout: "5s".to_string(),
    retries: 30,
  });
  service
}
