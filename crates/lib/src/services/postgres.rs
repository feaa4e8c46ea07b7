use std::collections::BTreeMap;

use super::{Healthcheck, ServiceDescriptor};
use crate::consts::{IMAGE_POSTGRES, POSTGRES_DB, POSTGRES_PORT, POSTGRES_USER, keys};

/// Database server descriptor.
///
/// The port is bound to loopback only and the master password is left as a
/// placeholder for compose to expand at start time.
pub fn postgres_service(name: &str) -> ServiceDescriptor {
  let mut service = ServiceDescriptor::new(name, IMAGE_POSTGRES);
  service.restart = Some("always".to_string());
  service.ports = Some(vec![format!("127.0.0.1:{POSTGRES_PORT}:{POSTGRES_PORT}")]);
  service.environment = Some(BTreeMap::from([
    ("POSTGRES_DB".to_string(), POSTGRES_DB.to_string()),
    (
      "POSTGRES_PASSWORD".to_string(),
      format!("${{{}}}", keys::MASTER_DB_PASSWORD),
    ),
    ("POSTGRES_USER".to_string(), POSTGRES_USER.to_string()),
  ]));
  service.healthcheck = Some(Healthcheck {
    test: format!("pg_isready -U {POSTGRES_USER}"),
    interval: "5s".to_string(),
    timeout: "5s".to_string(),
    retries: 5,
  });
  service.volumes = Some(vec![format!("./volumes/{name}:/var/lib/postgresql/data")]);
  service
}
