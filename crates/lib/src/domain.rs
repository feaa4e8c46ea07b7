//! Domain checks and the domain change operation.
//!
//! A domain is configured when it is a syntactically valid host name and, in
//! production mode, both `<domain>` and `test.<domain>` resolve to this host's
//! outbound IPv4 address.

use std::io;
use std::net::{IpAddr, Ipv4Addr};

use tokio::net::{UdpSocket, lookup_host};
use tracing::{debug, info, warn};

use crate::compose::TextDiff;
use crate::consts::keys;
use crate::error::{Error, Result};
use crate::generate::{GenerateOptions, generate};
use crate::guard::require_initialized;
use crate::workspace::Workspace;

/// Address used to pick the outbound interface. Nothing is sent to it.
const PROBE_ADDR: (Ipv4Addr, u16) = (Ipv4Addr::new(10, 254, 254, 254), 1);

fn valid_label(label: &str) -> bool {
  let bytes = label.as_bytes();
  match (bytes.first(), bytes.last()) {
    (Some(first), Some(last)) => {
      first.is_ascii_alphanumeric()
        && last.is_ascii_alphanumeric()
        && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
    }
    _ => false,
  }
}

/// RFC 1123 host name syntax: dot-separated labels of letters, digits and
/// inner hyphens.
pub fn is_valid_hostname(domain: &str) -> bool {
  !domain.is_empty() && domain.split('.').all(valid_label)
}

/// IPv4 address of the interface that routes outbound traffic.
pub async fn local_ip() -> io::Result<Ipv4Addr> {
  let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
  socket.connect(PROBE_ADDR).await?;
  match socket.local_addr()?.ip() {
    IpAddr::V4(ip) => Ok(ip),
    IpAddr::V6(ip) => Err(io::Error::other(format!("unexpected IPv6 local address {ip}"))),
  }
}

async fn resolves_to(host: &str, ip: Ipv4Addr) -> bool {
  match lookup_host((host, 0)).await {
    Ok(addrs) => {
      let found: Vec<IpAddr> = addrs.map(|a| a.ip()).collect();
      debug!(host = %host, addresses = ?found, "resolved host");
      found.contains(&IpAddr::V4(ip))
    }
    Err(e) => {
      debug!(host = %host, error = %e, "lookup failed");
      false
    }
  }
}

/// `true` when the domain is correctly configured for this host. Lookup
/// failures count as not configured.
pub async fn domain_configured(domain: &str, dev: bool) -> bool {
  if !is_valid_hostname(domain) {
    return false;
  }
  if dev {
    return true;
  }
  let ip = match local_ip().await {
    Ok(ip) => ip,
    Err(e) => {
      warn!(error = %e, "could not determine local IP address");
      return false;
    }
  };
  resolves_to(domain, ip).await && resolves_to(&format!("test.{domain}"), ip).await
}

/// Fail with [`Error::DomainNotConfigured`] unless the check passes or is
/// disabled.
pub async fn check_domain(domain: &str, dev: bool, disabled: bool) -> Result<()> {
  if disabled {
    debug!(domain = %domain, "domain check disabled");
    return Ok(());
  }
  if !domain_configured(domain, dev).await {
    return Err(Error::DomainNotConfigured(domain.to_string()));
  }
  Ok(())
}

/// Point every environment at a new base domain and regenerate the manifest.
pub async fn change_domain(ws: &mut Workspace, domain: &str, skip_check: bool) -> Result<TextDiff> {
  require_initialized(ws)?;
  check_domain(domain, ws.is_dev(), skip_check).await?;

  ws.env.update(keys::DOMAIN, domain)?;
  ws.env.save()?;
  info!(domain = %domain, "domain changed");

  let outcome = generate(ws, &GenerateOptions::default())?;
  Ok(outcome.diff)
}
