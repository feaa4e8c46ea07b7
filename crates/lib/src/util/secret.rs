//! Random secrets and identifiers.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;

use crate::consts::PASSWORD_BYTES;

/// URL-safe token built from [`PASSWORD_BYTES`] bytes of OS randomness.
pub fn generate_password() -> String {
  let mut bytes = [0u8; PASSWORD_BYTES];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}

/// Fresh random identifier, used for dump file names and installation ids.
pub fn unique_id() -> String {
  uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  #[test]
  fn password_length_and_alphabet() {
    let password = generate_password();
    // 32 bytes -> 43 base64 characters without padding
    assert_eq!(password.len(), 43);
    assert!(password.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
  }

  #[test]
  fn passwords_do_not_repeat() {
    let passwords: HashSet<_> = (0..100).map(|_| generate_password()).collect();
    assert_eq!(passwords.len(), 100);
  }

  #[test]
  fn unique_ids_are_uuids() {
    let id = unique_id();
    assert!(uuid::Uuid::parse_str(&id).is_ok());
    assert_ne!(id, unique_id());
  }
}
