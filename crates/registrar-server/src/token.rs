//! Candidate access tokens.

use rand_core::{OsRng, RngCore as _};

const TOKEN_BYTES: usize = 24;

/// A fresh unguessable token: 24 random bytes, hex-encoded.
pub fn generate_token() -> String {
  let mut bytes = [0u8; TOKEN_BYTES];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

/// Compare two secrets without short-circuiting on the first differing byte.
pub fn secrets_match(given: &str, expected: &str) -> bool {
  let (a, b) = (given.as_bytes(), expected.as_bytes());
  a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
