//! Field rules shared by the public request bodies.
//!
//! These are plugged into `#[derive(Validate)]` through
//! `#[validate(custom(function = ...))]`.

use std::sync::LazyLock;

use regex::Regex;
use validator::ValidationError;

/// French phone numbers: `06 12 34 56 78`, `+33 6 12 34 56 78`, `0033612345678`.
static FRENCH_PHONE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^(?:(?:\+|00)33|0)\s*[1-9](?:[\s.-]*\d{2}){4}$")
    .expect("phone pattern is valid")
});

static POSTAL_CODE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^\d{5}$")
    .expect("postal code pattern is valid")
});

pub const NAME_MAX_CHARS: usize = 100;

fn error(code: &'static str, message: &'static str) -> ValidationError {
  let mut err = ValidationError::new(code);
  err.message = Some(message.into());
  err
}

pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
  if FRENCH_PHONE.is_match(value.trim()) {
    Ok(())
  } else {
    Err(error("phone", "numéro de téléphone français invalide"))
  }
}

pub fn validate_postal_code(value: &str) -> Result<(), ValidationError> {
  if POSTAL_CODE.is_match(value.trim()) {
    Ok(())
  } else {
    Err(error("postal_code", "code postal invalide (5 chiffres)"))
  }
}

/// Non-blank and at most [`NAME_MAX_CHARS`] characters once trimmed.
pub fn validate_name(value: &str) -> Result<(), ValidationError> {
  let len = value.trim().chars().count();
  if len == 0 {
    return Err(error("required", "champ obligatoire"));
  }
  if len > NAME_MAX_CHARS {
    return Err(error("length", "100 caractères maximum"));
  }
  Ok(())
}

/// Trim and lowercase an address so it can serve as an identity key.
pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

/// Flatten a [`validator::ValidationErrors`] tree into `field: message` pairs.
pub fn describe(errors: &validator::ValidationErrors) -> Vec<String> {
  let mut out: Vec<String> = errors
    .field_errors()
    .into_iter()
    .flat_map(|(field, errs)| {
      errs.iter().map(move |e| {
        let message = e
          .message
          .as_deref()
          .map(str::to_owned)
          .unwrap_or_else(|| e.code.to_string());
        format!("{field}: {message}")
      })
    })
    .collect();
  out.sort();
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_common_phone_spellings() {
    for phone in [
      "0612345678",
      "06 12 34 56 78",
      "06.12.34.56.78",
      "06-12-34-56-78",
      "+33612345678",
      "+33 6 12 34 56 78",
      "0033612345678",
      "01 48 00 00 00",
    ] {
      assert!(validate_phone(phone).is_ok(), "{phone} should be accepted");
    }
  }

  #[test]
  fn rejects_bad_phones() {
    for phone in ["", "12345", "0012345678", "06123456789", "+44 20 7946 0958", "06 12 34 56 7a"] {
      assert!(validate_phone(phone).is_err(), "{phone} should be rejected");
    }
  }

  #[test]
  fn postal_codes_are_five_digits() {
    assert!(validate_postal_code("93220").is_ok());
    assert!(validate_postal_code(" 95200 ").is_ok());
    assert!(validate_postal_code("9322").is_err());
    assert!(validate_postal_code("932200").is_err());
    assert!(validate_postal_code("9322A").is_err());
  }

  #[test]
  fn names_must_not_be_blank() {
    assert!(validate_name("Awa").is_ok());
    assert!(validate_name("   ").is_err());
    assert!(validate_name(&"x".repeat(101)).is_err());
  }

  #[test]
  fn email_normalisation() {
    assert_eq!(normalize_email("  Jean.Dupont@Example.FR "), "jean.dupont@example.fr");
  }
}
