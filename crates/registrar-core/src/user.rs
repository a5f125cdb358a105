//! Staff accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{AsRefStr, Display, EnumString};
use validator::{Validate, ValidationError};

use crate::{inscription::Location, validate::validate_name};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Admin,
  Staff,
  /// Sales staff attached to one centre.
  Commercial,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id:           i64,
  pub email:        String,
  pub display_name: String,
  pub role:         Role,
  /// Home centre. Restricts what a commercial user can see.
  pub location:     Option<Location>,
  pub created_at:   DateTime<Utc>,
}

/// Body of `POST /api/admin/users`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_new_user_location"))]
pub struct NewUser {
  #[validate(email)]
  pub email:        String,
  #[validate(custom(function = "validate_name"))]
  pub display_name: String,
  pub role:         Role,
  pub location:     Option<Location>,
  #[validate(length(min = 8, max = 200))]
  pub password:     String,
}

fn validate_new_user_location(input: &NewUser) -> Result<(), ValidationError> {
  check_role_location(input.role, input.location)
}

/// A commercial account must be attached to a centre.
pub fn check_role_location(
  role: Role,
  location: Option<Location>,
) -> Result<(), ValidationError> {
  if role == Role::Commercial && location.is_none() {
    let mut err = ValidationError::new("location");
    err.message = Some("a commercial account needs a location".into());
    return Err(err);
  }
  Ok(())
}

/// Body of `PATCH /api/admin/users/{id}`.
///
/// `location: null` clears the location; an absent `location` leaves it
/// unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
  #[validate(custom(function = "validate_name"))]
  pub display_name: Option<String>,
  pub role:         Option<Role>,
  #[serde(default, deserialize_with = "double_option")]
  pub location:     Option<Option<Location>>,
  #[validate(length(min = 8, max = 200))]
  pub password:     Option<String>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(deserializer).map(Some)
}

/// Input to [`crate::store::UserStore::create_user`]; the password is already
/// hashed.
#[derive(Debug, Clone)]
pub struct NewUserRecord {
  pub email:         String,
  pub display_name:  String,
  pub role:          Role,
  pub location:      Option<Location>,
  pub password_hash: String,
}

/// Input to [`crate::store::UserStore::update_user`].
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
  pub display_name:  Option<String>,
  pub role:          Option<Role>,
  pub location:      Option<Option<Location>>,
  pub password_hash: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn commercial_requires_location() {
    let mut input = NewUser {
      email:        "vente@example.fr".into(),
      display_name: "Vente".into(),
      role:         Role::Commercial,
      location:     None,
      password:     "motdepasse".into(),
    };
    assert!(input.validate().is_err());
    input.location = Some(Location::Sarcelles);
    assert!(input.validate().is_ok());
  }

  #[test]
  fn null_location_clears_but_absent_keeps() {
    let cleared: UserUpdate = serde_json::from_str(r#"{"location":null}"#).unwrap();
    assert_eq!(cleared.location, Some(None));

    let kept: UserUpdate = serde_json::from_str(r#"{"displayName":"Inès"}"#).unwrap();
    assert_eq!(kept.location, None);

    let set: UserUpdate = serde_json::from_str(r#"{"location":"Gagny"}"#).unwrap();
    assert_eq!(set.location, Some(Some(Location::Gagny)));
  }
}
