//! HTTP Basic-auth extractor backed by the staff user table.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{extract::FromRequestParts, http::{HeaderMap, request::Parts}};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use rand_core::OsRng;
use registrar_core::{
  policy::{Action, can_perform},
  store::RegistrarStore,
  user::User,
};

use crate::{AppState, error::{ApiError, store_err}};

/// The authenticated staff member making the request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
  /// Reject with 403 unless the role policy allows `action`.
  pub fn require(&self, action: Action) -> Result<(), ApiError> {
    if can_perform(&self.0, action) {
      Ok(())
    } else {
      tracing::debug!(user_id = self.0.id, ?action, "action refused by role policy");
      Err(ApiError::Forbidden)
    }
  }
}

/// Produce the argon2 PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
  PasswordHash::new(hash)
    .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
    .is_ok()
}

/// Split a `Basic` authorization header into `(email, password)`.
fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val.strip_prefix("Basic ").ok_or(ApiError::Unauthorized)?;
  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;

  let (email, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;
  Ok((email.to_owned(), password.to_owned()))
}

impl<S> FromRequestParts<AppState<S>> for AuthUser
where
  S: RegistrarStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let (email, password) = basic_credentials(&parts.headers)?;

    let Some((user, hash)) = state.store.get_credentials(email).await.map_err(store_err)? else {
      return Err(ApiError::Unauthorized);
    };
    if !verify_password(&password, &hash) {
      tracing::info!(user_id = user.id, "rejected credentials");
      return Err(ApiError::Unauthorized);
    }
    Ok(AuthUser(user))
  }
}
