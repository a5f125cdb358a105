//! Scheduled maintenance hooks, authenticated by a shared bearer secret.

use axum::{
  Json,
  extract::State,
  http::{HeaderMap, header},
};
use chrono::{Duration, Utc};
use registrar_core::store::RegistrarStore;
use serde_json::json;

use super::ApiResult;
use crate::{AppState, error::{ApiError, store_err}, token::secrets_match};

/// Every failure is a 403: a missing secret, a wrong one, and an unset
/// server-side secret look the same to the caller.
fn check_secret(headers: &HeaderMap, expected: Option<&str>) -> Result<(), ApiError> {
  let Some(expected) = expected.filter(|s| !s.is_empty()) else {
    tracing::warn!("cron call refused: no cron secret configured");
    return Err(ApiError::Forbidden);
  };
  let given = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .ok_or(ApiError::Forbidden)?;

  if secrets_match(given, expected) { Ok(()) } else { Err(ApiError::Forbidden) }
}

/// `POST /api/cron/archive-examens`: archive exams older than
/// `archive_after_days`. Running it twice archives nothing the second time.
pub async fn archive_examens<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  check_secret(&headers, state.config.cron_secret.as_deref())?;

  let now = Utc::now();
  let cutoff = now - Duration::days(i64::from(state.config.archive_after_days));
  let archived = state
    .store
    .archive_examens_before(cutoff, now)
    .await
    .map_err(store_err)?;

  Ok(Json(json!({ "archived": archived })))
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn bearer(value: &str) -> HeaderMap {
    let mut map = HeaderMap::new();
    map.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    map
  }

  #[test]
  fn secret_checks() {
    assert!(check_secret(&bearer("Bearer tic-tac"), Some("tic-tac")).is_ok());
    assert!(check_secret(&bearer("Bearer nope"), Some("tic-tac")).is_err());
    assert!(check_secret(&bearer("tic-tac"), Some("tic-tac")).is_err());
    assert!(check_secret(&HeaderMap::new(), Some("tic-tac")).is_err());
    assert!(check_secret(&bearer("Bearer "), Some("")).is_err());
    assert!(check_secret(&bearer("Bearer x"), None).is_err());
  }
}
