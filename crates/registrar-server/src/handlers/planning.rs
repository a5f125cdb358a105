use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use registrar_core::{merge::planning, policy::Action, store::RegistrarStore};
use serde::Deserialize;
use serde_json::json;

use super::{ApiResult, examens::linked};
use crate::{AppState, auth::AuthUser, error::{ApiError, store_err}, extract::QueryParams};

#[derive(Debug, Deserialize)]
pub struct WindowParams {
  pub from: DateTime<Utc>,
  pub to:   DateTime<Utc>,
}

/// `GET /api/admin/planning?from=&to=`: slots starting in `[from, to)` with
/// their booked exams.
pub async fn window<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  QueryParams(params): QueryParams<WindowParams>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ViewPlanning)?;
  if params.to <= params.from {
    return Err(ApiError::BadRequest("to: must be after from".to_owned()));
  }

  let mut slots = state.store.list_time_slots(false).await.map_err(store_err)?;
  slots.retain(|s| s.starts_at >= params.from && s.starts_at < params.to);

  let examens = state
    .store
    .examens_in_window(params.from, params.to)
    .await
    .map_err(store_err)?;
  let examens = linked(&state, examens).await?;

  Ok(Json(json!({ "planning": planning(slots, examens) })))
}
