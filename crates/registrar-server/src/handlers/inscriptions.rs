//! Admin endpoints for inscriptions and relances.
//!
//! Commercial users are scoped to their own centre: listings are filtered and
//! single-record routes answer 404 for records outside it.

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::Utc;
use registrar_core::{
  inscription::{
    Inscription, InscriptionQuery, InscriptionStatus, InscriptionUpdate, Location,
  },
  merge::follow_up_recipients,
  policy::{Action, can_view_inscription},
  store::RegistrarStore,
  user::Role,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::ApiResult;
use crate::{
  AppState,
  auth::AuthUser,
  error::{ApiError, store_err},
  extract::{JsonBody, QueryParams},
  webhook::RelancePayload,
};

/// Fetch one inscription the user is allowed to see.
async fn visible_inscription<S>(
  state: &AppState<S>,
  user: &AuthUser,
  row_index: i64,
) -> Result<Inscription, ApiError>
where
  S: RegistrarStore + 'static,
{
  state
    .store
    .get_inscription(row_index)
    .await
    .map_err(store_err)?
    .filter(|i| can_view_inscription(&user.0, i))
    .ok_or_else(|| ApiError::not_found("inscription", row_index))
}

// ─── List / get ──────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub status:   Option<InscriptionStatus>,
  pub archived: Option<bool>,
  pub location: Option<Location>,
  pub q:        Option<String>,
}

/// `GET /api/admin/inscriptions?status=&archived=&location=&q=`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  QueryParams(params): QueryParams<ListParams>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ViewInscriptions)?;

  let location = match user.0.role {
    Role::Commercial => match user.0.location {
      Some(own) => Some(own),
      None => return Ok(Json(json!({ "inscriptions": [] }))),
    },
    Role::Admin | Role::Staff => params.location,
  };

  let query = InscriptionQuery {
    status: params.status,
    include_archived: params.archived.unwrap_or(false),
    location,
    text: params.q,
  };
  let mut inscriptions = state.store.list_inscriptions(query).await.map_err(store_err)?;
  inscriptions.retain(|i| can_view_inscription(&user.0, i));

  Ok(Json(json!({ "inscriptions": inscriptions })))
}

/// `GET /api/admin/inscriptions/{rowIndex}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Path(row_index): Path<i64>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ViewInscriptions)?;
  let inscription = visible_inscription(&state, &user, row_index).await?;
  Ok(Json(json!({ "inscription": inscription })))
}

// ─── Update / delete ─────────────────────────────────────────────────────────

/// `PATCH /api/admin/inscriptions/{rowIndex}` with a tagged
/// `{kind, payload}` body.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Path(row_index): Path<i64>,
  JsonBody(body): JsonBody<InscriptionUpdate>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::UpdateInscriptions)?;
  let current = visible_inscription(&state, &user, row_index).await?;

  let updated = match body {
    InscriptionUpdate::Status { status } => {
      state.store.set_inscription_status(row_index, status).await
    }
    InscriptionUpdate::Badge(update) => {
      let color = update.color.unwrap_or_else(|| current.badges.get(update.badge).next());
      state.store.set_inscription_badge(row_index, update.badge, color).await
    }
    InscriptionUpdate::Fields(patch) => {
      let patch = patch.normalize();
      patch.validate()?;
      if patch.is_empty() {
        return Err(ApiError::BadRequest("payload: no field to update".to_owned()));
      }
      // A commercial user may not move a record out of their own centre.
      if user.0.role == Role::Commercial
        && patch.location.is_some()
        && patch.location != user.0.location
      {
        return Err(ApiError::Forbidden);
      }
      state.store.patch_inscription(row_index, patch).await
    }
  }
  .map_err(store_err)?
  .ok_or_else(|| ApiError::not_found("inscription", row_index))?;

  tracing::info!(row_index, user_id = user.0.id, "inscription updated");
  Ok(Json(json!({ "inscription": updated })))
}

/// `DELETE /api/admin/inscriptions/{rowIndex}`: only archived records.
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Path(row_index): Path<i64>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::DeleteInscriptions)?;
  visible_inscription(&state, &user, row_index).await?;

  // The store deletes only while the row is still archived, so a concurrent
  // un-archive surfaces as a conflict.
  if !state.store.delete_inscription(row_index).await.map_err(store_err)? {
    return Err(ApiError::not_found("inscription", row_index));
  }
  tracing::info!(row_index, user_id = user.0.id, "inscription deleted");
  Ok(Json(json!({ "deleted": true })))
}

// ─── Relances ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct RelanceNote {
  #[validate(length(max = 2000))]
  pub note: Option<String>,
}

/// `POST /api/admin/inscriptions/{rowIndex}/relance`
pub async fn relance<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Path(row_index): Path<i64>,
  JsonBody(body): JsonBody<RelanceNote>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::SendRelance)?;
  body.validate()?;
  visible_inscription(&state, &user, row_index).await?;

  let note = body.note.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty());
  let inscription = state
    .store
    .record_relance(row_index, note, Utc::now())
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::not_found("inscription", row_index))?;

  Ok(Json(json!({ "inscription": inscription })))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RelanceBatch {
  #[validate(length(min = 1, max = 500))]
  pub row_indexes: Vec<i64>,
  #[validate(length(max = 2000))]
  pub note:        Option<String>,
}

/// `POST /api/admin/relances`: record a relance on every selected inscription
/// and send one webhook batch, one recipient per email.
pub async fn send_relances<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  JsonBody(body): JsonBody<RelanceBatch>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::SendRelance)?;
  body.validate()?;

  let note = body.note.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty());
  let now = Utc::now();

  let mut selected = Vec::with_capacity(body.row_indexes.len());
  for row_index in body.row_indexes {
    let visible = state
      .store
      .get_inscription(row_index)
      .await
      .map_err(store_err)?
      .is_some_and(|i| can_view_inscription(&user.0, &i));
    if !visible {
      continue;
    }
    if let Some(recorded) = state
      .store
      .record_relance(row_index, note.clone(), now)
      .await
      .map_err(store_err)?
    {
      selected.push(recorded);
    }
  }

  let recipients = follow_up_recipients(&selected);
  let count = recipients.len();
  let sent = state.notifier.send_relance(&RelancePayload { recipients, note }).await;

  tracing::info!(user_id = user.0.id, recipients = count, sent, "relance batch processed");
  Ok(Json(json!({ "sent": sent, "recipients": count })))
}
