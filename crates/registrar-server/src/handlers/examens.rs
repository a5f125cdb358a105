//! Admin endpoints for exams and clients.

use axum::{
  Json,
  extract::{Path, State},
};
use registrar_core::{
  examen::{EnrichedExamen, Examen},
  inscription::InscriptionQuery,
  merge::{link_examens, merge_examens},
  policy::Action,
  store::RegistrarStore,
};
use serde::Deserialize;
use serde_json::json;

use super::ApiResult;
use crate::{
  AppState,
  auth::AuthUser,
  error::{ApiError, store_err},
  extract::QueryParams,
};

/// Link exams to inscriptions by email, archived inscriptions included.
pub(crate) async fn linked<S>(
  state: &AppState<S>,
  examens: Vec<Examen>,
) -> Result<Vec<EnrichedExamen>, ApiError>
where
  S: RegistrarStore + 'static,
{
  let inscriptions = state
    .store
    .list_inscriptions(InscriptionQuery { include_archived: true, ..Default::default() })
    .await
    .map_err(store_err)?;
  Ok(link_examens(&inscriptions, examens))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub archived: Option<bool>,
}

/// `GET /api/admin/examens?archived=`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  QueryParams(params): QueryParams<ListParams>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ViewExamens)?;
  let examens = state
    .store
    .list_examens(params.archived.unwrap_or(false))
    .await
    .map_err(store_err)?;
  let examens = linked(&state, examens).await?;
  Ok(Json(json!({ "examens": examens })))
}

/// `GET /api/admin/examens/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Path(id): Path<i64>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ViewExamens)?;
  let examen = state
    .store
    .get_examen(id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::not_found("examen", id))?;
  let examen = linked(&state, vec![examen]).await?.pop();
  Ok(Json(json!({ "examen": examen })))
}

/// `DELETE /api/admin/examens/{id}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Path(id): Path<i64>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageExamens)?;
  if !state.store.delete_examen(id).await.map_err(store_err)? {
    return Err(ApiError::not_found("examen", id));
  }
  tracing::info!(examen_id = id, user_id = user.0.id, "examen deleted");
  Ok(Json(json!({ "deleted": true })))
}

/// `POST /api/admin/examens/{id}/reset-choice`
pub async fn reset_choice<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Path(id): Path<i64>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageExamens)?;
  let examen = state
    .store
    .reset_examen_choice(id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::not_found("examen", id))?;
  tracing::info!(examen_id = id, user_id = user.0.id, "exam choice reset");
  Ok(Json(json!({ "examen": examen })))
}

/// `GET /api/admin/clients/{id}/examens`: every exam of a client, found by
/// client id and by email.
pub async fn by_client<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Path(id): Path<i64>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ViewExamens)?;
  let client = state
    .store
    .get_client(id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::not_found("client", id))?;

  let by_id = state.store.examens_by_client(id).await.map_err(store_err)?;
  let by_email = state
    .store
    .examens_by_email(client.email.clone())
    .await
    .map_err(store_err)?;
  let examens = linked(&state, merge_examens(by_id, by_email)).await?;

  Ok(Json(json!({ "client": client, "examens": examens })))
}
