//! Catalogue administration: formations, exam options, exam types and time
//! slots. Every route requires [`Action::ManageCatalog`].

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use registrar_core::{
  catalog::{ExamOptionInput, ExamTypeInput, FormationInput, IdList, TimeSlotInput},
  policy::Action,
  store::RegistrarStore,
};
use serde_json::json;
use validator::Validate as _;

use super::{ApiResult, CreatedResult};
use crate::{
  AppState,
  auth::AuthUser,
  error::{ApiError, store_err},
  extract::JsonBody,
};

fn deleted(found: bool, entity: &str, id: i64) -> ApiResult {
  if found {
    Ok(Json(json!({ "deleted": true })))
  } else {
    Err(ApiError::not_found(entity, id))
  }
}

// ─── Formations ──────────────────────────────────────────────────────────────

pub async fn list_formations<S>(State(state): State<AppState<S>>, user: AuthUser) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageCatalog)?;
  let formations = state.store.list_formations(false).await.map_err(store_err)?;
  Ok(Json(json!({ "formations": formations })))
}

pub async fn create_formation<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  JsonBody(input): JsonBody<FormationInput>,
) -> CreatedResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageCatalog)?;
  input.validate()?;
  let formation = state.store.create_formation(input).await.map_err(store_err)?;
  tracing::info!(formation_id = formation.id, "formation created");
  Ok((StatusCode::CREATED, Json(json!({ "formation": formation }))))
}

pub async fn update_formation<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Path(id): Path<i64>,
  JsonBody(input): JsonBody<FormationInput>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageCatalog)?;
  input.validate()?;
  let formation = state
    .store
    .update_formation(id, input)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::not_found("formation", id))?;
  Ok(Json(json!({ "formation": formation })))
}

pub async fn delete_formation<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Path(id): Path<i64>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageCatalog)?;
  let found = state.store.delete_formation(id).await.map_err(store_err)?;
  deleted(found, "formation", id)
}

// ─── Exam options ────────────────────────────────────────────────────────────

pub async fn list_options<S>(State(state): State<AppState<S>>, user: AuthUser) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageCatalog)?;
  let options = state.store.list_exam_options(false).await.map_err(store_err)?;
  Ok(Json(json!({ "examOptions": options })))
}

pub async fn create_option<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  JsonBody(input): JsonBody<ExamOptionInput>,
) -> CreatedResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageCatalog)?;
  input.validate()?;
  let option = state.store.create_exam_option(input).await.map_err(store_err)?;
  tracing::info!(option_id = option.id, code = %option.code, "exam option created");
  Ok((StatusCode::CREATED, Json(json!({ "examOption": option }))))
}

pub async fn update_option<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Path(id): Path<i64>,
  JsonBody(input): JsonBody<ExamOptionInput>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageCatalog)?;
  input.validate()?;
  let option = state
    .store
    .update_exam_option(id, input)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::not_found("exam option", id))?;
  Ok(Json(json!({ "examOption": option })))
}

pub async fn delete_option<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Path(id): Path<i64>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageCatalog)?;
  let found = state.store.delete_exam_option(id).await.map_err(store_err)?;
  deleted(found, "exam option", id)
}

/// `PUT /api/admin/exam-options/{id}/pack-items`
pub async fn set_pack_items<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Path(id): Path<i64>,
  JsonBody(body): JsonBody<IdList>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageCatalog)?;
  let option = state
    .store
    .set_pack_items(id, body.deduped())
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::not_found("exam option", id))?;
  Ok(Json(json!({ "examOption": option })))
}

/// `PUT /api/admin/exam-options/{id}/time-slots`
pub async fn set_option_slots<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Path(id): Path<i64>,
  JsonBody(body): JsonBody<IdList>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageCatalog)?;
  let option = state
    .store
    .set_option_time_slots(id, body.deduped())
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::not_found("exam option", id))?;
  Ok(Json(json!({ "examOption": option })))
}

// ─── Exam types ──────────────────────────────────────────────────────────────

pub async fn list_types<S>(State(state): State<AppState<S>>, user: AuthUser) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageCatalog)?;
  let types = state.store.list_exam_types(false).await.map_err(store_err)?;
  Ok(Json(json!({ "examTypes": types })))
}

pub async fn create_type<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  JsonBody(input): JsonBody<ExamTypeInput>,
) -> CreatedResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageCatalog)?;
  input.validate()?;
  let exam_type = state.store.create_exam_type(input).await.map_err(store_err)?;
  tracing::info!(type_id = exam_type.id, code = %exam_type.code, "exam type created");
  Ok((StatusCode::CREATED, Json(json!({ "examType": exam_type }))))
}

pub async fn update_type<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Path(id): Path<i64>,
  JsonBody(input): JsonBody<ExamTypeInput>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageCatalog)?;
  input.validate()?;
  let exam_type = state
    .store
    .update_exam_type(id, input)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::not_found("exam type", id))?;
  Ok(Json(json!({ "examType": exam_type })))
}

pub async fn delete_type<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Path(id): Path<i64>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageCatalog)?;
  let found = state.store.delete_exam_type(id).await.map_err(store_err)?;
  deleted(found, "exam type", id)
}

/// `PUT /api/admin/exam-types/{id}/options`
pub async fn set_type_options<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Path(id): Path<i64>,
  JsonBody(body): JsonBody<IdList>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageCatalog)?;
  let exam_type = state
    .store
    .set_type_options(id, body.deduped())
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::not_found("exam type", id))?;
  Ok(Json(json!({ "examType": exam_type })))
}

// ─── Time slots ──────────────────────────────────────────────────────────────

pub async fn list_slots<S>(State(state): State<AppState<S>>, user: AuthUser) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageCatalog)?;
  let slots = state.store.list_time_slots(false).await.map_err(store_err)?;
  Ok(Json(json!({ "timeSlots": slots })))
}

pub async fn create_slot<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  JsonBody(input): JsonBody<TimeSlotInput>,
) -> CreatedResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageCatalog)?;
  input.validate()?;
  let slot = state.store.create_time_slot(input).await.map_err(store_err)?;
  tracing::info!(slot_id = slot.id, starts_at = %slot.starts_at, "time slot created");
  Ok((StatusCode::CREATED, Json(json!({ "timeSlot": slot }))))
}

pub async fn update_slot<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Path(id): Path<i64>,
  JsonBody(input): JsonBody<TimeSlotInput>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageCatalog)?;
  input.validate()?;
  let slot = state
    .store
    .update_time_slot(id, input)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::not_found("time slot", id))?;
  Ok(Json(json!({ "timeSlot": slot })))
}

pub async fn delete_slot<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Path(id): Path<i64>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageCatalog)?;
  let found = state.store.delete_time_slot(id).await.map_err(store_err)?;
  deleted(found, "time slot", id)
}
