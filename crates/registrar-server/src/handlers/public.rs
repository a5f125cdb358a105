//! Unauthenticated endpoints behind the two public registration forms.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/formations` | visible formations |
//! | `GET`  | `/api/exam-types` | visible types and their visible options |
//! | `POST` | `/api/inscriptions` | 201 `{inscription:{rowIndex}}` |
//! | `POST` | `/api/examens` | 201 `{examen:{id,token,url}}` |
//! | `GET`  | `/api/examens/{token}` | candidate view |
//! | `POST` | `/api/examens/{token}/choice` | 409 once a choice exists |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use chrono::Utc;
use registrar_core::{
  catalog::{ExamOption, ExamTimeSlot, ExamType},
  examen::{ExamChoice, Examen, ExamenRequest, NewExamen},
  inscription::NewInscription,
  store::RegistrarStore,
};
use serde_json::json;
use validator::Validate as _;

use super::{ApiResult, CreatedResult};
use crate::{AppState, error::{ApiError, store_err}, extract::JsonBody, token::generate_token};

/// `GET /api/formations`
pub async fn formations<S>(State(state): State<AppState<S>>) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  let formations = state.store.list_formations(true).await.map_err(store_err)?;
  Ok(Json(json!({ "formations": formations })))
}

/// `GET /api/exam-types`: each type lists only its visible options.
pub async fn exam_types<S>(State(state): State<AppState<S>>) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  let options = state.store.list_exam_options(true).await.map_err(store_err)?;
  let mut types = state.store.list_exam_types(true).await.map_err(store_err)?;
  for exam_type in &mut types {
    exam_type.options.retain(|id| options.iter().any(|o| o.id == *id));
  }
  Ok(Json(json!({ "examTypes": types, "examOptions": options })))
}

/// `POST /api/inscriptions`
pub async fn create_inscription<S>(
  State(state): State<AppState<S>>,
  JsonBody(input): JsonBody<NewInscription>,
) -> CreatedResult
where
  S: RegistrarStore + 'static,
{
  let input = input.normalize();
  input.validate()?;

  let formation = match input.formation_id {
    Some(id) => {
      let formation = state
        .store
        .get_formation(id)
        .await
        .map_err(store_err)?
        .filter(|f| f.visible)
        .ok_or_else(|| ApiError::BadRequest(format!("formationId: unknown formation {id}")))?;
      Some(formation)
    }
    None => None,
  };

  let inscription = state
    .store
    .create_inscription(input, formation)
    .await
    .map_err(store_err)?;
  tracing::info!(row_index = inscription.row_index, "inscription received");

  Ok((
    StatusCode::CREATED,
    Json(json!({ "inscription": { "rowIndex": inscription.row_index } })),
  ))
}

/// `POST /api/examens`: one client per email, one new exam per submission.
pub async fn create_examen<S>(
  State(state): State<AppState<S>>,
  JsonBody(input): JsonBody<ExamenRequest>,
) -> CreatedResult
where
  S: RegistrarStore + 'static,
{
  let input = input.normalize();
  input.validate()?;

  if let Some(id) = input.exam_type_id {
    let known = state
      .store
      .get_exam_type(id)
      .await
      .map_err(store_err)?
      .is_some_and(|t| t.visible);
    if !known {
      return Err(ApiError::BadRequest(format!("examTypeId: unknown exam type {id}")));
    }
  }

  let client = state.store.upsert_client(input.client()).await.map_err(store_err)?;
  let examen = state
    .store
    .create_examen(NewExamen {
      client_id:    client.id,
      token:        generate_token(),
      first_name:   input.first_name,
      last_name:    input.last_name,
      email:        input.email,
      phone:        input.phone,
      exam_type_id: input.exam_type_id,
    })
    .await
    .map_err(store_err)?;
  tracing::info!(examen_id = examen.id, client_id = client.id, "examen received");

  let url = state.config.examen_url(&examen.token);
  Ok((
    StatusCode::CREATED,
    Json(json!({ "examen": { "id": examen.id, "token": examen.token, "url": url } })),
  ))
}

// ─── Candidate view ──────────────────────────────────────────────────────────

/// What a candidate may pick for one exam.
struct Choices {
  examen:     Examen,
  exam_type:  Option<ExamType>,
  options:    Vec<ExamOption>,
  time_slots: Vec<ExamTimeSlot>,
}

async fn load_choices<S>(state: &AppState<S>, token: String) -> Result<Choices, ApiError>
where
  S: RegistrarStore + 'static,
{
  let examen = state
    .store
    .get_examen_by_token(token)
    .await
    .map_err(store_err)?
    .filter(|e| !e.is_archived())
    .ok_or_else(|| ApiError::NotFound("examen not found".to_owned()))?;

  let exam_type = match examen.exam_type_id {
    Some(id) => state.store.get_exam_type(id).await.map_err(store_err)?,
    None => None,
  };

  let mut options = state.store.list_exam_options(true).await.map_err(store_err)?;
  if let Some(exam_type) = &exam_type {
    options.retain(|o| exam_type.options.contains(&o.id));
  }

  let now = Utc::now();
  let mut time_slots = state.store.list_time_slots(true).await.map_err(store_err)?;
  time_slots.retain(|s| s.starts_at > now);

  Ok(Choices { examen, exam_type, options, time_slots })
}

/// `GET /api/examens/{token}`
pub async fn examen_view<S>(
  State(state): State<AppState<S>>,
  Path(token): Path<String>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  let choices = load_choices(&state, token).await?;
  Ok(Json(json!({
    "examen":     choices.examen,
    "examType":   choices.exam_type,
    "options":    choices.options,
    "timeSlots":  choices.time_slots,
  })))
}

/// `POST /api/examens/{token}/choice`
pub async fn choose<S>(
  State(state): State<AppState<S>>,
  Path(token): Path<String>,
  JsonBody(choice): JsonBody<ExamChoice>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  choice.validate()?;
  let choices = load_choices(&state, token).await?;
  if choices.examen.has_choice() {
    return Err(ApiError::Conflict("a choice has already been recorded".to_owned()));
  }

  let option = choices
    .options
    .iter()
    .find(|o| o.id == choice.exam_option_id)
    .ok_or_else(|| ApiError::BadRequest("examOptionId: option not available".to_owned()))?;

  if let Some(slot_id) = choice.time_slot_id {
    choices
      .time_slots
      .iter()
      .find(|s| s.id == slot_id)
      .filter(|_| option.allows_slot(slot_id))
      .ok_or_else(|| ApiError::BadRequest("timeSlotId: slot not available".to_owned()))?;
  }

  // The store rejects a second choice or a full slot in the same write.
  let examen = state
    .store
    .choose_examen(choices.examen.id, choice, Utc::now())
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::NotFound("examen not found".to_owned()))?;
  tracing::info!(examen_id = examen.id, option_id = ?examen.exam_option_id, "exam choice recorded");

  Ok(Json(json!({ "examen": examen })))
}
