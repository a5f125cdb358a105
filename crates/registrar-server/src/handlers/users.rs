//! Staff account management.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use registrar_core::{
  policy::Action,
  store::RegistrarStore,
  user::{NewUser, NewUserRecord, UserChanges, UserUpdate, check_role_location},
  validate::normalize_email,
};
use serde_json::json;
use validator::Validate as _;

use super::{ApiResult, CreatedResult};
use crate::{
  AppState,
  auth::{AuthUser, hash_password},
  error::{ApiError, store_err},
  extract::JsonBody,
};

fn hash(password: &str) -> Result<String, ApiError> {
  hash_password(password).map_err(|e| ApiError::Internal(e.to_string().into()))
}

/// `GET /api/admin/me`: any authenticated staff member.
pub async fn me<S>(user: AuthUser) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  Ok(Json(json!({ "user": user.0 })))
}

/// `GET /api/admin/users`
pub async fn list<S>(State(state): State<AppState<S>>, user: AuthUser) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageUsers)?;
  let users = state.store.list_users().await.map_err(store_err)?;
  Ok(Json(json!({ "users": users })))
}

/// `POST /api/admin/users`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  JsonBody(input): JsonBody<NewUser>,
) -> CreatedResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageUsers)?;
  input.validate()?;

  let record = NewUserRecord {
    email:         normalize_email(&input.email),
    display_name:  input.display_name.trim().to_owned(),
    role:          input.role,
    location:      input.location,
    password_hash: hash(&input.password)?,
  };
  let created = state.store.create_user(record).await.map_err(store_err)?;
  tracing::info!(user_id = created.id, role = %created.role, by = user.0.id, "user created");

  Ok((StatusCode::CREATED, Json(json!({ "user": created }))))
}

/// `PATCH /api/admin/users/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Path(id): Path<i64>,
  JsonBody(input): JsonBody<UserUpdate>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageUsers)?;
  input.validate()?;

  let current = state
    .store
    .get_user(id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::not_found("user", id))?;

  let role = input.role.unwrap_or(current.role);
  let location = input.location.unwrap_or(current.location);
  check_role_location(role, location).map_err(|e| {
    ApiError::BadRequest(format!(
      "location: {}",
      e.message.unwrap_or_else(|| e.code.clone())
    ))
  })?;

  let changes = UserChanges {
    display_name:  input.display_name.map(|n| n.trim().to_owned()),
    role:          input.role,
    location:      input.location,
    password_hash: input.password.as_deref().map(hash).transpose()?,
  };
  let updated = state
    .store
    .update_user(id, changes)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::not_found("user", id))?;
  tracing::info!(user_id = id, by = user.0.id, "user updated");

  Ok(Json(json!({ "user": updated })))
}

/// `DELETE /api/admin/users/{id}`. An account cannot delete itself.
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Path(id): Path<i64>,
) -> ApiResult
where
  S: RegistrarStore + 'static,
{
  user.require(Action::ManageUsers)?;
  if id == user.0.id {
    return Err(ApiError::BadRequest("cannot delete your own account".to_owned()));
  }
  if !state.store.delete_user(id).await.map_err(store_err)? {
    return Err(ApiError::not_found("user", id));
  }
  tracing::info!(user_id = id, by = user.0.id, "user deleted");
  Ok(Json(json!({ "deleted": true })))
}
