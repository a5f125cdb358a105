pub mod catalog;
pub mod cron;
pub mod examens;
pub mod inscriptions;
pub mod planning;
pub mod public;
pub mod users;

use axum::{Json, http::StatusCode};
use serde_json::Value;

use crate::error::ApiError;

/// A `{ "<key>": data }` body.
pub(crate) type ApiResult = Result<Json<Value>, ApiError>;

/// A `{ "<key>": data }` body with an explicit status, for creations.
pub(crate) type CreatedResult = Result<(StatusCode, Json<Value>), ApiError>;
