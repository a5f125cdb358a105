//! API error type and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by a handler. Rendered as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  BadRequest(String),

  #[error("authentication required")]
  Unauthorized,

  #[error("forbidden")]
  Forbidden,

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Conflict(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
    Self::NotFound(format!("{entity} {id} not found"))
  }

  fn status(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden => StatusCode::FORBIDDEN,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<registrar_core::Error> for ApiError {
  fn from(e: registrar_core::Error) -> Self {
    use registrar_core::Error as E;
    match e {
      E::NotFound { entity, id } => ApiError::not_found(entity, id),
      E::Conflict(message) => ApiError::Conflict(message),
      E::Invalid(message) => ApiError::BadRequest(message),
      other => ApiError::Internal(Box::new(other)),
    }
  }
}

impl From<validator::ValidationErrors> for ApiError {
  fn from(errors: validator::ValidationErrors) -> Self {
    ApiError::BadRequest(registrar_core::validate::describe(&errors).join("; "))
  }
}

/// Classify a backend error through the core error taxonomy.
pub fn store_err<E: Into<registrar_core::Error>>(e: E) -> ApiError { ApiError::from(e.into()) }

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        "internal server error".to_owned()
      }
      other => other.to_string(),
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"registrar\""),
      );
    }
    res
  }
}
