//! Error types for `registrar-core`.
//!
//! Store backends convert their own errors into [`Error`] so that the HTTP
//! layer can classify a failure without knowing which backend produced it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{entity} not found: {id}")]
  NotFound { entity: &'static str, id: String },

  /// A uniqueness or reference constraint would be broken by the write.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("invalid input: {0}")]
  Invalid(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("backend error: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
    Self::NotFound { entity, id: id.to_string() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
