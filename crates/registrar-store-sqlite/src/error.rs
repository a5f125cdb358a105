//! Error type for `registrar-store-sqlite`.

use rusqlite::ffi;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[source] tokio_rusqlite::Error),

  /// A constraint or a state rule rejected the write.
  #[error("{0}")]
  Conflict(String),

  /// The request names rows that do not exist.
  #[error("{0}")]
  Invalid(String),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown {what} value: {value:?}")]
  UnknownValue { what: &'static str, value: String },
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    match constraint_conflict(&e) {
      Some(message) => Error::Conflict(message),
      None => Error::Database(e),
    }
  }
}

/// Recognise the constraint failures that mean "conflicts with existing data"
/// and phrase them for the caller.
fn constraint_conflict(e: &tokio_rusqlite::Error) -> Option<String> {
  let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(failure, message)) = e else {
    return None;
  };
  let message = message.as_deref().unwrap_or_default();

  match failure.extended_code {
    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
      // "UNIQUE constraint failed: exam_options.code"
      let column = message
        .rsplit(|c: char| c == '.' || c == ' ')
        .next()
        .filter(|c| !c.is_empty())
        .unwrap_or("key");
      Some(format!("a record with the same {column} already exists"))
    }
    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
      Some("the record is referenced by, or refers to, a missing or dependent record".to_owned())
    }
    _ => None,
  }
}

impl From<Error> for registrar_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Conflict(message) => registrar_core::Error::Conflict(message),
      Error::Invalid(message) => registrar_core::Error::Invalid(message),
      Error::Json(e) => registrar_core::Error::Serialization(e),
      other => registrar_core::Error::Backend(Box::new(other)),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
