//! [`ExamenStore`] for [`SqliteStore`].

use chrono::{DateTime, Utc};
use rusqlite::{types::Value, OptionalExtension as _, TransactionBehavior};

use registrar_core::{
  examen::{Client, ExamChoice, Examen, NewClient, NewExamen},
  store::ExamenStore,
};

use super::SqliteStore;
use crate::{
  encode::{encode_dt, RawClient, RawExamen, CLIENT_COLUMNS, EXAMEN_COLUMNS},
  Error, Result,
};

impl SqliteStore {
  /// Run a `SELECT {EXAMEN_COLUMNS} FROM examens ...` query.
  async fn query_examens(&self, tail: String, values: Vec<Value>) -> Result<Vec<Examen>> {
    let sql = format!("SELECT {EXAMEN_COLUMNS} FROM examens {tail}");
    let raws: Vec<RawExamen> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(values), RawExamen::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawExamen::into_examen).collect()
  }

  async fn query_examen(&self, tail: String, values: Vec<Value>) -> Result<Option<Examen>> {
    let sql = format!("SELECT {EXAMEN_COLUMNS} FROM examens {tail}");
    let raw: Option<RawExamen> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(&sql, rusqlite::params_from_iter(values), RawExamen::from_row)
          .optional()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawExamen::into_examen).transpose()
  }
}

const NEWEST_FIRST: &str = "ORDER BY created_at DESC, id DESC";

impl ExamenStore for SqliteStore {
  async fn upsert_client(&self, input: NewClient) -> Result<Client> {
    let now = encode_dt(Utc::now());
    let email = input.email.trim().to_lowercase();

    let raw = self
      .conn
      .call(move |conn| {
        let raw = conn.query_row(
          &format!(
            "INSERT INTO clients (email, first_name, last_name, phone, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(email) DO UPDATE SET
               first_name = excluded.first_name,
               last_name  = excluded.last_name,
               phone      = excluded.phone,
               updated_at = excluded.updated_at
             RETURNING {CLIENT_COLUMNS}"
          ),
          rusqlite::params![email, input.first_name, input.last_name, input.phone, now],
          RawClient::from_row,
        )?;
        Ok(raw)
      })
      .await?;

    raw.into_client()
  }

  async fn get_client(&self, id: i64) -> Result<Option<Client>> {
    let raw: Option<RawClient> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1"),
            rusqlite::params![id],
            RawClient::from_row,
          )
          .optional()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawClient::into_client).transpose()
  }

  async fn create_examen(&self, input: NewExamen) -> Result<Examen> {
    let now = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let raw = conn.query_row(
          &format!(
            "INSERT INTO examens (
               client_id, token, first_name, last_name, email, phone, exam_type_id, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING {EXAMEN_COLUMNS}"
          ),
          rusqlite::params![
            input.client_id,
            input.token,
            input.first_name,
            input.last_name,
            input.email,
            input.phone,
            input.exam_type_id,
            now,
          ],
          RawExamen::from_row,
        )?;
        Ok(raw)
      })
      .await?;

    let examen = raw.into_examen()?;
    tracing::debug!(id = examen.id, client_id = ?examen.client_id, "examen stored");
    Ok(examen)
  }

  async fn get_examen(&self, id: i64) -> Result<Option<Examen>> {
    self.query_examen("WHERE id = ?1".to_owned(), vec![Value::Integer(id)]).await
  }

  async fn get_examen_by_token(&self, token: String) -> Result<Option<Examen>> {
    self.query_examen("WHERE token = ?1".to_owned(), vec![Value::Text(token)]).await
  }

  async fn list_examens(&self, include_archived: bool) -> Result<Vec<Examen>> {
    let filter = if include_archived { "" } else { "WHERE archived_at IS NULL" };
    self.query_examens(format!("{filter} {NEWEST_FIRST}"), Vec::new()).await
  }

  async fn examens_by_client(&self, client_id: i64) -> Result<Vec<Examen>> {
    self
      .query_examens(
        format!("WHERE client_id = ?1 {NEWEST_FIRST}"),
        vec![Value::Integer(client_id)],
      )
      .await
  }

  async fn examens_by_email(&self, email: String) -> Result<Vec<Examen>> {
    self
      .query_examens(
        format!("WHERE lower(email) = ?1 {NEWEST_FIRST}"),
        vec![Value::Text(email.trim().to_lowercase())],
      )
      .await
  }

  async fn examens_in_window(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<Vec<Examen>> {
    self
      .query_examens(
        "WHERE time_slot_id IN (
           SELECT id FROM exam_time_slots WHERE starts_at >= ?1 AND starts_at < ?2
         )
         ORDER BY created_at ASC, id ASC"
          .to_owned(),
        vec![Value::Text(encode_dt(from)), Value::Text(encode_dt(to))],
      )
      .await
  }

  async fn choose_examen(
    &self,
    id: i64,
    choice: ExamChoice,
    at: DateTime<Utc>,
  ) -> Result<Option<Examen>> {
    let at = encode_dt(at);

    let outcome: Result<Option<RawExamen>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let chosen: Option<Option<String>> = tx
          .query_row("SELECT choice_at FROM examens WHERE id = ?1", [id], |row| row.get(0))
          .optional()?;
        match chosen {
          None => return Ok(Ok(None)),
          Some(Some(_)) => {
            return Ok(Err(Error::Conflict("a choice has already been recorded".to_owned())));
          }
          Some(None) => {}
        }

        if let Some(slot_id) = choice.time_slot_id {
          let capacity: Option<Option<u32>> = tx
            .query_row("SELECT capacity FROM exam_time_slots WHERE id = ?1", [slot_id], |row| {
              row.get(0)
            })
            .optional()?;
          if let Some(Some(capacity)) = capacity {
            let booked: u32 = tx.query_row(
              "SELECT count(*) FROM examens
               WHERE time_slot_id = ?1 AND archived_at IS NULL AND id != ?2",
              rusqlite::params![slot_id, id],
              |row| row.get(0),
            )?;
            if booked >= capacity {
              return Ok(Err(Error::Conflict("this time slot is full".to_owned())));
            }
          }
        }

        let raw = tx
          .query_row(
            &format!(
              "UPDATE examens
               SET exam_option_id = ?2, time_slot_id = ?3, objective = ?4, choice_at = ?5
               WHERE id = ?1 AND choice_at IS NULL
               RETURNING {EXAMEN_COLUMNS}"
            ),
            rusqlite::params![id, choice.exam_option_id, choice.time_slot_id, choice.objective, at],
            RawExamen::from_row,
          )
          .optional()?;
        tx.commit()?;
        Ok(Ok(raw))
      })
      .await?;

    outcome?.map(RawExamen::into_examen).transpose()
  }

  async fn reset_examen_choice(&self, id: i64) -> Result<Option<Examen>> {
    let raw: Option<RawExamen> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!(
              "UPDATE examens
               SET exam_option_id = NULL, time_slot_id = NULL, objective = NULL, choice_at = NULL
               WHERE id = ?1
               RETURNING {EXAMEN_COLUMNS}"
            ),
            rusqlite::params![id],
            RawExamen::from_row,
          )
          .optional()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawExamen::into_examen).transpose()
  }

  async fn delete_examen(&self, id: i64) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| {
        let n = conn.execute("DELETE FROM examens WHERE id = ?1", rusqlite::params![id])?;
        Ok(n > 0)
      })
      .await?;
    Ok(deleted)
  }

  async fn archive_examens_before(
    &self,
    cutoff: DateTime<Utc>,
    at: DateTime<Utc>,
  ) -> Result<u64> {
    let cutoff = encode_dt(cutoff);
    let at = encode_dt(at);

    let archived = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE examens SET archived_at = ?2
           WHERE archived_at IS NULL AND created_at <= ?1",
          rusqlite::params![cutoff, at],
        )?;
        Ok(n)
      })
      .await?;

    tracing::info!(archived, "archived old examens");
    Ok(archived as u64)
  }
}
