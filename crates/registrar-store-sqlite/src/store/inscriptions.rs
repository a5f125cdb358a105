//! [`InscriptionStore`] for [`SqliteStore`].

use chrono::{DateTime, Utc};
use rusqlite::{types::Value, OptionalExtension as _};

use registrar_core::{
  catalog::Formation,
  inscription::{
    BadgeColor, BadgeKind, Inscription, InscriptionPatch, InscriptionQuery,
    InscriptionStatus, NewInscription,
  },
  store::InscriptionStore,
};

use super::SqliteStore;
use crate::{
  encode::{encode_date, encode_dt, encode_list, RawInscription, INSCRIPTION_COLUMNS},
  Error, Result,
};

fn badge_column(kind: BadgeKind) -> &'static str {
  match kind {
    BadgeKind::Contacted => "badge_contacted",
    BadgeKind::Paid => "badge_paid",
    BadgeKind::FileComplete => "badge_file_complete",
  }
}

/// Unicode case-insensitive substring match over names and email. SQLite's
/// `lower()` only folds ASCII, so this runs on decoded rows.
fn matches_text(inscription: &Inscription, needle: &str) -> bool {
  [&inscription.first_name, &inscription.last_name, &inscription.email]
    .into_iter()
    .any(|field| field.to_lowercase().contains(needle))
}

/// Collects `column = ?N` assignments for a single-row `UPDATE`.
#[derive(Default)]
struct Assignments {
  columns: Vec<String>,
  values:  Vec<Value>,
}

impl Assignments {
  fn set(&mut self, column: &str, value: impl Into<Value>) {
    self.values.push(value.into());
    self.columns.push(format!("{column} = ?{}", self.values.len()));
  }

  fn set_opt<T: Into<Value>>(&mut self, column: &str, value: Option<T>) {
    if let Some(value) = value {
      self.set(column, value);
    }
  }
}

impl SqliteStore {
  /// Apply `assignments` plus `updated_at` to one row and return it.
  async fn update_inscription(
    &self,
    row_index: i64,
    mut assignments: Assignments,
  ) -> Result<Option<Inscription>> {
    assignments.set("updated_at", encode_dt(Utc::now()));
    assignments.values.push(Value::Integer(row_index));
    let sql = format!(
      "UPDATE inscriptions SET {} WHERE row_index = ?{} RETURNING {INSCRIPTION_COLUMNS}",
      assignments.columns.join(", "),
      assignments.values.len(),
    );
    let values = assignments.values;

    let raw: Option<RawInscription> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &sql,
            rusqlite::params_from_iter(values),
            RawInscription::from_row,
          )
          .optional()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawInscription::into_inscription).transpose()
  }
}

impl InscriptionStore for SqliteStore {
  async fn create_inscription(
    &self,
    input: NewInscription,
    formation: Option<Formation>,
  ) -> Result<Inscription> {
    let now = encode_dt(Utc::now());
    let birth_date = input.birth_date.map(encode_date);
    let location = input.location.map(|l| l.as_ref().to_owned());
    let availabilities = encode_list(&input.availabilities)?;
    let funding_mode = input.funding_mode.as_ref().to_owned();
    let (formation_id, formation_name, formation_duration, formation_price) =
      match formation {
        Some(f) => (Some(f.id), Some(f.name), Some(f.duration), Some(f.price)),
        None => (None, None, None, None),
      };
    let status = InscriptionStatus::default().as_ref().to_owned();

    let raw = self
      .conn
      .call(move |conn| {
        let raw = conn.query_row(
          &format!(
            "INSERT INTO inscriptions (
               created_at, updated_at, civility, first_name, last_name, email,
               phone, address, postal_code, city, birth_date, formation_id,
               formation_name, formation_duration, formation_price, location,
               availabilities, funding_mode, status
             ) VALUES (?1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                       ?14, ?15, ?16, ?17, ?18)
             RETURNING {INSCRIPTION_COLUMNS}"
          ),
          rusqlite::params![
            now,
            input.civility,
            input.first_name,
            input.last_name,
            input.email,
            input.phone,
            input.address,
            input.postal_code,
            input.city,
            birth_date,
            formation_id,
            formation_name,
            formation_duration,
            formation_price,
            location,
            availabilities,
            funding_mode,
            status,
          ],
          RawInscription::from_row,
        )?;
        Ok(raw)
      })
      .await?;

    let inscription = raw.into_inscription()?;
    tracing::debug!(row_index = inscription.row_index, "inscription stored");
    Ok(inscription)
  }

  async fn get_inscription(&self, row_index: i64) -> Result<Option<Inscription>> {
    let raw: Option<RawInscription> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!("SELECT {INSCRIPTION_COLUMNS} FROM inscriptions WHERE row_index = ?1"),
            rusqlite::params![row_index],
            RawInscription::from_row,
          )
          .optional()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawInscription::into_inscription).transpose()
  }

  async fn list_inscriptions(&self, query: InscriptionQuery) -> Result<Vec<Inscription>> {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    match query.status {
      Some(status) => {
        values.push(Value::Text(status.as_ref().to_owned()));
        clauses.push(format!("status = ?{}", values.len()));
      }
      None if !query.include_archived => {
        values.push(Value::Text(InscriptionStatus::Archivee.as_ref().to_owned()));
        clauses.push(format!("status != ?{}", values.len()));
      }
      None => {}
    }
    if let Some(location) = query.location {
      values.push(Value::Text(location.as_ref().to_owned()));
      clauses.push(format!("location = ?{}", values.len()));
    }
    let needle = query
      .text
      .as_deref()
      .map(|t| t.trim().to_lowercase())
      .filter(|t| !t.is_empty());

    let where_sql = if clauses.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
      "SELECT {INSCRIPTION_COLUMNS} FROM inscriptions {where_sql} ORDER BY row_index ASC"
    );

    let raws: Vec<RawInscription> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(values), RawInscription::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut inscriptions = raws
      .into_iter()
      .map(RawInscription::into_inscription)
      .collect::<Result<Vec<_>>>()?;
    if let Some(needle) = needle {
      inscriptions.retain(|i| matches_text(i, &needle));
    }
    Ok(inscriptions)
  }

  async fn set_inscription_status(
    &self,
    row_index: i64,
    status: InscriptionStatus,
  ) -> Result<Option<Inscription>> {
    let mut assignments = Assignments::default();
    assignments.set("status", status.as_ref().to_owned());
    self.update_inscription(row_index, assignments).await
  }

  async fn set_inscription_badge(
    &self,
    row_index: i64,
    badge: BadgeKind,
    color: BadgeColor,
  ) -> Result<Option<Inscription>> {
    let mut assignments = Assignments::default();
    assignments.set(badge_column(badge), color.as_ref().to_owned());
    self.update_inscription(row_index, assignments).await
  }

  async fn patch_inscription(
    &self,
    row_index: i64,
    patch: InscriptionPatch,
  ) -> Result<Option<Inscription>> {
    if patch.is_empty() {
      return self.get_inscription(row_index).await;
    }

    let mut a = Assignments::default();
    a.set_opt("civility", patch.civility);
    a.set_opt("first_name", patch.first_name);
    a.set_opt("last_name", patch.last_name);
    a.set_opt("email", patch.email);
    a.set_opt("phone", patch.phone);
    a.set_opt("address", patch.address);
    a.set_opt("postal_code", patch.postal_code);
    a.set_opt("city", patch.city);
    a.set_opt("birth_date", patch.birth_date.map(encode_date));
    a.set_opt("location", patch.location.map(|l| l.as_ref().to_owned()));
    a.set_opt("availabilities", patch.availabilities.as_deref().map(encode_list).transpose()?);
    a.set_opt("funding_mode", patch.funding_mode.map(|f| f.as_ref().to_owned()));
    self.update_inscription(row_index, a).await
  }

  async fn record_relance(
    &self,
    row_index: i64,
    note: Option<String>,
    at: DateTime<Utc>,
  ) -> Result<Option<Inscription>> {
    let mut assignments = Assignments::default();
    assignments.set("relance_at", encode_dt(at));
    assignments.set_opt("relance_note", note);
    self.update_inscription(row_index, assignments).await
  }

  async fn delete_inscription(&self, row_index: i64) -> Result<bool> {
    let archived = InscriptionStatus::Archivee.as_ref().to_owned();
    let outcome: Result<bool> = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM inscriptions WHERE row_index = ?1 AND status = ?2",
          rusqlite::params![row_index, archived],
        )?;
        if n > 0 {
          return Ok(Ok(true));
        }
        let present = conn
          .query_row(
            "SELECT 1 FROM inscriptions WHERE row_index = ?1",
            rusqlite::params![row_index],
            |_| Ok(()),
          )
          .optional()?;
        Ok(match present {
          Some(()) => Err(Error::Conflict("only archived inscriptions can be deleted".to_owned())),
          None => Ok(false),
        })
      })
      .await?;
    outcome
  }
}
