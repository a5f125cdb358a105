//! [`CatalogStore`] for [`SqliteStore`].
//!
//! Association lists (pack items, option slots, type options) are replaced
//! wholesale inside one transaction, after every target id has been checked.

use rusqlite::{Connection, OptionalExtension as _};

use registrar_core::{
  catalog::{
    ExamOption, ExamOptionInput, ExamTimeSlot, ExamType, ExamTypeInput, Formation,
    FormationInput, TimeSlotInput,
  },
  store::CatalogStore,
};

use super::SqliteStore;
use crate::{
  encode::{encode_dt, formation_from_row, RawTimeSlot, FORMATION_COLUMNS, TIME_SLOT_COLUMNS},
  Error, Result,
};

const OPTION_COLUMNS: &str = "id, code, label, description, price, position, visible, is_pack";
const TYPE_COLUMNS: &str = "id, code, label, position, visible";

fn visibility(visible_only: bool) -> &'static str {
  if visible_only { "WHERE visible = 1" } else { "" }
}

// ─── Synchronous helpers (run inside `Connection::call`) ─────────────────────

fn id_column(conn: &Connection, sql: &str, owner: i64) -> rusqlite::Result<Vec<i64>> {
  let mut stmt = conn.prepare_cached(sql)?;
  let ids = stmt
    .query_map(rusqlite::params![owner], |r| r.get(0))?
    .collect::<rusqlite::Result<Vec<i64>>>()?;
  Ok(ids)
}

fn option_from_row(conn: &Connection, row: &rusqlite::Row<'_>) -> rusqlite::Result<ExamOption> {
  let id: i64 = row.get(0)?;
  Ok(ExamOption {
    id,
    code: row.get(1)?,
    label: row.get(2)?,
    description: row.get(3)?,
    price: row.get(4)?,
    position: row.get(5)?,
    visible: row.get(6)?,
    is_pack: row.get(7)?,
    pack_items: id_column(
      conn,
      "SELECT item_id FROM exam_option_pack_items WHERE pack_id = ?1 ORDER BY item_id",
      id,
    )?,
    time_slots: id_column(
      conn,
      "SELECT slot_id FROM exam_option_time_slots WHERE option_id = ?1 ORDER BY slot_id",
      id,
    )?,
  })
}

fn load_option(conn: &Connection, id: i64) -> rusqlite::Result<Option<ExamOption>> {
  conn
    .query_row(
      &format!("SELECT {OPTION_COLUMNS} FROM exam_options WHERE id = ?1"),
      rusqlite::params![id],
      |row| option_from_row(conn, row),
    )
    .optional()
}

fn type_from_row(conn: &Connection, row: &rusqlite::Row<'_>) -> rusqlite::Result<ExamType> {
  let id: i64 = row.get(0)?;
  Ok(ExamType {
    id,
    code: row.get(1)?,
    label: row.get(2)?,
    position: row.get(3)?,
    visible: row.get(4)?,
    options: id_column(
      conn,
      "SELECT t.option_id FROM exam_type_options t
       JOIN exam_options o ON o.id = t.option_id
       WHERE t.type_id = ?1 ORDER BY o.position, o.id",
      id,
    )?,
  })
}

fn load_type(conn: &Connection, id: i64) -> rusqlite::Result<Option<ExamType>> {
  conn
    .query_row(
      &format!("SELECT {TYPE_COLUMNS} FROM exam_types WHERE id = ?1"),
      rusqlite::params![id],
      |row| type_from_row(conn, row),
    )
    .optional()
}

fn exists(conn: &Connection, table: &str, id: i64) -> rusqlite::Result<bool> {
  let found = conn
    .query_row(&format!("SELECT 1 FROM {table} WHERE id = ?1"), rusqlite::params![id], |_| {
      Ok(true)
    })
    .optional()?;
  Ok(found.unwrap_or(false))
}

/// First id of `ids` with no row in `table`.
fn first_missing(conn: &Connection, table: &str, ids: &[i64]) -> rusqlite::Result<Option<i64>> {
  for &id in ids {
    if !exists(conn, table, id)? {
      return Ok(Some(id));
    }
  }
  Ok(None)
}

fn delete_by_id(conn: &Connection, table: &str, id: i64) -> rusqlite::Result<bool> {
  let n = conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), rusqlite::params![id])?;
  Ok(n > 0)
}

/// Replace every `(owner, target)` row of an association table.
fn replace_links(
  conn: &Connection,
  table: &str,
  owner_column: &str,
  target_column: &str,
  owner: i64,
  targets: &[i64],
) -> rusqlite::Result<()> {
  conn.execute(
    &format!("DELETE FROM {table} WHERE {owner_column} = ?1"),
    rusqlite::params![owner],
  )?;
  let mut insert = conn.prepare(&format!(
    "INSERT INTO {table} ({owner_column}, {target_column}) VALUES (?1, ?2)"
  ))?;
  for target in targets {
    insert.execute(rusqlite::params![owner, target])?;
  }
  Ok(())
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  // ── Formations ────────────────────────────────────────────────────────────

  async fn list_formations(&self, visible_only: bool) -> Result<Vec<Formation>> {
    let sql = format!(
      "SELECT {FORMATION_COLUMNS} FROM formations {} ORDER BY position, id",
      visibility(visible_only)
    );
    let formations = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], formation_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(formations)
  }

  async fn get_formation(&self, id: i64) -> Result<Option<Formation>> {
    let formation = self
      .conn
      .call(move |conn| {
        let formation = conn
          .query_row(
            &format!("SELECT {FORMATION_COLUMNS} FROM formations WHERE id = ?1"),
            rusqlite::params![id],
            formation_from_row,
          )
          .optional()?;
        Ok(formation)
      })
      .await?;
    Ok(formation)
  }

  async fn create_formation(&self, input: FormationInput) -> Result<Formation> {
    let formation = self
      .conn
      .call(move |conn| {
        let formation = conn.query_row(
          &format!(
            "INSERT INTO formations (name, duration, price, position, visible)
             VALUES (?1, ?2, ?3, ?4, ?5) RETURNING {FORMATION_COLUMNS}"
          ),
          rusqlite::params![input.name, input.duration, input.price, input.position, input.visible],
          formation_from_row,
        )?;
        Ok(formation)
      })
      .await?;
    Ok(formation)
  }

  async fn update_formation(&self, id: i64, input: FormationInput) -> Result<Option<Formation>> {
    let formation = self
      .conn
      .call(move |conn| {
        let formation = conn
          .query_row(
            &format!(
              "UPDATE formations
               SET name = ?2, duration = ?3, price = ?4, position = ?5, visible = ?6
               WHERE id = ?1 RETURNING {FORMATION_COLUMNS}"
            ),
            rusqlite::params![
              id,
              input.name,
              input.duration,
              input.price,
              input.position,
              input.visible
            ],
            formation_from_row,
          )
          .optional()?;
        Ok(formation)
      })
      .await?;
    Ok(formation)
  }

  async fn delete_formation(&self, id: i64) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| Ok(delete_by_id(conn, "formations", id)?))
      .await?;
    Ok(deleted)
  }

  // ── Exam options ──────────────────────────────────────────────────────────

  async fn list_exam_options(&self, visible_only: bool) -> Result<Vec<ExamOption>> {
    let sql = format!(
      "SELECT {OPTION_COLUMNS} FROM exam_options {} ORDER BY position, id",
      visibility(visible_only)
    );
    let options = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| option_from_row(conn, row))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(options)
  }

  async fn get_exam_option(&self, id: i64) -> Result<Option<ExamOption>> {
    let option = self.conn.call(move |conn| Ok(load_option(conn, id)?)).await?;
    Ok(option)
  }

  async fn create_exam_option(&self, input: ExamOptionInput) -> Result<ExamOption> {
    let option = self
      .conn
      .call(move |conn| {
        let id: i64 = conn.query_row(
          "INSERT INTO exam_options (code, label, description, price, position, visible, is_pack)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING id",
          rusqlite::params![
            input.code,
            input.label,
            input.description,
            input.price,
            input.position,
            input.visible,
            input.is_pack,
          ],
          |r| r.get(0),
        )?;
        let option = load_option(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        Ok(option)
      })
      .await?;
    Ok(option)
  }

  async fn update_exam_option(
    &self,
    id: i64,
    input: ExamOptionInput,
  ) -> Result<Option<ExamOption>> {
    let option = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let n = tx.execute(
          "UPDATE exam_options
           SET code = ?2, label = ?3, description = ?4, price = ?5, position = ?6,
               visible = ?7, is_pack = ?8
           WHERE id = ?1",
          rusqlite::params![
            id,
            input.code,
            input.label,
            input.description,
            input.price,
            input.position,
            input.visible,
            input.is_pack,
          ],
        )?;
        if n == 0 {
          return Ok(None);
        }
        if !input.is_pack {
          tx.execute(
            "DELETE FROM exam_option_pack_items WHERE pack_id = ?1",
            rusqlite::params![id],
          )?;
        }
        let option = load_option(&tx, id)?;
        tx.commit()?;
        Ok(option)
      })
      .await?;
    Ok(option)
  }

  async fn delete_exam_option(&self, id: i64) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| Ok(delete_by_id(conn, "exam_options", id)?))
      .await?;
    Ok(deleted)
  }

  async fn set_pack_items(&self, id: i64, items: Vec<i64>) -> Result<Option<ExamOption>> {
    if items.contains(&id) {
      return Err(Error::Conflict("a pack cannot contain itself".to_owned()));
    }

    let outcome: Result<Option<ExamOption>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(current) = load_option(&tx, id)? else {
          return Ok(Ok(None));
        };
        if !current.is_pack && !items.is_empty() {
          return Ok(Err(Error::Conflict(format!("exam option {id} is not a pack"))));
        }
        for &item in &items {
          let is_pack: Option<bool> = tx
            .query_row("SELECT is_pack FROM exam_options WHERE id = ?1", [item], |r| r.get(0))
            .optional()?;
          match is_pack {
            None => return Ok(Err(Error::Invalid(format!("ids: unknown exam option {item}")))),
            Some(true) => {
              return Ok(Err(Error::Conflict(format!(
                "a pack cannot contain another pack (exam option {item})"
              ))));
            }
            Some(false) => {}
          }
        }
        replace_links(&tx, "exam_option_pack_items", "pack_id", "item_id", id, &items)?;
        let option = load_option(&tx, id)?;
        tx.commit()?;
        Ok(Ok(option))
      })
      .await?;
    outcome
  }

  async fn set_option_time_slots(
    &self,
    id: i64,
    slots: Vec<i64>,
  ) -> Result<Option<ExamOption>> {
    let outcome: Result<Option<ExamOption>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(&tx, "exam_options", id)? {
          return Ok(Ok(None));
        }
        if let Some(slot) = first_missing(&tx, "exam_time_slots", &slots)? {
          return Ok(Err(Error::Invalid(format!("ids: unknown time slot {slot}"))));
        }
        replace_links(&tx, "exam_option_time_slots", "option_id", "slot_id", id, &slots)?;
        let option = load_option(&tx, id)?;
        tx.commit()?;
        Ok(Ok(option))
      })
      .await?;
    outcome
  }

  // ── Exam types ────────────────────────────────────────────────────────────

  async fn list_exam_types(&self, visible_only: bool) -> Result<Vec<ExamType>> {
    let sql = format!(
      "SELECT {TYPE_COLUMNS} FROM exam_types {} ORDER BY position, id",
      visibility(visible_only)
    );
    let types = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| type_from_row(conn, row))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(types)
  }

  async fn get_exam_type(&self, id: i64) -> Result<Option<ExamType>> {
    let exam_type = self.conn.call(move |conn| Ok(load_type(conn, id)?)).await?;
    Ok(exam_type)
  }

  async fn create_exam_type(&self, input: ExamTypeInput) -> Result<ExamType> {
    let exam_type = self
      .conn
      .call(move |conn| {
        let id: i64 = conn.query_row(
          "INSERT INTO exam_types (code, label, position, visible)
           VALUES (?1, ?2, ?3, ?4) RETURNING id",
          rusqlite::params![input.code, input.label, input.position, input.visible],
          |r| r.get(0),
        )?;
        let exam_type = load_type(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        Ok(exam_type)
      })
      .await?;
    Ok(exam_type)
  }

  async fn update_exam_type(&self, id: i64, input: ExamTypeInput) -> Result<Option<ExamType>> {
    let exam_type = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE exam_types SET code = ?2, label = ?3, position = ?4, visible = ?5
           WHERE id = ?1",
          rusqlite::params![id, input.code, input.label, input.position, input.visible],
        )?;
        if n == 0 {
          return Ok(None);
        }
        Ok(load_type(conn, id)?)
      })
      .await?;
    Ok(exam_type)
  }

  async fn delete_exam_type(&self, id: i64) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| Ok(delete_by_id(conn, "exam_types", id)?))
      .await?;
    Ok(deleted)
  }

  async fn set_type_options(&self, id: i64, options: Vec<i64>) -> Result<Option<ExamType>> {
    let outcome: Result<Option<ExamType>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(&tx, "exam_types", id)? {
          return Ok(Ok(None));
        }
        if let Some(option) = first_missing(&tx, "exam_options", &options)? {
          return Ok(Err(Error::Invalid(format!("ids: unknown exam option {option}"))));
        }
        replace_links(&tx, "exam_type_options", "type_id", "option_id", id, &options)?;
        let exam_type = load_type(&tx, id)?;
        tx.commit()?;
        Ok(Ok(exam_type))
      })
      .await?;
    outcome
  }

  // ── Time slots ────────────────────────────────────────────────────────────

  async fn list_time_slots(&self, visible_only: bool) -> Result<Vec<ExamTimeSlot>> {
    let sql = format!(
      "SELECT {TIME_SLOT_COLUMNS} FROM exam_time_slots {} ORDER BY starts_at, position, id",
      visibility(visible_only)
    );
    let raws: Vec<RawTimeSlot> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawTimeSlot::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawTimeSlot::into_slot).collect()
  }

  async fn get_time_slot(&self, id: i64) -> Result<Option<ExamTimeSlot>> {
    let raw: Option<RawTimeSlot> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!("SELECT {TIME_SLOT_COLUMNS} FROM exam_time_slots WHERE id = ?1"),
            rusqlite::params![id],
            RawTimeSlot::from_row,
          )
          .optional()?;
        Ok(raw)
      })
      .await?;
    raw.map(RawTimeSlot::into_slot).transpose()
  }

  async fn create_time_slot(&self, input: TimeSlotInput) -> Result<ExamTimeSlot> {
    let starts_at = encode_dt(input.starts_at);
    let ends_at = encode_dt(input.ends_at);

    let raw = self
      .conn
      .call(move |conn| {
        let raw = conn.query_row(
          &format!(
            "INSERT INTO exam_time_slots (label, starts_at, ends_at, capacity, position, visible)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING {TIME_SLOT_COLUMNS}"
          ),
          rusqlite::params![
            input.label,
            starts_at,
            ends_at,
            input.capacity,
            input.position,
            input.visible
          ],
          RawTimeSlot::from_row,
        )?;
        Ok(raw)
      })
      .await?;
    raw.into_slot()
  }

  async fn update_time_slot(
    &self,
    id: i64,
    input: TimeSlotInput,
  ) -> Result<Option<ExamTimeSlot>> {
    let starts_at = encode_dt(input.starts_at);
    let ends_at = encode_dt(input.ends_at);

    let raw: Option<RawTimeSlot> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!(
              "UPDATE exam_time_slots
               SET label = ?2, starts_at = ?3, ends_at = ?4, capacity = ?5, position = ?6,
                   visible = ?7
               WHERE id = ?1 RETURNING {TIME_SLOT_COLUMNS}"
            ),
            rusqlite::params![
              id,
              input.label,
              starts_at,
              ends_at,
              input.capacity,
              input.position,
              input.visible
            ],
            RawTimeSlot::from_row,
          )
          .optional()?;
        Ok(raw)
      })
      .await?;
    raw.map(RawTimeSlot::into_slot).transpose()
  }

  async fn delete_time_slot(&self, id: i64) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| Ok(delete_by_id(conn, "exam_time_slots", id)?))
      .await?;
    Ok(deleted)
  }
}
