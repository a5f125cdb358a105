//! Encoding and decoding helpers between domain types and the plain column
//! representations stored in SQLite.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings (microsecond
//! precision, `Z` suffix) so that string comparison in SQL orders them
//! chronologically. Dates are `YYYY-MM-DD`. Enumerations are stored under
//! their wire names; string lists as compact JSON.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use registrar_core::{
  catalog::{ExamTimeSlot, Formation},
  examen::{Client, Examen},
  inscription::{Badges, Inscription},
  user::User,
};

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

/// Parse an enumeration stored under its wire name.
pub fn decode_enum<T: FromStr>(what: &'static str, value: &str) -> Result<T> {
  value
    .parse()
    .map_err(|_| Error::UnknownValue { what, value: value.to_owned() })
}

pub fn encode_list(items: &[String]) -> Result<String> { Ok(serde_json::to_string(items)?) }

pub fn decode_list(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

// ─── Inscriptions ────────────────────────────────────────────────────────────

pub const INSCRIPTION_COLUMNS: &str = "row_index, created_at, updated_at, civility, first_name,
  last_name, email, phone, address, postal_code, city, birth_date, formation_id, formation_name,
  formation_duration, formation_price, location, availabilities, funding_mode, status,
  badge_contacted, badge_paid, badge_file_complete, relance_note, relance_at";

/// Raw column values of one `inscriptions` row.
pub struct RawInscription {
  pub row_index:           i64,
  pub created_at:          String,
  pub updated_at:          String,
  pub civility:            Option<String>,
  pub first_name:          String,
  pub last_name:           String,
  pub email:               String,
  pub phone:               String,
  pub address:             Option<String>,
  pub postal_code:         String,
  pub city:                String,
  pub birth_date:          Option<String>,
  pub formation_id:        Option<i64>,
  pub formation_name:      Option<String>,
  pub formation_duration:  Option<String>,
  pub formation_price:     Option<i64>,
  pub location:            Option<String>,
  pub availabilities:      String,
  pub funding_mode:        String,
  pub status:              String,
  pub badge_contacted:     String,
  pub badge_paid:          String,
  pub badge_file_complete: String,
  pub relance_note:        Option<String>,
  pub relance_at:          Option<String>,
}

impl RawInscription {
  /// Read a row selected with [`INSCRIPTION_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      row_index:           row.get(0)?,
      created_at:          row.get(1)?,
      updated_at:          row.get(2)?,
      civility:            row.get(3)?,
      first_name:          row.get(4)?,
      last_name:           row.get(5)?,
      email:               row.get(6)?,
      phone:               row.get(7)?,
      address:             row.get(8)?,
      postal_code:         row.get(9)?,
      city:                row.get(10)?,
      birth_date:          row.get(11)?,
      formation_id:        row.get(12)?,
      formation_name:      row.get(13)?,
      formation_duration:  row.get(14)?,
      formation_price:     row.get(15)?,
      location:            row.get(16)?,
      availabilities:      row.get(17)?,
      funding_mode:        row.get(18)?,
      status:              row.get(19)?,
      badge_contacted:     row.get(20)?,
      badge_paid:          row.get(21)?,
      badge_file_complete: row.get(22)?,
      relance_note:        row.get(23)?,
      relance_at:          row.get(24)?,
    })
  }

  pub fn into_inscription(self) -> Result<Inscription> {
    Ok(Inscription {
      row_index:          self.row_index,
      created_at:         decode_dt(&self.created_at)?,
      updated_at:         decode_dt(&self.updated_at)?,
      civility:           self.civility,
      first_name:         self.first_name,
      last_name:          self.last_name,
      email:              self.email,
      phone:              self.phone,
      address:            self.address,
      postal_code:        self.postal_code,
      city:               self.city,
      birth_date:         self.birth_date.as_deref().map(decode_date).transpose()?,
      formation_id:       self.formation_id,
      formation_name:     self.formation_name,
      formation_duration: self.formation_duration,
      formation_price:    self.formation_price,
      location:           self
        .location
        .as_deref()
        .map(|l| decode_enum("location", l))
        .transpose()?,
      availabilities:     decode_list(&self.availabilities)?,
      funding_mode:       decode_enum("funding mode", &self.funding_mode)?,
      status:             decode_enum("status", &self.status)?,
      badges:             Badges {
        contacted:     decode_enum("badge colour", &self.badge_contacted)?,
        paid:          decode_enum("badge colour", &self.badge_paid)?,
        file_complete: decode_enum("badge colour", &self.badge_file_complete)?,
      },
      relance_note:       self.relance_note,
      relance_at:         decode_opt_dt(self.relance_at)?,
    })
  }
}

// ─── Clients ─────────────────────────────────────────────────────────────────

pub const CLIENT_COLUMNS: &str =
  "id, email, first_name, last_name, phone, created_at, updated_at";

pub struct RawClient {
  pub id:         i64,
  pub email:      String,
  pub first_name: String,
  pub last_name:  String,
  pub phone:      String,
  pub created_at: String,
  pub updated_at: String,
}

impl RawClient {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      email:      row.get(1)?,
      first_name: row.get(2)?,
      last_name:  row.get(3)?,
      phone:      row.get(4)?,
      created_at: row.get(5)?,
      updated_at: row.get(6)?,
    })
  }

  pub fn into_client(self) -> Result<Client> {
    Ok(Client {
      id:         self.id,
      email:      self.email,
      first_name: self.first_name,
      last_name:  self.last_name,
      phone:      self.phone,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Examens ─────────────────────────────────────────────────────────────────

pub const EXAMEN_COLUMNS: &str = "id, client_id, token, first_name, last_name, email, phone,
  exam_type_id, exam_option_id, time_slot_id, objective, choice_at, created_at, archived_at";

pub struct RawExamen {
  pub id:             i64,
  pub client_id:      Option<i64>,
  pub token:          String,
  pub first_name:     String,
  pub last_name:      String,
  pub email:          String,
  pub phone:          String,
  pub exam_type_id:   Option<i64>,
  pub exam_option_id: Option<i64>,
  pub time_slot_id:   Option<i64>,
  pub objective:      Option<String>,
  pub choice_at:      Option<String>,
  pub created_at:     String,
  pub archived_at:    Option<String>,
}

impl RawExamen {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      client_id:      row.get(1)?,
      token:          row.get(2)?,
      first_name:     row.get(3)?,
      last_name:      row.get(4)?,
      email:          row.get(5)?,
      phone:          row.get(6)?,
      exam_type_id:   row.get(7)?,
      exam_option_id: row.get(8)?,
      time_slot_id:   row.get(9)?,
      objective:      row.get(10)?,
      choice_at:      row.get(11)?,
      created_at:     row.get(12)?,
      archived_at:    row.get(13)?,
    })
  }

  pub fn into_examen(self) -> Result<Examen> {
    Ok(Examen {
      id:             self.id,
      client_id:      self.client_id,
      token:          self.token,
      first_name:     self.first_name,
      last_name:      self.last_name,
      email:          self.email,
      phone:          self.phone,
      exam_type_id:   self.exam_type_id,
      exam_option_id: self.exam_option_id,
      time_slot_id:   self.time_slot_id,
      objective:      self.objective,
      choice_at:      decode_opt_dt(self.choice_at)?,
      created_at:     decode_dt(&self.created_at)?,
      archived_at:    decode_opt_dt(self.archived_at)?,
    })
  }
}

// ─── Catalogue ───────────────────────────────────────────────────────────────

pub const FORMATION_COLUMNS: &str = "id, name, duration, price, position, visible";

pub fn formation_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Formation> {
  Ok(Formation {
    id:       row.get(0)?,
    name:     row.get(1)?,
    duration: row.get(2)?,
    price:    row.get(3)?,
    position: row.get(4)?,
    visible:  row.get(5)?,
  })
}

pub const TIME_SLOT_COLUMNS: &str = "id, label, starts_at, ends_at, capacity, position, visible";

pub struct RawTimeSlot {
  pub id:        i64,
  pub label:     String,
  pub starts_at: String,
  pub ends_at:   String,
  pub capacity:  Option<u32>,
  pub position:  i64,
  pub visible:   bool,
}

impl RawTimeSlot {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:        row.get(0)?,
      label:     row.get(1)?,
      starts_at: row.get(2)?,
      ends_at:   row.get(3)?,
      capacity:  row.get(4)?,
      position:  row.get(5)?,
      visible:   row.get(6)?,
    })
  }

  pub fn into_slot(self) -> Result<ExamTimeSlot> {
    Ok(ExamTimeSlot {
      id:        self.id,
      label:     self.label,
      starts_at: decode_dt(&self.starts_at)?,
      ends_at:   decode_dt(&self.ends_at)?,
      capacity:  self.capacity,
      position:  self.position,
      visible:   self.visible,
    })
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "id, email, display_name, role, location, created_at";

pub struct RawUser {
  pub id:           i64,
  pub email:        String,
  pub display_name: String,
  pub role:         String,
  pub location:     Option<String>,
  pub created_at:   String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      email:        row.get(1)?,
      display_name: row.get(2)?,
      role:         row.get(3)?,
      location:     row.get(4)?,
      created_at:   row.get(5)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:           self.id,
      email:        self.email,
      display_name: self.display_name,
      role:         decode_enum("role", &self.role)?,
      location:     self
        .location
        .as_deref()
        .map(|l| decode_enum("location", l))
        .transpose()?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;
  use registrar_core::inscription::{BadgeColor, InscriptionStatus};

  use super::*;

  #[test]
  fn timestamps_sort_as_strings() {
    let a = Utc.with_ymd_and_hms(2026, 1, 9, 23, 59, 59).unwrap();
    let b = a + chrono::Duration::milliseconds(1);
    let c = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();
    assert!(encode_dt(a) < encode_dt(b));
    assert!(encode_dt(b) < encode_dt(c));
    assert_eq!(decode_dt(&encode_dt(b)).unwrap(), b);
  }

  #[test]
  fn enums_decode_from_wire_names() {
    assert_eq!(
      decode_enum::<InscriptionStatus>("status", "En attente").unwrap(),
      InscriptionStatus::EnAttente
    );
    assert_eq!(decode_enum::<BadgeColor>("badge colour", "green").unwrap(), BadgeColor::Green);
    assert!(matches!(
      decode_enum::<BadgeColor>("badge colour", "violet"),
      Err(Error::UnknownValue { what: "badge colour", .. })
    ));
  }
}
