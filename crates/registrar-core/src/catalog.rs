//! Admin-configurable catalogue: formations and the exam option/type/slot
//! triangle.
//!
//! Prices are stored in euro cents. Listings are ordered by `position`, then
//! by id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::validate::validate_name;

fn default_true() -> bool { true }

// ─── Formation ───────────────────────────────────────────────────────────────

/// A training course offered on the inscription form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Formation {
  pub id:       i64,
  pub name:     String,
  /// Free text, e.g. `"40 h"` or `"3 mois"`.
  pub duration: String,
  pub price:    i64,
  pub position: i64,
  pub visible:  bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FormationInput {
  #[validate(custom(function = "validate_name"))]
  pub name:     String,
  #[validate(length(max = 50))]
  pub duration: String,
  #[validate(range(min = 0))]
  pub price:    i64,
  #[serde(default)]
  pub position: i64,
  #[serde(default = "default_true")]
  pub visible:  bool,
}

// ─── Exam option ─────────────────────────────────────────────────────────────

/// A diploma/objective the candidate may pick. A pack bundles other options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamOption {
  pub id:          i64,
  pub code:        String,
  pub label:       String,
  pub description: Option<String>,
  pub price:       i64,
  pub position:    i64,
  pub visible:     bool,
  pub is_pack:     bool,
  /// Options bundled by this pack; always empty when `is_pack` is false.
  pub pack_items:  Vec<i64>,
  /// Slots this option may be booked on. Empty means any slot.
  pub time_slots:  Vec<i64>,
}

impl ExamOption {
  pub fn allows_slot(&self, slot_id: i64) -> bool {
    self.time_slots.is_empty() || self.time_slots.contains(&slot_id)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExamOptionInput {
  #[validate(length(min = 1, max = 32))]
  pub code:        String,
  #[validate(custom(function = "validate_name"))]
  pub label:       String,
  #[validate(length(max = 1000))]
  pub description: Option<String>,
  #[validate(range(min = 0))]
  pub price:       i64,
  #[serde(default)]
  pub position:    i64,
  #[serde(default = "default_true")]
  pub visible:     bool,
  #[serde(default)]
  pub is_pack:     bool,
}

// ─── Exam type ───────────────────────────────────────────────────────────────

/// A family of exams (e.g. civic exam, language test) exposing a subset of
/// options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamType {
  pub id:       i64,
  pub code:     String,
  pub label:    String,
  pub position: i64,
  pub visible:  bool,
  pub options:  Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExamTypeInput {
  #[validate(length(min = 1, max = 32))]
  pub code:     String,
  #[validate(custom(function = "validate_name"))]
  pub label:    String,
  #[serde(default)]
  pub position: i64,
  #[serde(default = "default_true")]
  pub visible:  bool,
}

// ─── Time slot ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamTimeSlot {
  pub id:        i64,
  pub label:     String,
  pub starts_at: DateTime<Utc>,
  pub ends_at:   DateTime<Utc>,
  pub capacity:  Option<u32>,
  pub position:  i64,
  pub visible:   bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_slot_window"))]
pub struct TimeSlotInput {
  #[validate(custom(function = "validate_name"))]
  pub label:     String,
  pub starts_at: DateTime<Utc>,
  pub ends_at:   DateTime<Utc>,
  #[validate(range(min = 1))]
  pub capacity:  Option<u32>,
  #[serde(default)]
  pub position:  i64,
  #[serde(default = "default_true")]
  pub visible:   bool,
}

fn validate_slot_window(input: &TimeSlotInput) -> Result<(), ValidationError> {
  if input.ends_at > input.starts_at {
    Ok(())
  } else {
    let mut err = ValidationError::new("window");
    err.message = Some("endsAt must be after startsAt".into());
    Err(err)
  }
}

/// Body of the `PUT .../pack-items`, `.../time-slots` and `.../options`
/// association endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdList {
  pub ids: Vec<i64>,
}

impl IdList {
  /// The ids in first-seen order with duplicates removed.
  pub fn deduped(&self) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    self.ids.iter().copied().filter(|id| seen.insert(*id)).collect()
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  #[test]
  fn slot_window_must_be_positive() {
    let start = Utc.with_ymd_and_hms(2026, 11, 2, 9, 0, 0).unwrap();
    let mut input = TimeSlotInput {
      label:     "Lundi matin".into(),
      starts_at: start,
      ends_at:   start,
      capacity:  Some(12),
      position:  0,
      visible:   true,
    };
    assert!(input.validate().is_err());
    input.ends_at = start + chrono::Duration::hours(3);
    assert!(input.validate().is_ok());
  }

  #[test]
  fn empty_slot_restriction_allows_any_slot() {
    let mut option = ExamOption {
      id:          1,
      code:        "A2".into(),
      label:       "Niveau A2".into(),
      description: None,
      price:       12000,
      position:    0,
      visible:     true,
      is_pack:     false,
      pack_items:  vec![],
      time_slots:  vec![],
    };
    assert!(option.allows_slot(7));
    option.time_slots = vec![3];
    assert!(option.allows_slot(3));
    assert!(!option.allows_slot(7));
  }

  #[test]
  fn id_list_dedup_keeps_order() {
    let list = IdList { ids: vec![3, 1, 3, 2, 1] };
    assert_eq!(list.deduped(), [3, 1, 2]);
  }

  #[test]
  fn visible_defaults_to_true() {
    let input: FormationInput =
      serde_json::from_str(r#"{"name":"Français B1","duration":"40 h","price":45000}"#).unwrap();
    assert!(input.visible);
    assert_eq!(input.position, 0);
  }
}
