//! Joins and merges between independently-fetched collections.
//!
//! All functions here are O(n) with one auxiliary map, and none depend on any
//! ordering other than the one their inputs arrive in.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
  catalog::ExamTimeSlot,
  examen::{EnrichedExamen, Examen},
  inscription::Inscription,
};

fn email_key(email: &str) -> String { email.trim().to_lowercase() }

/// Attach to every exam the `rowIndex` of the inscription sharing its email.
///
/// The first inscription seen for an address wins, in the order given. Exams
/// with no matching inscription are flagged `stand_alone`.
pub fn link_examens(
  inscriptions: &[Inscription],
  examens: Vec<Examen>,
) -> Vec<EnrichedExamen> {
  let mut by_email: HashMap<String, i64> = HashMap::with_capacity(inscriptions.len());
  for inscription in inscriptions {
    by_email
      .entry(email_key(&inscription.email))
      .or_insert(inscription.row_index);
  }

  examens
    .into_iter()
    .map(|examen| {
      let inscription_id = by_email.get(&email_key(&examen.email)).copied();
      EnrichedExamen {
        examen,
        inscription_id,
        stand_alone: inscription_id.is_none(),
      }
    })
    .collect()
}

/// Merge two lists describing the same exams (e.g. fetched by client id and
/// by email) into one, deduplicated by id.
///
/// On overlap the entry from `by_email` replaces the one from `by_client_id`.
/// The result is sorted by creation time, newest first; ties fall back to id,
/// highest first.
pub fn merge_examens(by_client_id: Vec<Examen>, by_email: Vec<Examen>) -> Vec<Examen> {
  let mut by_id: HashMap<i64, Examen> =
    HashMap::with_capacity(by_client_id.len() + by_email.len());
  for examen in by_client_id.into_iter().chain(by_email) {
    by_id.insert(examen.id, examen);
  }

  let mut merged: Vec<Examen> = by_id.into_values().collect();
  merged.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
  merged
}

/// One person to follow up, as sent to the relance webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpRecipient {
  pub row_index:  i64,
  pub email:      String,
  pub first_name: String,
  pub last_name:  String,
  pub phone:      String,
}

/// One recipient per email address, first-seen kept, order preserved.
pub fn follow_up_recipients<'a>(
  inscriptions: impl IntoIterator<Item = &'a Inscription>,
) -> Vec<FollowUpRecipient> {
  let mut seen = HashSet::new();
  inscriptions
    .into_iter()
    .filter(|i| seen.insert(email_key(&i.email)))
    .map(|i| FollowUpRecipient {
      row_index:  i.row_index,
      email:      i.email.clone(),
      first_name: i.first_name.clone(),
      last_name:  i.last_name.clone(),
      phone:      i.phone.clone(),
    })
    .collect()
}

/// A time slot with the exams booked on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningSlot {
  pub slot:    ExamTimeSlot,
  pub examens: Vec<EnrichedExamen>,
}

/// Group exams under their slot. Slots keep their given order, exams keep
/// theirs; exams whose slot is not in `slots` are dropped.
pub fn planning(slots: Vec<ExamTimeSlot>, examens: Vec<EnrichedExamen>) -> Vec<PlanningSlot> {
  let mut by_slot: HashMap<i64, Vec<EnrichedExamen>> = HashMap::new();
  for examen in examens {
    if let Some(slot_id) = examen.examen.time_slot_id {
      by_slot.entry(slot_id).or_default().push(examen);
    }
  }

  slots
    .into_iter()
    .map(|slot| {
      let examens = by_slot.remove(&slot.id).unwrap_or_default();
      PlanningSlot { slot, examens }
    })
    .collect()
}
