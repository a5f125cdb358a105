//! Exam registrations and the canonical client identity behind them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validate::{normalize_email, validate_name, validate_phone};

// ─── Client ──────────────────────────────────────────────────────────────────

/// One person, keyed by lowercased email. Several exams may point at the same
/// client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
  pub id:         i64,
  pub email:      String,
  pub first_name: String,
  pub last_name:  String,
  pub phone:      String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Input to [`crate::store::ExamenStore::upsert_client`]. The latest contact
/// details win when the email already exists.
#[derive(Debug, Clone)]
pub struct NewClient {
  pub email:      String,
  pub first_name: String,
  pub last_name:  String,
  pub phone:      String,
}

// ─── Examen ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Examen {
  pub id:             i64,
  /// `None` for rows recorded before clients were tracked.
  pub client_id:      Option<i64>,
  /// Unguessable; the only identifier ever shown to the candidate.
  pub token:          String,
  pub first_name:     String,
  pub last_name:      String,
  pub email:          String,
  pub phone:          String,
  pub exam_type_id:   Option<i64>,
  pub exam_option_id: Option<i64>,
  pub time_slot_id:   Option<i64>,
  pub objective:      Option<String>,
  pub choice_at:      Option<DateTime<Utc>>,
  pub created_at:     DateTime<Utc>,
  pub archived_at:    Option<DateTime<Utc>>,
}

impl Examen {
  pub fn has_choice(&self) -> bool { self.choice_at.is_some() }

  pub fn is_archived(&self) -> bool { self.archived_at.is_some() }
}

/// An exam annotated with the inscription sharing its email, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedExamen {
  #[serde(flatten)]
  pub examen:         Examen,
  pub inscription_id: Option<i64>,
  /// `true` when the candidate registered for the exam only.
  pub stand_alone:    bool,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Body of the public exam registration form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExamenRequest {
  #[validate(custom(function = "validate_name"))]
  pub first_name:   String,
  #[validate(custom(function = "validate_name"))]
  pub last_name:    String,
  #[validate(email)]
  pub email:        String,
  #[validate(custom(function = "validate_phone"))]
  pub phone:        String,
  pub exam_type_id: Option<i64>,
}

impl ExamenRequest {
  pub fn normalize(mut self) -> Self {
    self.first_name = self.first_name.trim().to_owned();
    self.last_name = self.last_name.trim().to_owned();
    self.email = normalize_email(&self.email);
    self.phone = self.phone.trim().to_owned();
    self
  }

  pub fn client(&self) -> NewClient {
    NewClient {
      email:      self.email.clone(),
      first_name: self.first_name.clone(),
      last_name:  self.last_name.clone(),
      phone:      self.phone.clone(),
    }
  }
}

/// Input to [`crate::store::ExamenStore::create_examen`].
#[derive(Debug, Clone)]
pub struct NewExamen {
  pub client_id:    i64,
  pub token:        String,
  pub first_name:   String,
  pub last_name:    String,
  pub email:        String,
  pub phone:        String,
  pub exam_type_id: Option<i64>,
}

/// The candidate's diploma/objective selection.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExamChoice {
  pub exam_option_id: i64,
  pub time_slot_id:   Option<i64>,
  #[validate(length(max = 500))]
  pub objective:      Option<String>,
}
