//! Inscriptions: training-course registrations.
//!
//! An inscription is created by the public form and then worked by staff:
//! its status moves through the review workflow, three follow-up badges track
//! contact/payment/paperwork, and relance notes record the last follow-up.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use validator::Validate;

use crate::validate::{
  normalize_email, validate_name, validate_phone, validate_postal_code,
};

// ─── Enumerations ────────────────────────────────────────────────────────────

/// The two training centres.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum Location {
  Gagny,
  Sarcelles,
}

/// How the registrant pays for the training.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FundingMode {
  #[default]
  Personnel,
  Cpf,
  FranceTravail,
  Entreprise,
  Autre,
}

/// Review workflow status. `Archivee` doubles as the soft delete.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum InscriptionStatus {
  #[default]
  #[serde(rename = "En attente")]
  #[strum(serialize = "En attente")]
  EnAttente,
  Validee,
  Refusee,
  Archivee,
}

impl InscriptionStatus {
  pub fn is_archived(self) -> bool { matches!(self, Self::Archivee) }
}

/// The fixed badge palette. [`BadgeColor::next`] cycles red → orange → green → red.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BadgeColor {
  #[default]
  Red,
  Orange,
  Green,
}

impl BadgeColor {
  pub fn next(self) -> Self {
    match self {
      Self::Red => Self::Orange,
      Self::Orange => Self::Green,
      Self::Green => Self::Red,
    }
  }
}

/// Which of the three follow-up badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BadgeKind {
  Contacted,
  Paid,
  FileComplete,
}

/// The three independently-coloured follow-up markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badges {
  pub contacted:     BadgeColor,
  pub paid:          BadgeColor,
  pub file_complete: BadgeColor,
}

impl Badges {
  pub fn get(&self, kind: BadgeKind) -> BadgeColor {
    match kind {
      BadgeKind::Contacted => self.contacted,
      BadgeKind::Paid => self.paid,
      BadgeKind::FileComplete => self.file_complete,
    }
  }

  pub fn set(&mut self, kind: BadgeKind, color: BadgeColor) {
    match kind {
      BadgeKind::Contacted => self.contacted = color,
      BadgeKind::Paid => self.paid = color,
      BadgeKind::FileComplete => self.file_complete = color,
    }
  }
}

// ─── Inscription ─────────────────────────────────────────────────────────────

/// A training-course registration as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inscription {
  /// Store-assigned and never reused; the only external identifier.
  pub row_index:          i64,
  pub created_at:         DateTime<Utc>,
  pub updated_at:         DateTime<Utc>,
  pub civility:           Option<String>,
  pub first_name:         String,
  pub last_name:          String,
  pub email:              String,
  pub phone:              String,
  pub address:            Option<String>,
  pub postal_code:        String,
  pub city:               String,
  pub birth_date:         Option<NaiveDate>,
  // Snapshot of the chosen formation at submission time.
  pub formation_id:       Option<i64>,
  pub formation_name:     Option<String>,
  pub formation_duration: Option<String>,
  pub formation_price:    Option<i64>,
  pub location:           Option<Location>,
  pub availabilities:     Vec<String>,
  pub funding_mode:       FundingMode,
  pub status:             InscriptionStatus,
  pub badges:             Badges,
  pub relance_note:       Option<String>,
  pub relance_at:         Option<DateTime<Utc>>,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Body of the public training registration form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewInscription {
  #[validate(length(max = 20))]
  pub civility:       Option<String>,
  #[validate(custom(function = "validate_name"))]
  pub first_name:     String,
  #[validate(custom(function = "validate_name"))]
  pub last_name:      String,
  #[validate(email)]
  pub email:          String,
  #[validate(custom(function = "validate_phone"))]
  pub phone:          String,
  #[validate(length(max = 200))]
  pub address:        Option<String>,
  #[validate(custom(function = "validate_postal_code"))]
  pub postal_code:    String,
  #[validate(custom(function = "validate_name"))]
  pub city:           String,
  pub birth_date:     Option<NaiveDate>,
  pub formation_id:   Option<i64>,
  pub location:       Option<Location>,
  #[serde(default)]
  #[validate(length(max = 10))]
  pub availabilities: Vec<String>,
  #[serde(default)]
  pub funding_mode:   FundingMode,
}

impl NewInscription {
  /// Trim free text and lowercase the email before it is stored.
  pub fn normalize(mut self) -> Self {
    self.civility = trim_opt(self.civility);
    self.first_name = self.first_name.trim().to_owned();
    self.last_name = self.last_name.trim().to_owned();
    self.email = normalize_email(&self.email);
    self.phone = self.phone.trim().to_owned();
    self.address = trim_opt(self.address);
    self.postal_code = self.postal_code.trim().to_owned();
    self.city = self.city.trim().to_owned();
    self.availabilities = self
      .availabilities
      .into_iter()
      .map(|a| a.trim().to_owned())
      .filter(|a| !a.is_empty())
      .collect();
    self
  }
}

/// An open field patch applied by staff. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InscriptionPatch {
  #[validate(length(max = 20))]
  pub civility:       Option<String>,
  #[validate(custom(function = "validate_name"))]
  pub first_name:     Option<String>,
  #[validate(custom(function = "validate_name"))]
  pub last_name:      Option<String>,
  #[validate(email)]
  pub email:          Option<String>,
  #[validate(custom(function = "validate_phone"))]
  pub phone:          Option<String>,
  #[validate(length(max = 200))]
  pub address:        Option<String>,
  #[validate(custom(function = "validate_postal_code"))]
  pub postal_code:    Option<String>,
  #[validate(custom(function = "validate_name"))]
  pub city:           Option<String>,
  pub birth_date:     Option<NaiveDate>,
  pub location:       Option<Location>,
  #[validate(length(max = 10))]
  pub availabilities: Option<Vec<String>>,
  pub funding_mode:   Option<FundingMode>,
}

impl InscriptionPatch {
  pub fn is_empty(&self) -> bool {
    self.civility.is_none()
      && self.first_name.is_none()
      && self.last_name.is_none()
      && self.email.is_none()
      && self.phone.is_none()
      && self.address.is_none()
      && self.postal_code.is_none()
      && self.city.is_none()
      && self.birth_date.is_none()
      && self.location.is_none()
      && self.availabilities.is_none()
      && self.funding_mode.is_none()
  }

  pub fn normalize(mut self) -> Self {
    self.civility = trim_opt(self.civility);
    self.first_name = self.first_name.map(|s| s.trim().to_owned());
    self.last_name = self.last_name.map(|s| s.trim().to_owned());
    self.email = self.email.as_deref().map(normalize_email);
    self.phone = self.phone.map(|s| s.trim().to_owned());
    self.address = trim_opt(self.address);
    self.postal_code = self.postal_code.map(|s| s.trim().to_owned());
    self.city = self.city.map(|s| s.trim().to_owned());
    self
  }
}

/// Set one badge. Without a colour the badge advances to the next palette
/// colour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeUpdate {
  pub badge: BadgeKind,
  pub color: Option<BadgeColor>,
}

/// Body of `PATCH /api/admin/inscriptions/{rowIndex}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "lowercase")]
pub enum InscriptionUpdate {
  Status { status: InscriptionStatus },
  Badge(BadgeUpdate),
  Fields(InscriptionPatch),
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::InscriptionStore::list_inscriptions`].
#[derive(Debug, Clone, Default)]
pub struct InscriptionQuery {
  /// Exact status filter. When set, `include_archived` is ignored.
  pub status:           Option<InscriptionStatus>,
  /// Without a status filter, archived inscriptions are hidden unless this is
  /// set.
  pub include_archived: bool,
  pub location:         Option<Location>,
  /// Case-insensitive substring over names and email.
  pub text:             Option<String>,
}

fn trim_opt(value: Option<String>) -> Option<String> {
  value
    .map(|s| s.trim().to_owned())
    .filter(|s| !s.is_empty())
}
