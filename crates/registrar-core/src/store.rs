//! Store traits, one per entity family.
//!
//! The traits are implemented by storage backends (e.g.
//! `registrar-store-sqlite`). The HTTP layer depends on this abstraction, not
//! on any concrete backend.
//!
//! Lookups by id return `None` when the row does not exist; that is not an
//! error. Writes return the row as it is after the write, or `None` when the
//! target row does not exist.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  catalog::{
    ExamOption, ExamOptionInput, ExamTimeSlot, ExamType, ExamTypeInput, Formation,
    FormationInput, TimeSlotInput,
  },
  examen::{Client, ExamChoice, Examen, NewClient, NewExamen},
  inscription::{
    BadgeColor, BadgeKind, Inscription, InscriptionPatch, InscriptionQuery,
    InscriptionStatus, NewInscription,
  },
  user::{NewUserRecord, User, UserChanges},
};

/// The error type shared by every store trait of one backend.
pub trait Backend: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;
}

// ─── Inscriptions ────────────────────────────────────────────────────────────

pub trait InscriptionStore: Backend {
  /// Persist a new inscription. `formation`, when given, is copied into the
  /// row as the training-choice snapshot.
  fn create_inscription(
    &self,
    input: NewInscription,
    formation: Option<Formation>,
  ) -> impl Future<Output = Result<Inscription, Self::Error>> + Send + '_;

  fn get_inscription(
    &self,
    row_index: i64,
  ) -> impl Future<Output = Result<Option<Inscription>, Self::Error>> + Send + '_;

  /// Inscriptions matching `query`, ordered by `row_index` ascending.
  fn list_inscriptions(
    &self,
    query: InscriptionQuery,
  ) -> impl Future<Output = Result<Vec<Inscription>, Self::Error>> + Send + '_;

  fn set_inscription_status(
    &self,
    row_index: i64,
    status: InscriptionStatus,
  ) -> impl Future<Output = Result<Option<Inscription>, Self::Error>> + Send + '_;

  fn set_inscription_badge(
    &self,
    row_index: i64,
    badge: BadgeKind,
    color: BadgeColor,
  ) -> impl Future<Output = Result<Option<Inscription>, Self::Error>> + Send + '_;

  fn patch_inscription(
    &self,
    row_index: i64,
    patch: InscriptionPatch,
  ) -> impl Future<Output = Result<Option<Inscription>, Self::Error>> + Send + '_;

  /// Record a follow-up. `note: None` keeps the previous note and only moves
  /// the timestamp.
  fn record_relance(
    &self,
    row_index: i64,
    note: Option<String>,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Inscription>, Self::Error>> + Send + '_;

  /// Hard delete of an archived row. Returns `false` if the row did not
  /// exist and a conflict if it is not archived.
  fn delete_inscription(
    &self,
    row_index: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Clients and exams ───────────────────────────────────────────────────────

pub trait ExamenStore: Backend {
  /// Find-or-create the client for `input.email` in one atomic statement,
  /// refreshing the contact details. At most one client row exists per email.
  fn upsert_client(
    &self,
    input: NewClient,
  ) -> impl Future<Output = Result<Client, Self::Error>> + Send + '_;

  fn get_client(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Client>, Self::Error>> + Send + '_;

  fn create_examen(
    &self,
    input: NewExamen,
  ) -> impl Future<Output = Result<Examen, Self::Error>> + Send + '_;

  fn get_examen(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Examen>, Self::Error>> + Send + '_;

  fn get_examen_by_token(
    &self,
    token: String,
  ) -> impl Future<Output = Result<Option<Examen>, Self::Error>> + Send + '_;

  /// All exams, newest first.
  fn list_examens(
    &self,
    include_archived: bool,
  ) -> impl Future<Output = Result<Vec<Examen>, Self::Error>> + Send + '_;

  fn examens_by_client(
    &self,
    client_id: i64,
  ) -> impl Future<Output = Result<Vec<Examen>, Self::Error>> + Send + '_;

  /// Exams whose email matches, ignoring case.
  fn examens_by_email(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Vec<Examen>, Self::Error>> + Send + '_;

  /// Exams booked on a slot starting in `[from, to)`.
  fn examens_in_window(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Examen>, Self::Error>> + Send + '_;

  /// Record a choice on an exam that has none yet.
  ///
  /// Fails with a conflict when a choice already exists or the slot has no
  /// free place left. The check and the write happen atomically.
  fn choose_examen(
    &self,
    id: i64,
    choice: ExamChoice,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Examen>, Self::Error>> + Send + '_;

  /// Clear the option, slot, objective and choice time so the candidate can
  /// choose again.
  fn reset_examen_choice(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Examen>, Self::Error>> + Send + '_;

  fn delete_examen(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Mark every non-archived exam created at or before `cutoff` as archived
  /// at `at`. Already-archived rows are not touched. Returns the number of
  /// rows archived by this call.
  fn archive_examens_before(
    &self,
    cutoff: DateTime<Utc>,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

// ─── Catalogue ───────────────────────────────────────────────────────────────

pub trait CatalogStore: Backend {
  // ── Formations ────────────────────────────────────────────────────────

  fn list_formations(
    &self,
    visible_only: bool,
  ) -> impl Future<Output = Result<Vec<Formation>, Self::Error>> + Send + '_;

  fn get_formation(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Formation>, Self::Error>> + Send + '_;

  fn create_formation(
    &self,
    input: FormationInput,
  ) -> impl Future<Output = Result<Formation, Self::Error>> + Send + '_;

  fn update_formation(
    &self,
    id: i64,
    input: FormationInput,
  ) -> impl Future<Output = Result<Option<Formation>, Self::Error>> + Send + '_;

  fn delete_formation(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Exam options ──────────────────────────────────────────────────────

  fn list_exam_options(
    &self,
    visible_only: bool,
  ) -> impl Future<Output = Result<Vec<ExamOption>, Self::Error>> + Send + '_;

  fn get_exam_option(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<ExamOption>, Self::Error>> + Send + '_;

  fn create_exam_option(
    &self,
    input: ExamOptionInput,
  ) -> impl Future<Output = Result<ExamOption, Self::Error>> + Send + '_;

  fn update_exam_option(
    &self,
    id: i64,
    input: ExamOptionInput,
  ) -> impl Future<Output = Result<Option<ExamOption>, Self::Error>> + Send + '_;

  fn delete_exam_option(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Replace the options bundled by pack `id`.
  fn set_pack_items(
    &self,
    id: i64,
    items: Vec<i64>,
  ) -> impl Future<Output = Result<Option<ExamOption>, Self::Error>> + Send + '_;

  /// Replace the slots option `id` may be booked on.
  fn set_option_time_slots(
    &self,
    id: i64,
    slots: Vec<i64>,
  ) -> impl Future<Output = Result<Option<ExamOption>, Self::Error>> + Send + '_;

  // ── Exam types ────────────────────────────────────────────────────────

  fn list_exam_types(
    &self,
    visible_only: bool,
  ) -> impl Future<Output = Result<Vec<ExamType>, Self::Error>> + Send + '_;

  fn get_exam_type(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<ExamType>, Self::Error>> + Send + '_;

  fn create_exam_type(
    &self,
    input: ExamTypeInput,
  ) -> impl Future<Output = Result<ExamType, Self::Error>> + Send + '_;

  fn update_exam_type(
    &self,
    id: i64,
    input: ExamTypeInput,
  ) -> impl Future<Output = Result<Option<ExamType>, Self::Error>> + Send + '_;

  fn delete_exam_type(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Replace the options exposed by type `id`.
  fn set_type_options(
    &self,
    id: i64,
    options: Vec<i64>,
  ) -> impl Future<Output = Result<Option<ExamType>, Self::Error>> + Send + '_;

  // ── Time slots ────────────────────────────────────────────────────────

  fn list_time_slots(
    &self,
    visible_only: bool,
  ) -> impl Future<Output = Result<Vec<ExamTimeSlot>, Self::Error>> + Send + '_;

  fn get_time_slot(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<ExamTimeSlot>, Self::Error>> + Send + '_;

  fn create_time_slot(
    &self,
    input: TimeSlotInput,
  ) -> impl Future<Output = Result<ExamTimeSlot, Self::Error>> + Send + '_;

  fn update_time_slot(
    &self,
    id: i64,
    input: TimeSlotInput,
  ) -> impl Future<Output = Result<Option<ExamTimeSlot>, Self::Error>> + Send + '_;

  fn delete_time_slot(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Staff users ─────────────────────────────────────────────────────────────

pub trait UserStore: Backend {
  fn create_user(
    &self,
    input: NewUserRecord,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// The user for `email` (case-insensitive) with their password hash.
  fn get_credentials(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<(User, String)>, Self::Error>> + Send + '_;

  fn list_users(&self) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  fn update_user(
    &self,
    id: i64,
    changes: UserChanges,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn delete_user(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Umbrella ────────────────────────────────────────────────────────────────

/// Everything the HTTP layer needs from a backend.
pub trait RegistrarStore: InscriptionStore + ExamenStore + CatalogStore + UserStore {}

impl<T> RegistrarStore for T where T: InscriptionStore + ExamenStore + CatalogStore + UserStore {}
