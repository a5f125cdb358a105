//! HTTP layer for the registrar.
//!
//! Exposes an axum [`Router`] with the public registration endpoints, the
//! authenticated admin API and the cron hook, backed by any
//! [`RegistrarStore`].

pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod token;
pub mod webhook;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, patch, post, put},
};
use registrar_core::store::RegistrarStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use handlers::{catalog, cron, examens, inscriptions, planning, public, users};
use webhook::Notifier;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `REGISTRAR_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  /// Public origin used to build candidate links.
  pub base_url:           String,
  pub store_path:         PathBuf,
  /// Bearer secret for `/api/cron/*`. Unset disables the cron endpoints.
  pub cron_secret:        Option<String>,
  /// Relance webhook. Unset means relances are only recorded.
  pub webhook_url:        Option<String>,
  pub archive_after_days: u32,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:               "127.0.0.1".to_owned(),
      port:               3000,
      base_url:           "http://localhost:3000".to_owned(),
      store_path:         PathBuf::from("registrar.db"),
      cron_secret:        None,
      webhook_url:        None,
      archive_after_days: 90,
    }
  }
}

impl ServerConfig {
  /// The candidate-facing link for an exam token.
  pub fn examen_url(&self, token: &str) -> String {
    format!("{}/examen/{token}", self.base_url.trim_end_matches('/'))
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:    Arc<S>,
  pub config:   Arc<ServerConfig>,
  pub notifier: Arc<Notifier>,
}

impl<S> AppState<S> {
  pub fn new(store: S, config: ServerConfig) -> Self {
    let notifier = Notifier::new(config.webhook_url.clone());
    Self {
      store:    Arc::new(store),
      config:   Arc::new(config),
      notifier: Arc::new(notifier),
    }
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      config:   Arc::clone(&self.config),
      notifier: Arc::clone(&self.notifier),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: RegistrarStore + 'static,
{
  Router::new()
    // Public
    .route("/api/formations",                 get(public::formations::<S>))
    .route("/api/exam-types",                 get(public::exam_types::<S>))
    .route("/api/inscriptions",               post(public::create_inscription::<S>))
    .route("/api/examens",                    post(public::create_examen::<S>))
    .route("/api/examens/{token}",            get(public::examen_view::<S>))
    .route("/api/examens/{token}/choice",     post(public::choose::<S>))
    // Inscriptions
    .route("/api/admin/inscriptions",         get(inscriptions::list::<S>))
    .route(
      "/api/admin/inscriptions/{row_index}",
      get(inscriptions::get_one::<S>)
        .patch(inscriptions::update::<S>)
        .delete(inscriptions::delete::<S>),
    )
    .route("/api/admin/inscriptions/{row_index}/relance", post(inscriptions::relance::<S>))
    .route("/api/admin/relances",             post(inscriptions::send_relances::<S>))
    // Exams and clients
    .route("/api/admin/examens",              get(examens::list::<S>))
    .route(
      "/api/admin/examens/{id}",
      get(examens::get_one::<S>).delete(examens::delete::<S>),
    )
    .route("/api/admin/examens/{id}/reset-choice", post(examens::reset_choice::<S>))
    .route("/api/admin/clients/{id}/examens", get(examens::by_client::<S>))
    .route("/api/admin/planning",             get(planning::window::<S>))
    // Catalogue
    .route(
      "/api/admin/formations",
      get(catalog::list_formations::<S>).post(catalog::create_formation::<S>),
    )
    .route(
      "/api/admin/formations/{id}",
      put(catalog::update_formation::<S>).delete(catalog::delete_formation::<S>),
    )
    .route(
      "/api/admin/exam-options",
      get(catalog::list_options::<S>).post(catalog::create_option::<S>),
    )
    .route(
      "/api/admin/exam-options/{id}",
      put(catalog::update_option::<S>).delete(catalog::delete_option::<S>),
    )
    .route("/api/admin/exam-options/{id}/pack-items", put(catalog::set_pack_items::<S>))
    .route("/api/admin/exam-options/{id}/time-slots", put(catalog::set_option_slots::<S>))
    .route(
      "/api/admin/exam-types",
      get(catalog::list_types::<S>).post(catalog::create_type::<S>),
    )
    .route(
      "/api/admin/exam-types/{id}",
      put(catalog::update_type::<S>).delete(catalog::delete_type::<S>),
    )
    .route("/api/admin/exam-types/{id}/options", put(catalog::set_type_options::<S>))
    .route(
      "/api/admin/exam-time-slots",
      get(catalog::list_slots::<S>).post(catalog::create_slot::<S>),
    )
    .route(
      "/api/admin/exam-time-slots/{id}",
      put(catalog::update_slot::<S>).delete(catalog::delete_slot::<S>),
    )
    // Staff accounts
    .route("/api/admin/users",                get(users::list::<S>).post(users::create::<S>))
    .route("/api/admin/users/{id}",           patch(users::update::<S>).delete(users::delete::<S>))
    .route("/api/admin/me",                   get(users::me::<S>))
    // Cron
    .route("/api/cron/archive-examens",       post(cron::archive_examens::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
mod tests;
