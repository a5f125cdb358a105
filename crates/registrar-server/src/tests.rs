use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use chrono::{Duration, SecondsFormat, Utc};
use registrar_core::{
  inscription::Location,
  store::{ExamenStore as _, InscriptionStore as _, UserStore as _},
  user::{NewUserRecord, Role},
};
use registrar_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use super::*;
use crate::auth::hash_password;

const PASSWORD: &str = "motdepasse";
const CRON_SECRET: &str = "tic-tac";

// ─── Helpers ─────────────────────────────────────────────────────────────────

async fn make_state() -> AppState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let config = ServerConfig {
    base_url: "https://inscriptions.example.fr/".to_owned(),
    cron_secret: Some(CRON_SECRET.to_owned()),
    archive_after_days: 0,
    ..Default::default()
  };
  AppState::new(store, config)
}

/// Create a staff account and return its Basic auth header.
async fn add_user(
  state: &AppState<SqliteStore>,
  email: &str,
  role: Role,
  location: Option<Location>,
) -> String {
  state
    .store
    .create_user(NewUserRecord {
      email: email.to_owned(),
      display_name: email.to_owned(),
      role,
      location,
      password_hash: hash_password(PASSWORD).unwrap(),
    })
    .await
    .unwrap();
  format!("Basic {}", B64.encode(format!("{email}:{PASSWORD}")))
}

async fn oneshot_raw(
  state:   AppState<SqliteStore>,
  method:  &str,
  uri:     &str,
  auth:    Option<&str>,
  body:    Option<Value>,
) -> axum::response::Response {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(auth) = auth {
    builder = builder.header(header::AUTHORIZATION, auth);
  }
  let body = match body {
    Some(value) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(value.to_string())
    }
    None => Body::empty(),
  };
  router(state).oneshot(builder.body(body).unwrap()).await.unwrap()
}

async fn call(
  state:  &AppState<SqliteStore>,
  method: &str,
  uri:    &str,
  auth:   Option<&str>,
  body:   Option<Value>,
) -> (StatusCode, Value) {
  let resp = oneshot_raw(state.clone(), method, uri, auth, body).await;
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
  (status, value)
}

fn inscription_body(email: &str, location: &str) -> Value {
  json!({
    "firstName":  "Amina",
    "lastName":   "Diallo",
    "email":      email,
    "phone":      "06 12 34 56 78",
    "postalCode": "93220",
    "city":       "Gagny",
    "location":   location,
  })
}

fn examen_body(email: &str, exam_type_id: Option<i64>) -> Value {
  json!({
    "firstName":  "Karim",
    "lastName":   "Benali",
    "email":      email,
    "phone":      "+33 6 98 76 54 32",
    "examTypeId": exam_type_id,
  })
}

fn rfc3339(at: chrono::DateTime<Utc>) -> String { at.to_rfc3339_opts(SecondsFormat::Secs, true) }

// ─── Public forms ────────────────────────────────────────────────────────────

#[tokio::test]
async fn invalid_inscription_is_rejected_without_write() {
  let state = make_state().await;
  let mut body = inscription_body("amina@example.fr", "Gagny");
  body["phone"] = json!("123");
  body["postalCode"] = json!("9322");

  let (status, value) = call(&state, "POST", "/api/inscriptions", None, Some(body)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let message = value["error"].as_str().unwrap();
  assert!(message.contains("phone"), "error: {message}");
  assert!(message.contains("postal"), "error: {message}");

  let stored = state.store.list_inscriptions(Default::default()).await.unwrap();
  assert!(stored.is_empty());
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
  let state = make_state().await;
  let (status, value) = call(&state, "POST", "/api/inscriptions", None, Some(json!([1, 2]))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(value["error"].is_string());
}

#[tokio::test]
async fn inscriptions_get_increasing_row_indexes() {
  let state = make_state().await;
  let (status, first) =
    call(&state, "POST", "/api/inscriptions", None, Some(inscription_body("a@example.fr", "Gagny"))).await;
  assert_eq!(status, StatusCode::CREATED);
  let (_, second) =
    call(&state, "POST", "/api/inscriptions", None, Some(inscription_body("b@example.fr", "Gagny"))).await;

  assert_eq!(first["inscription"]["rowIndex"], 1);
  assert_eq!(second["inscription"]["rowIndex"], 2);
}

#[tokio::test]
async fn inscription_with_unknown_formation_is_rejected() {
  let state = make_state().await;
  let mut body = inscription_body("a@example.fr", "Gagny");
  body["formationId"] = json!(42);
  let (status, _) = call(&state, "POST", "/api/inscriptions", None, Some(body)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn two_exam_submissions_share_one_client() {
  let state = make_state().await;
  let (status, first) =
    call(&state, "POST", "/api/examens", None, Some(examen_body("karim@example.fr", None))).await;
  assert_eq!(status, StatusCode::CREATED);
  let (_, second) =
    call(&state, "POST", "/api/examens", None, Some(examen_body(" Karim@Example.FR ", None))).await;

  let token = first["examen"]["token"].as_str().unwrap();
  assert_ne!(token, second["examen"]["token"].as_str().unwrap());
  assert_eq!(
    first["examen"]["url"],
    format!("https://inscriptions.example.fr/examen/{token}")
  );

  let examens = state.store.list_examens(false).await.unwrap();
  assert_eq!(examens.len(), 2);
  assert_eq!(examens[0].client_id, examens[1].client_id);
  assert!(examens.iter().all(|e| e.email == "karim@example.fr"));
}

#[tokio::test]
async fn unknown_token_is_not_found() {
  let state = make_state().await;
  let (status, _) = call(&state, "GET", "/api/examens/deadbeef", None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Candidate choice ────────────────────────────────────────────────────────

/// An admin, a future slot with room for one, an option on it and a type
/// exposing that option. Returns `(admin auth, type id, option id, slot id)`.
async fn seed_catalog(state: &AppState<SqliteStore>) -> (String, i64, i64, i64) {
  let admin = add_user(state, "admin@example.fr", Role::Admin, None).await;
  let starts = Utc::now() + Duration::days(7);

  let (status, slot) = call(
    state,
    "POST",
    "/api/admin/exam-time-slots",
    Some(&admin),
    Some(json!({
      "label":    "Samedi matin",
      "startsAt": rfc3339(starts),
      "endsAt":   rfc3339(starts + Duration::hours(3)),
      "capacity": 1,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{slot}");
  let slot_id = slot["timeSlot"]["id"].as_i64().unwrap();

  let (_, option) = call(
    state,
    "POST",
    "/api/admin/exam-options",
    Some(&admin),
    Some(json!({ "code": "A2", "label": "Niveau A2", "price": 150 })),
  )
  .await;
  let option_id = option["examOption"]["id"].as_i64().unwrap();

  let (_, exam_type) = call(
    state,
    "POST",
    "/api/admin/exam-types",
    Some(&admin),
    Some(json!({ "code": "TCF", "label": "TCF IRN" })),
  )
  .await;
  let type_id = exam_type["examType"]["id"].as_i64().unwrap();

  let (status, _) = call(
    state,
    "PUT",
    &format!("/api/admin/exam-types/{type_id}/options"),
    Some(&admin),
    Some(json!({ "ids": [option_id, option_id] })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  (admin, type_id, option_id, slot_id)
}

#[tokio::test]
async fn choice_is_recorded_once_until_reset() {
  let state = make_state().await;
  let (admin, type_id, option_id, slot_id) = seed_catalog(&state).await;

  let (_, created) =
    call(&state, "POST", "/api/examens", None, Some(examen_body("c@example.fr", Some(type_id)))).await;
  let token = created["examen"]["token"].as_str().unwrap().to_owned();
  let id = created["examen"]["id"].as_i64().unwrap();

  let (status, view) = call(&state, "GET", &format!("/api/examens/{token}"), None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(view["options"].as_array().unwrap().len(), 1);
  assert_eq!(view["timeSlots"][0]["id"], slot_id);

  let choice = json!({ "examOptionId": option_id, "timeSlotId": slot_id, "objective": "naturalisation" });
  let uri = format!("/api/examens/{token}/choice");
  let (status, chosen) = call(&state, "POST", &uri, None, Some(choice.clone())).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(chosen["examen"]["examOptionId"], option_id);

  let (status, _) = call(&state, "POST", &uri, None, Some(choice.clone())).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, reset) = call(
    &state,
    "POST",
    &format!("/api/admin/examens/{id}/reset-choice"),
    Some(&admin),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert!(reset["examen"]["choiceAt"].is_null());

  let (status, _) = call(&state, "POST", &uri, None, Some(choice)).await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn full_slot_and_foreign_option_are_refused() {
  let state = make_state().await;
  let (admin, type_id, option_id, slot_id) = seed_catalog(&state).await;

  let (_, other) = call(
    &state,
    "POST",
    "/api/admin/exam-options",
    Some(&admin),
    Some(json!({ "code": "B1", "label": "Niveau B1", "price": 180 })),
  )
  .await;
  let other_id = other["examOption"]["id"].as_i64().unwrap();

  let mut tokens = Vec::new();
  for email in ["d@example.fr", "e@example.fr"] {
    let (_, created) =
      call(&state, "POST", "/api/examens", None, Some(examen_body(email, Some(type_id)))).await;
    tokens.push(created["examen"]["token"].as_str().unwrap().to_owned());
  }

  let (status, _) = call(
    &state,
    "POST",
    &format!("/api/examens/{}/choice", tokens[0]),
    None,
    Some(json!({ "examOptionId": other_id })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let choice = json!({ "examOptionId": option_id, "timeSlotId": slot_id });
  let (status, _) =
    call(&state, "POST", &format!("/api/examens/{}/choice", tokens[0]), None, Some(choice.clone())).await;
  assert_eq!(status, StatusCode::OK);

  let (status, value) =
    call(&state, "POST", &format!("/api/examens/{}/choice", tokens[1]), None, Some(choice)).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(value["error"], "this time slot is full");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_choices_on_one_exam_record_only_one() {
  let state = make_state().await;
  let (_, type_id, option_id, _) = seed_catalog(&state).await;

  for round in 0..10 {
    let email = format!("c{round}@example.fr");
    let (_, created) =
      call(&state, "POST", "/api/examens", None, Some(examen_body(&email, Some(type_id)))).await;
    let uri = format!("/api/examens/{}/choice", created["examen"]["token"].as_str().unwrap());

    let (first, second) = tokio::join!(
      call(&state, "POST", &uri, None, Some(json!({ "examOptionId": option_id, "objective": "un" }))),
      call(&state, "POST", &uri, None, Some(json!({ "examOptionId": option_id, "objective": "deux" }))),
    );
    let mut statuses = [first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT], "round {round}");

    // The stored objective is the one the accepted request sent.
    let winner = if first.0 == StatusCode::OK { &first.1 } else { &second.1 };
    let id = created["examen"]["id"].as_i64().unwrap();
    let stored = state.store.get_examen(id).await.unwrap().unwrap();
    assert_eq!(stored.objective.as_deref(), winner["examen"]["objective"].as_str());
  }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_choices_never_overbook_a_slot() {
  let state = make_state().await;
  let (admin, type_id, option_id, _) = seed_catalog(&state).await;

  for round in 0..10 {
    let starts = Utc::now() + Duration::days(10 + round);
    let (_, slot) = call(
      &state,
      "POST",
      "/api/admin/exam-time-slots",
      Some(&admin),
      Some(json!({
        "label":    format!("Session {round}"),
        "startsAt": rfc3339(starts),
        "endsAt":   rfc3339(starts + Duration::hours(2)),
        "capacity": 1,
      })),
    )
    .await;
    let slot_id = slot["timeSlot"]["id"].as_i64().unwrap();

    let mut uris = Vec::new();
    for who in ["f", "g"] {
      let email = format!("{who}{round}@example.fr");
      let (_, created) =
        call(&state, "POST", "/api/examens", None, Some(examen_body(&email, Some(type_id)))).await;
      uris.push(format!("/api/examens/{}/choice", created["examen"]["token"].as_str().unwrap()));
    }

    let choice = json!({ "examOptionId": option_id, "timeSlotId": slot_id });
    let (first, second) = tokio::join!(
      call(&state, "POST", &uris[0], None, Some(choice.clone())),
      call(&state, "POST", &uris[1], None, Some(choice.clone())),
    );
    let mut statuses = [first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT], "round {round}");

    let booked = state
      .store
      .examens_in_window(starts - Duration::minutes(1), starts + Duration::hours(2))
      .await
      .unwrap()
      .into_iter()
      .filter(|e| e.time_slot_id == Some(slot_id))
      .count();
    assert_eq!(booked, 1, "round {round}");
  }
}

// ─── Authentication and roles ────────────────────────────────────────────────

#[tokio::test]
async fn admin_routes_require_credentials() {
  let state = make_state().await;
  add_user(&state, "staff@example.fr", Role::Staff, None).await;

  let resp = oneshot_raw(state.clone(), "GET", "/api/admin/inscriptions", None, None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let challenge = resp.headers().get(header::WWW_AUTHENTICATE).unwrap().to_str().unwrap();
  assert!(challenge.starts_with("Basic"), "challenge: {challenge}");

  let wrong = format!("Basic {}", B64.encode("staff@example.fr:mauvais"));
  let (status, _) = call(&state, "GET", "/api/admin/inscriptions", Some(&wrong), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_returns_the_caller() {
  let state = make_state().await;
  let auth = add_user(&state, "staff@example.fr", Role::Staff, None).await;
  let (status, value) = call(&state, "GET", "/api/admin/me", Some(&auth), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(value["user"]["email"], "staff@example.fr");
  assert_eq!(value["user"]["role"], "staff");
}

#[tokio::test]
async fn commercial_sees_only_their_centre() {
  let state = make_state().await;
  let commercial =
    add_user(&state, "vente@example.fr", Role::Commercial, Some(Location::Sarcelles)).await;

  for (email, location) in [("g@example.fr", "Gagny"), ("s@example.fr", "Sarcelles")] {
    call(&state, "POST", "/api/inscriptions", None, Some(inscription_body(email, location))).await;
  }

  let (status, value) = call(&state, "GET", "/api/admin/inscriptions", Some(&commercial), None).await;
  assert_eq!(status, StatusCode::OK);
  let listed = value["inscriptions"].as_array().unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0]["location"], "Sarcelles");

  // Asking for the other centre still yields only their own.
  let (_, value) =
    call(&state, "GET", "/api/admin/inscriptions?location=Gagny", Some(&commercial), None).await;
  assert_eq!(value["inscriptions"].as_array().unwrap().len(), 1);

  let (status, _) = call(&state, "GET", "/api/admin/inscriptions/1", Some(&commercial), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  for uri in ["/api/admin/examens", "/api/admin/formations", "/api/admin/users"] {
    let (status, _) = call(&state, "GET", uri, Some(&commercial), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
  }

  let (status, _) = call(
    &state,
    "PATCH",
    "/api/admin/inscriptions/2",
    Some(&commercial),
    Some(json!({ "kind": "fields", "payload": { "location": "Gagny" } })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn commercial_without_location_sees_nothing() {
  let state = make_state().await;
  let commercial = add_user(&state, "vente@example.fr", Role::Commercial, None).await;
  call(&state, "POST", "/api/inscriptions", None, Some(inscription_body("g@example.fr", "Gagny"))).await;

  let (status, value) = call(&state, "GET", "/api/admin/inscriptions", Some(&commercial), None).await;
  assert_eq!(status, StatusCode::OK);
  assert!(value["inscriptions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn staff_cannot_manage_catalog() {
  let state = make_state().await;
  let staff = add_user(&state, "staff@example.fr", Role::Staff, None).await;
  let (status, _) = call(
    &state,
    "POST",
    "/api/admin/formations",
    Some(&staff),
    Some(json!({ "name": "CACES", "duration": "35h", "price": 900 })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ─── Inscription administration ──────────────────────────────────────────────

#[tokio::test]
async fn pack_items_refuse_packs_and_unknown_ids() {
  let state = make_state().await;
  let (admin, type_id, option_id, slot_id) = seed_catalog(&state).await;

  let mut packs = Vec::new();
  for code in ["P1", "P2"] {
    let (status, pack) = call(
      &state,
      "POST",
      "/api/admin/exam-options",
      Some(&admin),
      Some(json!({ "code": code, "label": code, "price": 300, "isPack": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{pack}");
    packs.push(pack["examOption"]["id"].as_i64().unwrap());
  }
  let items_uri = format!("/api/admin/exam-options/{}/pack-items", packs[0]);

  let (status, value) =
    call(&state, "PUT", &items_uri, Some(&admin), Some(json!({ "ids": [packs[1]] }))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(value["error"].as_str().unwrap().contains("another pack"), "{value}");

  let (status, value) =
    call(&state, "PUT", &items_uri, Some(&admin), Some(json!({ "ids": [option_id, 9999] }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(value["error"], "ids: unknown exam option 9999");

  // Neither refusal touched the stored items.
  let (status, value) =
    call(&state, "PUT", &items_uri, Some(&admin), Some(json!({ "ids": [option_id] }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(value["examOption"]["packItems"], json!([option_id]));

  let (status, value) = call(
    &state,
    "PUT",
    &format!("/api/admin/exam-options/{option_id}/time-slots"),
    Some(&admin),
    Some(json!({ "ids": [slot_id, 4242] })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(value["error"], "ids: unknown time slot 4242");

  let (status, value) = call(
    &state,
    "PUT",
    &format!("/api/admin/exam-types/{type_id}/options"),
    Some(&admin),
    Some(json!({ "ids": [777] })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(value["error"], "ids: unknown exam option 777");
}

#[tokio::test]
async fn tagged_patch_updates_status_badges_and_fields() {
  let state = make_state().await;
  let staff = add_user(&state, "staff@example.fr", Role::Staff, None).await;
  call(&state, "POST", "/api/inscriptions", None, Some(inscription_body("a@example.fr", "Gagny"))).await;
  let uri = "/api/admin/inscriptions/1";

  let (status, value) = call(
    &state,
    "PATCH",
    uri,
    Some(&staff),
    Some(json!({ "kind": "status", "payload": { "status": "Validee" } })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(value["inscription"]["status"], "Validee");

  let cycle = json!({ "kind": "badge", "payload": { "badge": "paid" } });
  let (_, value) = call(&state, "PATCH", uri, Some(&staff), Some(cycle.clone())).await;
  assert_eq!(value["inscription"]["badges"]["paid"], "orange");
  let (_, value) = call(&state, "PATCH", uri, Some(&staff), Some(cycle)).await;
  assert_eq!(value["inscription"]["badges"]["paid"], "green");

  let (_, value) = call(
    &state,
    "PATCH",
    uri,
    Some(&staff),
    Some(json!({ "kind": "badge", "payload": { "badge": "contacted", "color": "green" } })),
  )
  .await;
  assert_eq!(value["inscription"]["badges"]["contacted"], "green");
  assert_eq!(value["inscription"]["badges"]["fileComplete"], "red");

  let (status, value) = call(
    &state,
    "PATCH",
    uri,
    Some(&staff),
    Some(json!({ "kind": "fields", "payload": { "city": "  Montfermeil " } })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(value["inscription"]["city"], "Montfermeil");

  let (status, _) = call(
    &state,
    "PATCH",
    uri,
    Some(&staff),
    Some(json!({ "kind": "fields", "payload": {} })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call(
    &state,
    "PATCH",
    uri,
    Some(&staff),
    Some(json!({ "kind": "unknown", "payload": {} })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_archived_inscriptions_can_be_deleted() {
  let state = make_state().await;
  let admin = add_user(&state, "admin@example.fr", Role::Admin, None).await;
  call(&state, "POST", "/api/inscriptions", None, Some(inscription_body("a@example.fr", "Gagny"))).await;
  let uri = "/api/admin/inscriptions/1";

  let (status, _) = call(&state, "DELETE", uri, Some(&admin), None).await;
  assert_eq!(status, StatusCode::CONFLICT);

  call(
    &state,
    "PATCH",
    uri,
    Some(&admin),
    Some(json!({ "kind": "status", "payload": { "status": "Archivee" } })),
  )
  .await;

  // Archived records leave the default listing but stay reachable.
  let (_, value) = call(&state, "GET", "/api/admin/inscriptions", Some(&admin), None).await;
  assert!(value["inscriptions"].as_array().unwrap().is_empty());
  let (_, value) = call(&state, "GET", "/api/admin/inscriptions?archived=true", Some(&admin), None).await;
  assert_eq!(value["inscriptions"].as_array().unwrap().len(), 1);

  let (status, value) = call(&state, "DELETE", uri, Some(&admin), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(value["deleted"], true);

  let (status, _) = call(&state, "GET", uri, Some(&admin), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn relance_batch_deduplicates_recipients() {
  let state = make_state().await;
  let staff = add_user(&state, "staff@example.fr", Role::Staff, None).await;
  for email in ["same@example.fr", "SAME@example.fr", "other@example.fr"] {
    call(&state, "POST", "/api/inscriptions", None, Some(inscription_body(email, "Gagny"))).await;
  }

  let (status, value) = call(
    &state,
    "POST",
    "/api/admin/relances",
    Some(&staff),
    Some(json!({ "rowIndexes": [1, 2, 3, 99], "note": "Dossier incomplet" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  // No webhook is configured, so nothing is delivered but relances are kept.
  assert_eq!(value["sent"], false);
  assert_eq!(value["recipients"], 2);

  let stored = state.store.get_inscription(2).await.unwrap().unwrap();
  assert_eq!(stored.relance_note.as_deref(), Some("Dossier incomplet"));
  assert!(stored.relance_at.is_some());
}

async fn state_with_webhook(url: String) -> AppState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let config = ServerConfig { webhook_url: Some(url), ..Default::default() };
  AppState::new(store, config)
}

#[tokio::test]
async fn unreachable_webhook_does_not_fail_the_batch() {
  // Nothing listens on port 1, so the connection is refused.
  let state = state_with_webhook("http://127.0.0.1:1/relance".to_owned()).await;
  let staff = add_user(&state, "staff@example.fr", Role::Staff, None).await;
  call(&state, "POST", "/api/inscriptions", None, Some(inscription_body("a@example.fr", "Gagny"))).await;

  let (status, value) = call(
    &state,
    "POST",
    "/api/admin/relances",
    Some(&staff),
    Some(json!({ "rowIndexes": [1], "note": "Pièce manquante" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(value["sent"], false);
  assert_eq!(value["recipients"], 1);

  let stored = state.store.get_inscription(1).await.unwrap().unwrap();
  assert!(stored.relance_at.is_some());
}

#[tokio::test]
async fn webhook_receives_one_recipient_per_email() {
  use std::sync::{Arc, Mutex};

  let received: Arc<Mutex<Vec<Value>>> = Arc::default();
  let sink = received.clone();
  let hook = axum::Router::new().route(
    "/relance",
    axum::routing::post(move |axum::Json(body): axum::Json<Value>| {
      let sink = sink.clone();
      async move {
        sink.lock().unwrap().push(body);
        StatusCode::NO_CONTENT
      }
    }),
  );
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move { axum::serve(listener, hook).await.unwrap() });

  let state = state_with_webhook(format!("http://{addr}/relance")).await;
  let staff = add_user(&state, "staff@example.fr", Role::Staff, None).await;
  for email in ["same@example.fr", "SAME@example.fr", "other@example.fr"] {
    call(&state, "POST", "/api/inscriptions", None, Some(inscription_body(email, "Gagny"))).await;
  }

  let (status, value) = call(
    &state,
    "POST",
    "/api/admin/relances",
    Some(&staff),
    Some(json!({ "rowIndexes": [1, 2, 3], "note": "Dossier incomplet" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(value["sent"], true);
  assert_eq!(value["recipients"], 2);

  let received = received.lock().unwrap();
  assert_eq!(received.len(), 1);
  let payload = &received[0];
  assert_eq!(payload["note"], "Dossier incomplet");
  let recipients = payload["recipients"].as_array().unwrap();
  let emails: Vec<&str> = recipients.iter().map(|r| r["email"].as_str().unwrap()).collect();
  assert_eq!(emails, ["same@example.fr", "other@example.fr"]);
  assert_eq!(recipients[0]["rowIndex"], 1);
  assert_eq!(recipients[0]["firstName"], "Amina");
}

// ─── Exams, planning and cron ────────────────────────────────────────────────

#[tokio::test]
async fn exams_are_linked_to_inscriptions_by_email() {
  let state = make_state().await;
  let staff = add_user(&state, "staff@example.fr", Role::Staff, None).await;
  call(&state, "POST", "/api/inscriptions", None, Some(inscription_body("both@example.fr", "Gagny"))).await;
  call(&state, "POST", "/api/examens", None, Some(examen_body("Both@example.fr", None))).await;
  call(&state, "POST", "/api/examens", None, Some(examen_body("solo@example.fr", None))).await;

  let (status, value) = call(&state, "GET", "/api/admin/examens", Some(&staff), None).await;
  assert_eq!(status, StatusCode::OK);
  let examens = value["examens"].as_array().unwrap();
  let solo = examens.iter().find(|e| e["email"] == "solo@example.fr").unwrap();
  let both = examens.iter().find(|e| e["email"] == "both@example.fr").unwrap();
  assert_eq!(solo["standAlone"], true);
  assert_eq!(both["inscriptionId"], 1);

  let client_id = both["clientId"].as_i64().unwrap();
  let (status, value) =
    call(&state, "GET", &format!("/api/admin/clients/{client_id}/examens"), Some(&staff), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(value["client"]["email"], "both@example.fr");
  assert_eq!(value["examens"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn planning_groups_exams_by_slot() {
  let state = make_state().await;
  let (admin, type_id, option_id, slot_id) = seed_catalog(&state).await;
  let (_, created) =
    call(&state, "POST", "/api/examens", None, Some(examen_body("p@example.fr", Some(type_id)))).await;
  let token = created["examen"]["token"].as_str().unwrap().to_owned();
  call(
    &state,
    "POST",
    &format!("/api/examens/{token}/choice"),
    None,
    Some(json!({ "examOptionId": option_id, "timeSlotId": slot_id })),
  )
  .await;

  let from = rfc3339(Utc::now());
  let to = rfc3339(Utc::now() + Duration::days(30));
  let (status, value) = call(
    &state,
    "GET",
    &format!("/api/admin/planning?from={from}&to={to}"),
    Some(&admin),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let planning = value["planning"].as_array().unwrap();
  assert_eq!(planning.len(), 1);
  assert_eq!(planning[0]["slot"]["id"], slot_id);
  assert_eq!(planning[0]["examens"][0]["token"], token.as_str());

  let (status, _) = call(
    &state,
    "GET",
    &format!("/api/admin/planning?from={to}&to={from}"),
    Some(&admin),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cron_requires_the_shared_secret() {
  let state = make_state().await;
  call(&state, "POST", "/api/examens", None, Some(examen_body("old@example.fr", None))).await;
  let uri = "/api/cron/archive-examens";

  let (status, _) = call(&state, "POST", uri, None, None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _) = call(&state, "POST", uri, Some("Bearer nope"), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let bearer = format!("Bearer {CRON_SECRET}");
  let (status, value) = call(&state, "POST", uri, Some(&bearer), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(value["archived"], 1);

  let (_, value) = call(&state, "POST", uri, Some(&bearer), None).await;
  assert_eq!(value["archived"], 0);

  assert!(state.store.list_examens(false).await.unwrap().is_empty());
}

#[tokio::test]
async fn cron_is_closed_without_a_configured_secret() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let state = AppState::new(store, ServerConfig::default());
  let (status, _) =
    call(&state, "POST", "/api/cron/archive-examens", Some("Bearer anything"), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn user_management_rules() {
  let state = make_state().await;
  let admin = add_user(&state, "admin@example.fr", Role::Admin, None).await;

  let (status, _) = call(
    &state,
    "POST",
    "/api/admin/users",
    Some(&admin),
    Some(json!({
      "email": "vente@example.fr",
      "displayName": "Vente",
      "role": "commercial",
      "password": PASSWORD,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, created) = call(
    &state,
    "POST",
    "/api/admin/users",
    Some(&admin),
    Some(json!({
      "email": "Staff@Example.fr",
      "displayName": "Équipe",
      "role": "staff",
      "password": PASSWORD,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(created["user"]["email"], "staff@example.fr");
  let id = created["user"]["id"].as_i64().unwrap();

  let (status, _) = call(
    &state,
    "PATCH",
    &format!("/api/admin/users/{id}"),
    Some(&admin),
    Some(json!({ "role": "commercial" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, value) = call(
    &state,
    "PATCH",
    &format!("/api/admin/users/{id}"),
    Some(&admin),
    Some(json!({ "role": "commercial", "location": "Gagny" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(value["user"]["location"], "Gagny");

  let (status, _) = call(
    &state,
    "POST",
    "/api/admin/users",
    Some(&admin),
    Some(json!({
      "email": "staff@example.fr",
      "displayName": "Doublon",
      "role": "staff",
      "password": PASSWORD,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  let me = state.store.get_credentials("admin@example.fr".into()).await.unwrap().unwrap().0;
  let (status, _) =
    call(&state, "DELETE", &format!("/api/admin/users/{}", me.id), Some(&admin), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call(&state, "DELETE", &format!("/api/admin/users/{id}"), Some(&admin), None).await;
  assert_eq!(status, StatusCode::OK);
}
