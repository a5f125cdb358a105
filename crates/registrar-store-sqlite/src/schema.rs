//! SQL schema for the registrar SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS formations (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    name      TEXT    NOT NULL,
    duration  TEXT    NOT NULL,
    price     INTEGER NOT NULL,            -- euro cents
    position  INTEGER NOT NULL DEFAULT 0,
    visible   INTEGER NOT NULL DEFAULT 1
);

-- row_index is AUTOINCREMENT so a deleted index is never handed out again.
CREATE TABLE IF NOT EXISTS inscriptions (
    row_index           INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at          TEXT    NOT NULL,
    updated_at          TEXT    NOT NULL,
    civility            TEXT,
    first_name          TEXT    NOT NULL,
    last_name           TEXT    NOT NULL,
    email               TEXT    NOT NULL,  -- lowercased
    phone               TEXT    NOT NULL,
    address             TEXT,
    postal_code         TEXT    NOT NULL,
    city                TEXT    NOT NULL,
    birth_date          TEXT,              -- YYYY-MM-DD
    formation_id        INTEGER REFERENCES formations(id),
    formation_name      TEXT,
    formation_duration  TEXT,
    formation_price     INTEGER,
    location            TEXT,              -- 'Gagny' | 'Sarcelles'
    availabilities      TEXT    NOT NULL DEFAULT '[]',
    funding_mode        TEXT    NOT NULL,
    status              TEXT    NOT NULL DEFAULT 'En attente',
    badge_contacted     TEXT    NOT NULL DEFAULT 'red',
    badge_paid          TEXT    NOT NULL DEFAULT 'red',
    badge_file_complete TEXT    NOT NULL DEFAULT 'red',
    relance_note        TEXT,
    relance_at          TEXT
);

CREATE TABLE IF NOT EXISTS clients (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    email       TEXT    NOT NULL UNIQUE,   -- lowercased identity key
    first_name  TEXT    NOT NULL,
    last_name   TEXT    NOT NULL,
    phone       TEXT    NOT NULL,
    created_at  TEXT    NOT NULL,
    updated_at  TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS exam_time_slots (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    label      TEXT    NOT NULL,
    starts_at  TEXT    NOT NULL,
    ends_at    TEXT    NOT NULL,
    capacity   INTEGER,
    position   INTEGER NOT NULL DEFAULT 0,
    visible    INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS exam_options (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    code         TEXT    NOT NULL UNIQUE,
    label        TEXT    NOT NULL,
    description  TEXT,
    price        INTEGER NOT NULL,
    position     INTEGER NOT NULL DEFAULT 0,
    visible      INTEGER NOT NULL DEFAULT 1,
    is_pack      INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS exam_types (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    code      TEXT    NOT NULL UNIQUE,
    label     TEXT    NOT NULL,
    position  INTEGER NOT NULL DEFAULT 0,
    visible   INTEGER NOT NULL DEFAULT 1
);

-- Association rows disappear with their owner; a referenced target cannot be
-- deleted while the row exists.
CREATE TABLE IF NOT EXISTS exam_option_pack_items (
    pack_id  INTEGER NOT NULL REFERENCES exam_options(id) ON DELETE CASCADE,
    item_id  INTEGER NOT NULL REFERENCES exam_options(id),
    PRIMARY KEY (pack_id, item_id),
    CHECK (pack_id != item_id)
);

CREATE TABLE IF NOT EXISTS exam_option_time_slots (
    option_id  INTEGER NOT NULL REFERENCES exam_options(id) ON DELETE CASCADE,
    slot_id    INTEGER NOT NULL REFERENCES exam_time_slots(id),
    PRIMARY KEY (option_id, slot_id)
);

CREATE TABLE IF NOT EXISTS exam_type_options (
    type_id    INTEGER NOT NULL REFERENCES exam_types(id) ON DELETE CASCADE,
    option_id  INTEGER NOT NULL REFERENCES exam_options(id),
    PRIMARY KEY (type_id, option_id)
);

CREATE TABLE IF NOT EXISTS examens (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    client_id       INTEGER REFERENCES clients(id),
    token           TEXT    NOT NULL UNIQUE,
    first_name      TEXT    NOT NULL,
    last_name       TEXT    NOT NULL,
    email           TEXT    NOT NULL,
    phone           TEXT    NOT NULL,
    exam_type_id    INTEGER REFERENCES exam_types(id),
    exam_option_id  INTEGER REFERENCES exam_options(id),
    time_slot_id    INTEGER REFERENCES exam_time_slots(id),
    objective       TEXT,
    choice_at       TEXT,
    created_at      TEXT    NOT NULL,
    archived_at     TEXT
);

CREATE TABLE IF NOT EXISTS users (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    email          TEXT    NOT NULL UNIQUE,  -- lowercased
    display_name   TEXT    NOT NULL,
    role           TEXT    NOT NULL,         -- 'admin' | 'staff' | 'commercial'
    location       TEXT,
    password_hash  TEXT    NOT NULL,         -- argon2 PHC string
    created_at     TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS inscriptions_email_idx  ON inscriptions(email);
CREATE INDEX IF NOT EXISTS inscriptions_status_idx ON inscriptions(status);
CREATE INDEX IF NOT EXISTS examens_client_idx      ON examens(client_id);
CREATE INDEX IF NOT EXISTS examens_email_idx       ON examens(email);
CREATE INDEX IF NOT EXISTS examens_created_idx     ON examens(created_at);
CREATE INDEX IF NOT EXISTS examens_slot_idx        ON examens(time_slot_id);

PRAGMA user_version = 1;
";
