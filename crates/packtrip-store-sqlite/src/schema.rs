//! SQL schema for the PackTrip SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `user_version` pragma.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS trips (
    trip_id      TEXT PRIMARY KEY,
    title        TEXT NOT NULL,
    destination  TEXT,
    start_date   TEXT,            -- ISO 8601 date or NULL
    end_date     TEXT,
    budget       INTEGER,
    state        TEXT NOT NULL DEFAULT 'COLLECTING_DATES',
    invite_token TEXT NOT NULL UNIQUE,
    created_at   TEXT NOT NULL    -- ISO 8601 UTC; server-assigned
);

CREATE TABLE IF NOT EXISTS users (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    username     TEXT NOT NULL UNIQUE,  -- derived from display_name
    display_name TEXT NOT NULL,
    home_city    TEXT,
    color        TEXT NOT NULL DEFAULT '#2864FF'
);

-- Exactly one row per (trip, user), maintained by upsert-on-join.
CREATE TABLE IF NOT EXISTS trip_participants (
    trip_id                    TEXT    NOT NULL REFERENCES trips(trip_id),
    user_id                    INTEGER NOT NULL REFERENCES users(id),
    role                       TEXT    NOT NULL DEFAULT 'traveler',
    is_online                  INTEGER NOT NULL DEFAULT 0,
    has_submitted_preferences  INTEGER NOT NULL DEFAULT 0,
    has_submitted_availability INTEGER NOT NULL DEFAULT 0,
    joined_at                  TEXT    NOT NULL,
    PRIMARY KEY (trip_id, user_id)
);

-- The append-only per-trip feed. Rows are never updated except to flip a
-- prompt payload's triggered flag, and only pending placeholders are ever
-- deleted.
CREATE TABLE IF NOT EXISTS messages (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    trip_id      TEXT NOT NULL REFERENCES trips(trip_id),
    user_id      INTEGER REFERENCES users(id),  -- NULL for agent/system
    kind         TEXT NOT NULL DEFAULT 'user',
    content      TEXT NOT NULL,
    payload_kind TEXT,            -- discriminant of MessagePayload variant
    payload_json TEXT,            -- full JSON payload, tag included
    timestamp    TEXT NOT NULL
);

-- At most one mark per (trip, user, date); re-submission overwrites.
CREATE TABLE IF NOT EXISTS date_availability (
    trip_id   TEXT    NOT NULL REFERENCES trips(trip_id),
    user_id   INTEGER NOT NULL REFERENCES users(id),
    date      TEXT    NOT NULL,
    available INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (trip_id, user_id, date)
);

-- Presence is the signal; the primary key is what makes votes toggleable.
CREATE TABLE IF NOT EXISTS votes (
    trip_id   TEXT    NOT NULL REFERENCES trips(trip_id),
    user_id   INTEGER NOT NULL REFERENCES users(id),
    option_id TEXT    NOT NULL,
    reaction  TEXT    NOT NULL,
    timestamp TEXT    NOT NULL,
    PRIMARY KEY (trip_id, user_id, option_id, reaction)
);

-- One row per (trip, user). The upstream design keyed this per user
-- globally, which collides across trips; keyed per pair here.
CREATE TABLE IF NOT EXISTS user_preferences (
    trip_id              TEXT    NOT NULL REFERENCES trips(trip_id),
    user_id              INTEGER NOT NULL REFERENCES users(id),
    budget_preference    TEXT,
    accommodation_type   TEXT,
    travel_style         TEXT,
    activities           TEXT,   -- JSON array or NULL
    dietary_restrictions TEXT,
    special_requirements TEXT,
    raw_preferences      TEXT NOT NULL DEFAULT '[]',  -- JSON array, append-only
    PRIMARY KEY (trip_id, user_id)
);

CREATE INDEX IF NOT EXISTS messages_trip_idx    ON messages(trip_id, timestamp);
CREATE INDEX IF NOT EXISTS messages_payload_idx ON messages(trip_id, payload_kind);
CREATE INDEX IF NOT EXISTS availability_trip_idx ON date_availability(trip_id);
CREATE INDEX IF NOT EXISTS votes_trip_idx       ON votes(trip_id);

PRAGMA user_version = 1;
";
