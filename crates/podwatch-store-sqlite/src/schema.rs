//! SQL schema for the podwatch SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per tracked show. `known_episodes` only ever grows and
-- `last_check` only ever moves forward; both are enforced in `update`.
CREATE TABLE IF NOT EXISTS tracked_shows (
    show_id         TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    publisher       TEXT NOT NULL,
    external_url    TEXT,
    known_episodes  TEXT NOT NULL DEFAULT '[]',   -- JSON array of episodes
    last_check      TEXT,                         -- fixed-width RFC 3339 UTC; NULL until bootstrap
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subscribers (
    show_id        TEXT NOT NULL REFERENCES tracked_shows(show_id),
    subscriber_id  TEXT NOT NULL,
    subscribed_at  TEXT NOT NULL,
    PRIMARY KEY (show_id, subscriber_id)
);

CREATE INDEX IF NOT EXISTS tracked_shows_last_check_idx ON tracked_shows(last_check);

PRAGMA user_version = 1;
";
