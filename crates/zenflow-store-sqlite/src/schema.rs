//! SQL schema for the ZenFlow SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS daily_plans (
    id                      TEXT PRIMARY KEY,
    user_id                 TEXT NOT NULL,
    name                    TEXT NOT NULL,
    color                   TEXT NOT NULL DEFAULT '#E8E4F3',
    emoji                   TEXT NOT NULL DEFAULT '🎯',
    duration_minutes        INTEGER NOT NULL DEFAULT 30,
    notes                   TEXT NOT NULL DEFAULT '',
    checklist               TEXT NOT NULL DEFAULT '[]',   -- JSON array
    scheduled_date          TEXT,                         -- YYYY-MM-DD
    is_anytime              INTEGER NOT NULL DEFAULT 0,
    repeat_type             TEXT NOT NULL DEFAULT 'once',
    start_time              TEXT,                         -- wall clock, e.g. '6:00 PM'
    end_time                TEXT,
    reminder_at_start       INTEGER NOT NULL DEFAULT 0,
    reminder_at_end         INTEGER NOT NULL DEFAULT 0,
    reminder_before_minutes INTEGER NOT NULL DEFAULT 0 CHECK (reminder_before_minutes >= 0),
    is_completed            INTEGER NOT NULL DEFAULT 0,
    is_skipped              INTEGER NOT NULL DEFAULT 0,
    created_at              TEXT NOT NULL,
    updated_at              TEXT NOT NULL
);

-- One row per (plan, date) occurrence of a recurring plan.
CREATE TABLE IF NOT EXISTS plan_instances (
    id            TEXT PRIMARY KEY,
    plan_id       TEXT NOT NULL REFERENCES daily_plans(id) ON DELETE CASCADE,
    user_id       TEXT NOT NULL,
    instance_date TEXT NOT NULL,                          -- YYYY-MM-DD
    is_completed  INTEGER NOT NULL DEFAULT 0,
    is_skipped    INTEGER NOT NULL DEFAULT 0,
    completed_at  TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    UNIQUE (plan_id, instance_date)
);

CREATE TABLE IF NOT EXISTS push_tokens (
    expo_push_token TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL,
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS daily_plans_user_idx      ON daily_plans(user_id);
CREATE INDEX IF NOT EXISTS daily_plans_scheduled_idx ON daily_plans(scheduled_date);
CREATE INDEX IF NOT EXISTS daily_plans_repeat_idx    ON daily_plans(repeat_type);
CREATE INDEX IF NOT EXISTS plan_instances_user_idx   ON plan_instances(user_id);
CREATE INDEX IF NOT EXISTS push_tokens_user_idx      ON push_tokens(user_id);

PRAGMA user_version = 1;
";
