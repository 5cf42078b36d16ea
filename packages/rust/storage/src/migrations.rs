//! SQL migration definitions for the eKYC database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: identity_registry, customers, onboarding_runs",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- System of record, keyed by 12-digit identity number
CREATE TABLE IF NOT EXISTS identity_registry (
    id_number  TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    dob        TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Onboarded customers (last writer wins per identity number)
CREATE TABLE IF NOT EXISTS customers (
    id_number    TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    dob          TEXT NOT NULL,
    age          INTEGER NOT NULL,
    status       TEXT NOT NULL,
    onboarded_at TEXT NOT NULL
);

-- Audit trail, one row per finished onboarding run
CREATE TABLE IF NOT EXISTS onboarding_runs (
    id              TEXT PRIMARY KEY,
    document_sha256 TEXT NOT NULL,
    stage           TEXT NOT NULL,
    code            TEXT NOT NULL,
    action          TEXT,
    token           TEXT,
    detail          TEXT,
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_runs_document ON onboarding_runs(document_sha256);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Policy text chunks with FTS5 search",
            sql: r#"
CREATE TABLE IF NOT EXISTS policy_chunks (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    source      TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    content     TEXT NOT NULL,
    indexed_at  TEXT NOT NULL,
    UNIQUE(source, chunk_index)
);

CREATE VIRTUAL TABLE IF NOT EXISTS policy_fts USING fts5(
    content,
    content=policy_chunks,
    content_rowid=id,
    tokenize='porter unicode61'
);

-- Triggers to keep FTS in sync with policy_chunks
CREATE TRIGGER IF NOT EXISTS policy_fts_insert AFTER INSERT ON policy_chunks BEGIN
    INSERT INTO policy_fts(rowid, content) VALUES (new.id, new.content);
END;

CREATE TRIGGER IF NOT EXISTS policy_fts_delete AFTER DELETE ON policy_chunks BEGIN
    INSERT INTO policy_fts(policy_fts, rowid, content) VALUES ('delete', old.id, old.content);
END;

CREATE TRIGGER IF NOT EXISTS policy_fts_update AFTER UPDATE ON policy_chunks BEGIN
    INSERT INTO policy_fts(policy_fts, rowid, content) VALUES ('delete', old.id, old.content);
    INSERT INTO policy_fts(rowid, content) VALUES (new.id, new.content);
END;

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
