//! libSQL storage layer (local file mode).
//!
//! The [`Storage`] struct wraps a libSQL database holding the identity
//! registry (system of record), the customer master, the searchable policy
//! text index, and the onboarding audit trail.
//!
//! **Access rules:**
//! - onboarding runs and admin commands: read-write via [`Storage::open`]
//! - inspection commands: read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use ekyc_shared::{CustomerRecord, CustomerStatus, EkycError, IdentityRecord, Result};
use libsql::{Connection, Database, params};
use serde::{Deserialize, Serialize};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

/// A policy excerpt returned by full-text search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyExcerpt {
    /// Document the chunk was indexed from.
    pub source: String,
    /// Position of the chunk within its source.
    pub chunk_index: u32,
    /// Chunk text.
    pub content: String,
    /// FTS5 rank (lower is better).
    pub score: f64,
}

/// One finished onboarding run in the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    /// SHA-256 of the document text, hex encoded.
    pub document_sha256: String,
    /// Stage the run stopped at (`extract`, `validate`, `decide`, `dispatch`).
    pub stage: String,
    /// Final status code.
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Serialized decision token, when a decision was made.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| EkycError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| EkycError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| EkycError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| EkycError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| EkycError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    EkycError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(EkycError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Identity registry
    // -----------------------------------------------------------------------

    /// Insert or replace a registry entry.
    pub async fn upsert_identity(&self, record: &IdentityRecord) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO identity_registry (id_number, name, dob, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id_number) DO UPDATE SET
                   name = excluded.name,
                   dob = excluded.dob,
                   updated_at = excluded.updated_at",
                params![
                    record.id_number.as_str(),
                    record.name.as_str(),
                    record.dob.as_str(),
                    now.as_str()
                ],
            )
            .await
            .map_err(|e| EkycError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Upsert many registry entries. Returns the number written.
    pub async fn import_identities(&self, records: &[IdentityRecord]) -> Result<usize> {
        for record in records {
            self.upsert_identity(record).await?;
        }
        tracing::info!(count = records.len(), "imported registry entries");
        Ok(records.len())
    }

    /// Look up a registry entry by identity number.
    pub async fn lookup_identity(&self, id_number: &str) -> Result<Option<IdentityRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id_number, name, dob FROM identity_registry WHERE id_number = ?1",
                params![id_number],
            )
            .await
            .map_err(|e| EkycError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(IdentityRecord {
                id_number: row
                    .get::<String>(0)
                    .map_err(|e| EkycError::Storage(e.to_string()))?,
                name: row
                    .get::<String>(1)
                    .map_err(|e| EkycError::Storage(e.to_string()))?,
                dob: row
                    .get::<String>(2)
                    .map_err(|e| EkycError::Storage(e.to_string()))?,
            })),
            Ok(None) => Ok(None),
            Err(e) => Err(EkycError::Storage(e.to_string())),
        }
    }

    // -----------------------------------------------------------------------
    // Customers
    // -----------------------------------------------------------------------

    /// Insert a customer, overwriting any previous record with the same
    /// identity number.
    pub async fn upsert_customer(&self, customer: &CustomerRecord) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO customers (id_number, name, dob, age, status, onboarded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id_number) DO UPDATE SET
                   name = excluded.name,
                   dob = excluded.dob,
                   age = excluded.age,
                   status = excluded.status,
                   onboarded_at = excluded.onboarded_at",
                params![
                    customer.id_number.as_str(),
                    customer.name.as_str(),
                    customer.dob.as_str(),
                    i64::from(customer.age),
                    customer.status.as_str(),
                    customer.onboarded_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| EkycError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Get a customer by identity number.
    pub async fn get_customer(&self, id_number: &str) -> Result<Option<CustomerRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id_number, name, dob, age, status, onboarded_at
                 FROM customers WHERE id_number = ?1",
                params![id_number],
            )
            .await
            .map_err(|e| EkycError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_customer(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(EkycError::Storage(e.to_string())),
        }
    }

    /// List all customers, most recently onboarded first.
    pub async fn list_customers(&self) -> Result<Vec<CustomerRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id_number, name, dob, age, status, onboarded_at
                 FROM customers ORDER BY onboarded_at DESC",
                params![],
            )
            .await
            .map_err(|e| EkycError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| EkycError::Storage(e.to_string()))?
        {
            results.push(row_to_customer(&row)?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Policy index
    // -----------------------------------------------------------------------

    /// Replace all chunks of `source` with `chunks`. Returns the chunk count.
    pub async fn index_policy(&self, source: &str, chunks: &[String]) -> Result<usize> {
        self.check_writable()?;
        self.conn
            .execute(
                "DELETE FROM policy_chunks WHERE source = ?1",
                params![source],
            )
            .await
            .map_err(|e| EkycError::Storage(e.to_string()))?;

        let now = Utc::now().to_rfc3339();
        for (i, chunk) in chunks.iter().enumerate() {
            self.conn
                .execute(
                    "INSERT INTO policy_chunks (source, chunk_index, content, indexed_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![source, i as i64, chunk.as_str(), now.as_str()],
                )
                .await
                .map_err(|e| EkycError::Storage(e.to_string()))?;
        }

        tracing::info!(source, chunks = chunks.len(), "indexed policy text");
        Ok(chunks.len())
    }

    /// Full-text search over policy chunks with a natural-language query.
    ///
    /// Words of the query are OR-ed together. A query without searchable
    /// words returns no results.
    pub async fn search_policy(&self, query: &str, limit: u32) -> Result<Vec<PolicyExcerpt>> {
        let Some(fts_query) = fts_query(query) else {
            return Ok(Vec::new());
        };

        let mut rows = self
            .conn
            .query(
                "SELECT c.source, c.chunk_index, c.content, rank
                 FROM policy_fts fts
                 JOIN policy_chunks c ON c.id = fts.rowid
                 WHERE policy_fts MATCH ?1
                 ORDER BY rank
                 LIMIT ?2",
                params![fts_query, limit],
            )
            .await
            .map_err(|e| EkycError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| EkycError::Storage(e.to_string()))?
        {
            let source: String = row
                .get(0)
                .map_err(|e| EkycError::Storage(e.to_string()))?;
            let chunk_index: u32 = row.get(1).unwrap_or(0);
            let content: String = row
                .get(2)
                .map_err(|e| EkycError::Storage(e.to_string()))?;
            let score: f64 = row.get(3).unwrap_or(0.0);
            results.push(PolicyExcerpt {
                source,
                chunk_index,
                content,
                score,
            });
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Audit trail
    // -----------------------------------------------------------------------

    /// Append a finished run to the audit trail.
    pub async fn insert_run(&self, run: &RunRecord) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO onboarding_runs
                   (id, document_sha256, stage, code, action, token, detail, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    run.id.as_str(),
                    run.document_sha256.as_str(),
                    run.stage.as_str(),
                    run.code.as_str(),
                    run.action.as_deref(),
                    run.token.as_deref(),
                    run.detail.as_deref(),
                    run.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| EkycError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Most recent runs first.
    pub async fn list_runs(&self, limit: u32) -> Result<Vec<RunRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, document_sha256, stage, code, action, token, detail, created_at
                 FROM onboarding_runs ORDER BY id DESC LIMIT ?1",
                params![limit],
            )
            .await
            .map_err(|e| EkycError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| EkycError::Storage(e.to_string()))?
        {
            let created_at: String = row
                .get(7)
                .map_err(|e| EkycError::Storage(e.to_string()))?;
            results.push(RunRecord {
                id: row
                    .get(0)
                    .map_err(|e| EkycError::Storage(e.to_string()))?,
                document_sha256: row
                    .get(1)
                    .map_err(|e| EkycError::Storage(e.to_string()))?,
                stage: row
                    .get(2)
                    .map_err(|e| EkycError::Storage(e.to_string()))?,
                code: row
                    .get(3)
                    .map_err(|e| EkycError::Storage(e.to_string()))?,
                action: row.get(4).ok(),
                token: row.get(5).ok(),
                detail: row.get(6).ok(),
                created_at: parse_timestamp(&created_at)?,
            });
        }
        Ok(results)
    }
}

/// Question words and fillers left out of policy queries.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "be", "can", "do", "does", "for", "how", "if", "in", "is", "it",
    "of", "on", "or", "the", "to", "what", "when", "which", "who", "with",
];

/// Turn free text into an FTS5 OR query of quoted words, without stop words.
fn fts_query(text: &str) -> Option<String> {
    let terms: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .map(|w| format!("\"{w}\""))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EkycError::Storage(format!("bad timestamp {s:?}: {e}")))
}

/// Convert a libsql Row to a CustomerRecord.
fn row_to_customer(row: &libsql::Row) -> Result<CustomerRecord> {
    let status: String = row
        .get(4)
        .map_err(|e| EkycError::Storage(e.to_string()))?;
    let status = match status.as_str() {
        "ONBOARDED" => CustomerStatus::Onboarded,
        other => {
            return Err(EkycError::Storage(format!(
                "unknown customer status {other:?}"
            )));
        }
    };
    let onboarded_at: String = row
        .get(5)
        .map_err(|e| EkycError::Storage(e.to_string()))?;

    Ok(CustomerRecord {
        id_number: row
            .get::<String>(0)
            .map_err(|e| EkycError::Storage(e.to_string()))?,
        name: row
            .get::<String>(1)
            .map_err(|e| EkycError::Storage(e.to_string()))?,
        dob: row
            .get::<String>(2)
            .map_err(|e| EkycError::Storage(e.to_string()))?,
        age: i32::try_from(
            row.get::<i64>(3)
                .map_err(|e| EkycError::Storage(e.to_string()))?,
        )
        .map_err(|e| EkycError::Storage(format!("customer age out of range: {e}")))?,
        status,
        onboarded_at: parse_timestamp(&onboarded_at)?,
    })
}
