//! Database Connection Management
//!
//! This module provides the database connection and schema initialization
//! for Flow Tree using libsql (embedded, SQLite-compatible).
//!
//! # Architecture
//!
//! - **Path-agnostic**: Accepts any valid PathBuf
//! - **WAL mode**: Write-Ahead Logging for better concurrency
//! - **Foreign keys**: Enabled on every connection so `ON DELETE SET NULL` fires
//! - **Idempotent schema**: `CREATE ... IF NOT EXISTS` only, safe on every start
//!
//! # Structural Guarantees in the Schema
//!
//! The service validates every reference before writing, but two rules are
//! also enforced by the store itself so a write that slips past validation
//! (for example through the check-then-write window) is rejected:
//!
//! - `left_child_id` and `right_child_id` of a row must differ (CHECK)
//! - a node id may appear in at most one row's left/right columns (triggers)
//!
//! # Database Connection Patterns
//!
//! **ALWAYS use `connect_with_timeout()` in async functions.** The busy timeout
//! lets a writer queue behind another `BEGIN IMMEDIATE` transaction instead of
//! failing immediately with `SQLITE_BUSY`.
//!
//! ```no_run
//! # use flowtree_core::db::DatabaseService;
//! # use std::path::PathBuf;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db_service = DatabaseService::new(PathBuf::from("./data/flowtree.db")).await?;
//! let conn = db_service.connect_with_timeout().await?;
//! # Ok(())
//! # }
//! ```

use crate::db::error::DatabaseError;
use libsql::{Builder, Database};
use std::path::PathBuf;
use std::sync::Arc;

/// Busy timeout applied to every connection (milliseconds)
pub const BUSY_TIMEOUT_MS: u64 = 5000;

/// Message raised by the dual-occupancy triggers
pub(crate) const CHILD_CLAIM_CONFLICT: &str = "child already claimed";

/// Database service for managing libsql connection and schema
///
/// # Examples
///
/// ```no_run
/// use flowtree_core::db::DatabaseService;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db_path = PathBuf::from("/path/to/flowtree.db");
///     let db_service = DatabaseService::new(db_path).await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

impl std::fmt::Debug for DatabaseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseService")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl DatabaseService {
    /// Create a new DatabaseService with the specified database path
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Initialize the schema (CREATE TABLE IF NOT EXISTS)
    /// 4. Enable SQLite features (WAL mode, foreign keys)
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if:
    /// - Parent directory cannot be created
    /// - Database connection fails
    /// - Schema initialization fails
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
        };

        service.initialize_schema().await?;

        tracing::debug!("Database ready at {}", service.db_path.display());

        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements may return rows, so we must use query() instead of execute().
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Initialize database schema and configuration
    ///
    /// # Schema
    ///
    /// - `number_nodes` table: one row per node, all three references are
    ///   self-referencing foreign keys with `ON DELETE SET NULL`
    /// - Indexes on workspace and each reference column
    /// - Dual-occupancy triggers on insert and on left/right updates
    async fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS number_nodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                workspace_id TEXT NOT NULL,
                value INTEGER NOT NULL,
                name TEXT,
                type TEXT CHECK (type IS NULL OR type IN ('input', 'process', 'output')),
                parent_id INTEGER REFERENCES number_nodes(id) ON DELETE SET NULL,
                left_child_id INTEGER REFERENCES number_nodes(id) ON DELETE SET NULL,
                right_child_id INTEGER REFERENCES number_nodes(id) ON DELETE SET NULL,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                CHECK (left_child_id IS NULL OR right_child_id IS NULL OR left_child_id <> right_child_id)
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!(
                "Failed to create number_nodes table: {}",
                e
            ))
        })?;

        self.create_core_indexes(&conn).await?;
        self.create_child_claim_triggers(&conn).await?;

        Ok(())
    }

    /// Create core indexes for the number_nodes table
    async fn create_core_indexes(&self, conn: &libsql::Connection) -> Result<(), DatabaseError> {
        let indexes = [
            (
                "idx_number_nodes_workspace",
                "CREATE INDEX IF NOT EXISTS idx_number_nodes_workspace ON number_nodes(workspace_id)",
            ),
            (
                "idx_number_nodes_parent",
                "CREATE INDEX IF NOT EXISTS idx_number_nodes_parent ON number_nodes(parent_id)",
            ),
            (
                "idx_number_nodes_left_child",
                "CREATE INDEX IF NOT EXISTS idx_number_nodes_left_child ON number_nodes(left_child_id)",
            ),
            (
                "idx_number_nodes_right_child",
                "CREATE INDEX IF NOT EXISTS idx_number_nodes_right_child ON number_nodes(right_child_id)",
            ),
        ];

        for (name, sql) in indexes {
            conn.execute(sql, ()).await.map_err(|e| {
                DatabaseError::initialization_failed(format!(
                    "Failed to create index '{}': {}",
                    name, e
                ))
            })?;
        }

        Ok(())
    }

    /// Create the triggers that keep each child claimed by at most one row
    ///
    /// A plain UNIQUE index cannot span two columns in the "either column"
    /// sense, so the rule is expressed as BEFORE triggers that abort the
    /// statement.
    async fn create_child_claim_triggers(
        &self,
        conn: &libsql::Connection,
    ) -> Result<(), DatabaseError> {
        let insert_trigger = format!(
            "CREATE TRIGGER IF NOT EXISTS trg_number_nodes_child_claim_insert
             BEFORE INSERT ON number_nodes
             FOR EACH ROW
             WHEN EXISTS (
                 SELECT 1 FROM number_nodes
                 WHERE (NEW.left_child_id IS NOT NULL
                        AND (left_child_id = NEW.left_child_id OR right_child_id = NEW.left_child_id))
                    OR (NEW.right_child_id IS NOT NULL
                        AND (left_child_id = NEW.right_child_id OR right_child_id = NEW.right_child_id))
             )
             BEGIN
                 SELECT RAISE(ABORT, '{}');
             END",
            CHILD_CLAIM_CONFLICT
        );

        let update_trigger = format!(
            "CREATE TRIGGER IF NOT EXISTS trg_number_nodes_child_claim_update
             BEFORE UPDATE OF left_child_id, right_child_id ON number_nodes
             FOR EACH ROW
             WHEN EXISTS (
                 SELECT 1 FROM number_nodes
                 WHERE id <> NEW.id
                   AND ((NEW.left_child_id IS NOT NULL
                         AND (left_child_id = NEW.left_child_id OR right_child_id = NEW.left_child_id))
                     OR (NEW.right_child_id IS NOT NULL
                         AND (left_child_id = NEW.right_child_id OR right_child_id = NEW.right_child_id)))
             )
             BEGIN
                 SELECT RAISE(ABORT, '{}');
             END",
            CHILD_CLAIM_CONFLICT
        );

        for (name, sql) in [
            ("trg_number_nodes_child_claim_insert", insert_trigger),
            ("trg_number_nodes_child_claim_update", update_trigger),
        ] {
            conn.execute(&sql, ()).await.map_err(|e| {
                DatabaseError::initialization_failed(format!(
                    "Failed to create trigger '{}': {}",
                    name, e
                ))
            })?;
        }

        Ok(())
    }

    /// Get a synchronous connection to the database
    ///
    /// **⚠️ WARNING**: The returned connection has no busy timeout and foreign
    /// keys disabled. Use `connect_with_timeout()` for anything that writes.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get an async connection with busy timeout and foreign keys configured
    ///
    /// **✅ RECOMMENDED**: Use this for all async functions.
    ///
    /// `foreign_keys` is a per-connection setting in SQLite, so it is applied
    /// here rather than once at schema initialization.
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(&conn, &format!("PRAGMA busy_timeout = {}", BUSY_TIMEOUT_MS))
            .await?;
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        Ok(conn)
    }
}
