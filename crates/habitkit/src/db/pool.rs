// db/pool.rs
// Async connection pool using deadpool-sqlite
//
// # Access Patterns
//
// ## Reads: pool.run()
// ```ignore
// let habits = pool.run(move |conn| list_habits_sync(conn)).await?;
// ```
//
// ## Writes: pool.write()
// Every write goes through one async mutex and runs inside an IMMEDIATE
// transaction, so multi-step read-modify-write cycles on `user_stats` can
// never interleave:
// ```ignore
// let receipt = pool
//     .write(move |tx| complete_habit_sync(tx, &habit_id, day, now, &id))
//     .await?;
// ```
// The closure must be `Clone` because contention errors are retried.
//
// ## In-memory testing
// `open_in_memory()` uses a shared cache URI (`file:habitkit_xxx?mode=memory&cache=shared`)
// so every pooled connection sees the same database.

use crate::error::{HabitError, Result};
use deadpool_sqlite::{Config, Hook, Pool, Runtime};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Check if a rusqlite error is SQLITE_BUSY or SQLITE_LOCKED.
///
/// SQLITE_BUSY ("database is locked") occurs with file-based databases under write contention.
/// SQLITE_LOCKED ("database table is locked") occurs with shared-cache in-memory databases
/// when another connection holds a lock on the same table.
fn is_rusqlite_contention(err: &rusqlite::Error) -> bool {
    use rusqlite::ffi;
    matches!(
        err,
        rusqlite::Error::SqliteFailure(
            ffi::Error {
                code: ffi::ErrorCode::DatabaseBusy | ffi::ErrorCode::DatabaseLocked,
                ..
            },
            _,
        )
    )
}

/// Check if a HabitError wraps a SQLite contention error.
fn is_contention(err: &HabitError) -> bool {
    match err {
        HabitError::Db(rusqlite_err) => is_rusqlite_contention(rusqlite_err),
        _ => false,
    }
}

/// Retry delays for SQLite contention backoff (100ms, 500ms, 2s).
const RETRY_DELAYS: [std::time::Duration; 3] = [
    std::time::Duration::from_millis(100),
    std::time::Duration::from_millis(500),
    std::time::Duration::from_millis(2000),
];

/// Generic retry-with-backoff for async operations that may encounter SQLite contention.
///
/// Calls `op` up to `RETRY_DELAYS.len() + 1` times, sleeping between retries when
/// `is_retryable` returns true for the error.
async fn retry_with_backoff<F, Fut, R, E>(
    mut op: F,
    is_retryable: impl Fn(&E) -> bool,
) -> std::result::Result<R, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<R, E>>,
    E: std::fmt::Display,
{
    for (attempt, delay) in RETRY_DELAYS.iter().enumerate() {
        match op().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if is_retryable(&e) {
                    tracing::warn!(
                        "SQLite contention on attempt {}/{}, retrying in {:?}",
                        attempt + 1,
                        RETRY_DELAYS.len(),
                        delay
                    );
                    tokio::time::sleep(*delay).await;
                } else {
                    return Err(e);
                }
            }
        }
    }

    // Final attempt (no retry after this)
    op().await
}

/// Pooled SQLite store with a single write gate.
pub struct DatabasePool {
    pool: Pool,
    path: Option<PathBuf>,
    /// URI for in-memory databases (used to share state in tests)
    memory_uri: Option<String>,
    /// Serializes every write so stats read-modify-write cycles never race.
    write_gate: Mutex<()>,
}

/// Whether to use a file path or shared in-memory URI.
enum DbStorage {
    File(PathBuf),
    InMemory,
}

impl DatabasePool {
    /// Open a pooled database at the given path and bring its schema up to date.
    pub async fn open(path: &Path) -> Result<Self> {
        Self::open_internal(DbStorage::File(path.to_path_buf())).await
    }

    /// Open a pooled in-memory database.
    ///
    /// Uses a shared cache URI so all connections access the same in-memory database.
    /// Without shared cache each connection would get its own empty database.
    pub async fn open_in_memory() -> Result<Self> {
        Self::open_internal(DbStorage::InMemory).await
    }

    /// Shared constructor.
    ///
    /// 1. Creates the pool with the matching post-create hook
    /// 2. Backs up file databases that have a migration pending
    /// 3. Runs schema migrations on a pooled connection; failure is fatal
    async fn open_internal(storage: DbStorage) -> Result<Self> {
        let (conn_str, path, memory_uri, hook) = match storage {
            DbStorage::File(p) => {
                ensure_parent_directory(&p)?;
                let s = p.to_string_lossy().to_string();
                let hook = make_file_post_create_hook(p.clone());
                (s, Some(p), None, hook)
            }
            DbStorage::InMemory => {
                let uri = format!(
                    "file:habitkit_{}?mode=memory&cache=shared",
                    uuid::Uuid::new_v4().simple()
                );
                let hook = make_memory_post_create_hook();
                (uri.clone(), None, Some(uri), hook)
            }
        };

        let cfg = Config::new(&conn_str);
        let pool = cfg
            .builder(Runtime::Tokio1)
            .map_err(|e| HabitError::Pool(format!("failed to create pool builder: {e}")))?
            .max_size(4)
            .post_create(hook)
            .build()
            .map_err(|e| HabitError::Pool(format!("failed to build connection pool: {e}")))?;

        let db_pool = Self {
            pool,
            path,
            memory_uri,
            write_gate: Mutex::new(()),
        };

        if let Some(ref db_path) = db_pool.path
            && let Err(e) = Self::backup_before_migration(db_path)
        {
            tracing::warn!("Pre-migration backup failed (continuing anyway): {}", e);
        }

        db_pool.run_migrations().await?;

        Ok(db_pool)
    }

    /// Get the memory URI (for sharing state in tests)
    pub fn memory_uri(&self) -> Option<&str> {
        self.memory_uri.as_deref()
    }

    /// Get the database file path (None for in-memory).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run a closure with a connection from the pool.
    ///
    /// The closure runs on the blocking thread pool, so it won't block the
    /// async runtime. Use for reads; writes belong in [`write`](Self::write).
    pub async fn run<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        self.pool
            .get()
            .await?
            .interact(move |conn| f(conn))
            .await?
    }

    /// Like [`run`](Self::run) but with retry on SQLite contention errors.
    pub async fn run_with_retry<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R> + Send + Clone + 'static,
        R: Send + 'static,
    {
        retry_with_backoff(
            || {
                let f_clone = f.clone();
                self.run(f_clone)
            },
            is_contention,
        )
        .await
    }

    /// Run a closure inside an IMMEDIATE transaction while holding the write gate.
    ///
    /// The transaction commits only if the closure returns `Ok`; any error rolls
    /// back every statement the closure issued. Contention errors are retried
    /// with backoff while the gate stays held.
    pub async fn write<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction<'_>) -> Result<R> + Send + Clone + 'static,
        R: Send + 'static,
    {
        let _gate = self.write_gate.lock().await;
        retry_with_backoff(
            || {
                let f_clone = f.clone();
                self.transact(f_clone)
            },
            is_contention,
        )
        .await
    }

    async fn transact<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction<'_>) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        self.pool
            .get()
            .await?
            .interact(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let out = f(&tx)?;
                tx.commit()?;
                Ok(out)
            })
            .await?
    }

    /// Create a backup of the database before running migrations.
    /// Uses SQLite's VACUUM INTO for an atomic, consistent backup.
    /// Skips databases that do not exist yet or are already current.
    /// Keeps at most one backup per database (overwrites previous).
    fn backup_before_migration(path: &Path) -> Result<()> {
        use std::fs;

        if !path.exists() {
            return Ok(());
        }

        let backup_path = path.with_extension("db.pre-migration");

        // Direct connection; the pool isn't ready yet
        let conn = Connection::open(path)?;
        let version = super::schema::current_version(&conn)?;
        if version >= super::schema::latest_version() {
            return Ok(());
        }

        // VACUUM INTO fails if the target exists
        let _ = fs::remove_file(&backup_path);

        conn.execute("VACUUM INTO ?1", [backup_path.to_string_lossy().as_ref()])?;

        tracing::info!("Created pre-migration backup: {}", backup_path.display());
        Ok(())
    }

    /// Run schema migrations. Called during pool creation.
    async fn run_migrations(&self) -> Result<()> {
        let version = self
            .run(|conn| super::schema::run_all_migrations(conn))
            .await?;
        tracing::debug!(version, "Schema ready");

        if let Err(e) = self.run(|conn| Ok(conn.execute_batch("PRAGMA optimize")?)).await {
            tracing::debug!("PRAGMA optimize skipped: {}", e);
        }
        Ok(())
    }

    /// Close the pool. Idle connections are dropped; further `get()` calls fail.
    pub fn close(&self) {
        self.pool.close();
    }
}

/// Ensure parent directory exists with owner-only permissions on Unix.
fn ensure_parent_directory(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
        #[cfg(unix)]
        {
            let mut perms = std::fs::metadata(parent)?.permissions();
            perms.set_mode(0o700); // rwx------
            std::fs::set_permissions(parent, perms)?;
        }
    }
    Ok(())
}

/// Create a post_create hook for file-based databases.
///
/// Sets up PRAGMAs via `setup_connection` and restricts file permissions to 0o600.
fn make_file_post_create_hook(path: PathBuf) -> Hook {
    Hook::async_fn(move |conn, _metrics| {
        let path_for_perms = path.clone();
        Box::pin(async move {
            conn.interact(move |conn| {
                setup_connection(conn)?;

                #[cfg(unix)]
                if let Ok(metadata) = std::fs::metadata(&path_for_perms) {
                    let mut perms = metadata.permissions();
                    perms.set_mode(0o600); // rw-------
                    if let Err(e) = std::fs::set_permissions(&path_for_perms, perms) {
                        tracing::warn!("Failed to set database file permissions to 0600: {}", e);
                    }
                }
                #[cfg(not(unix))]
                let _ = &path_for_perms;

                Ok::<_, rusqlite::Error>(())
            })
            .await
            .map_err(|e| {
                deadpool_sqlite::HookError::Message(format!("interact failed: {e}").into())
            })?
            .map_err(|e| {
                deadpool_sqlite::HookError::Message(format!("connection setup failed: {e}").into())
            })
        })
    })
}

/// Create a post_create hook for in-memory databases.
///
/// Enables foreign keys and busy_timeout (WAL mode is not applicable to in-memory DBs).
fn make_memory_post_create_hook() -> Hook {
    Hook::async_fn(|conn, _metrics| {
        Box::pin(async move {
            conn.interact(|conn| {
                conn.execute_batch(
                    "PRAGMA foreign_keys=ON; \
                     PRAGMA busy_timeout=5000;",
                )?;
                Ok::<_, rusqlite::Error>(())
            })
            .await
            .map_err(|e| {
                deadpool_sqlite::HookError::Message(format!("interact failed: {e}").into())
            })?
            .map_err(|e| {
                deadpool_sqlite::HookError::Message(format!("connection setup failed: {e}").into())
            })
        })
    })
}

/// Configure a file-backed connection after it's created.
fn setup_connection(conn: &Connection) -> rusqlite::Result<()> {
    // WAL for concurrent readers, foreign keys so habits with completions
    // cannot be hard-deleted, a 5s busy window for write contention.
    conn.execute_batch(
        "PRAGMA journal_mode=WAL; \
         PRAGMA foreign_keys=ON; \
         PRAGMA busy_timeout=5000; \
         PRAGMA synchronous=NORMAL;",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pool_in_memory_shares_state_across_connections() {
        let pool = DatabasePool::open_in_memory()
            .await
            .expect("Failed to open in-memory pool");
        assert!(pool.memory_uri().is_some());
        assert!(pool.path().is_none());

        pool.write(|tx| {
            tx.execute(
                "INSERT INTO habits (id, name, color, icon, target_frequency, points, created_at)
                 VALUES ('h1', 'Read', '#fff', 'book', 7, 10, 0)",
                [],
            )?;
            Ok(())
        })
        .await
        .expect("Failed to insert");

        let name: String = pool
            .run(|conn| {
                Ok(conn.query_row("SELECT name FROM habits WHERE id = 'h1'", [], |row| {
                    row.get(0)
                })?)
            })
            .await
            .expect("Failed to query");
        assert_eq!(name, "Read");
    }

    #[tokio::test]
    async fn test_write_rolls_back_on_error() {
        let pool = DatabasePool::open_in_memory().await.unwrap();

        let result: Result<()> = pool
            .write(|tx| {
                tx.execute(
                    "INSERT INTO habits (id, name, color, icon, target_frequency, points, created_at)
                     VALUES ('h1', 'Read', '#fff', 'book', 7, 10, 0)",
                    [],
                )?;
                Err(HabitError::InvalidInput("abort".to_string()))
            })
            .await;
        assert!(matches!(result, Err(HabitError::InvalidInput(_))));

        let count: i64 = pool
            .run(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM habits", [], |r| r.get(0))?))
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_concurrent_writes_are_serialized() {
        let pool = std::sync::Arc::new(DatabasePool::open_in_memory().await.unwrap());

        let mut handles = Vec::new();
        for _ in 0..10 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                pool.write(|tx| {
                    let points: i64 = tx.query_row(
                        "SELECT total_points FROM user_stats WHERE id = 1",
                        [],
                        |r| r.get(0),
                    )?;
                    tx.execute(
                        "UPDATE user_stats SET total_points = ?1 WHERE id = 1",
                        [points + 1],
                    )?;
                    Ok(())
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().expect("write failed");
        }

        let total: i64 = pool
            .run(|conn| {
                Ok(conn.query_row("SELECT total_points FROM user_stats WHERE id = 1", [], |r| {
                    r.get(0)
                })?)
            })
            .await
            .unwrap();
        assert_eq!(total, 10);
    }

    #[tokio::test]
    async fn test_closed_pool_rejects_work() {
        let pool = DatabasePool::open_in_memory().await.unwrap();
        pool.close();
        let result = pool.run(|_conn| Ok(())).await;
        assert!(matches!(result, Err(HabitError::Pool(_))));
    }

    #[tokio::test]
    async fn test_open_file_backed_pool() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("habits.db");
        let pool = DatabasePool::open(&db_path).await.unwrap();
        assert_eq!(pool.path(), Some(db_path.as_path()));
        assert!(db_path.exists());
    }

    // ============================================================================
    // Contention detection tests
    // ============================================================================

    #[test]
    fn test_is_rusqlite_contention_busy() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ffi::ErrorCode::DatabaseBusy,
                extended_code: 5,
            },
            Some("database is locked".to_string()),
        );
        assert!(is_rusqlite_contention(&err));
        assert!(is_contention(&HabitError::Db(err)));
    }

    #[test]
    fn test_is_rusqlite_contention_other_error() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ffi::ErrorCode::ConstraintViolation,
                extended_code: 2067,
            },
            Some("UNIQUE constraint failed".to_string()),
        );
        assert!(!is_rusqlite_contention(&err));
        assert!(!is_contention(&HabitError::NotInitialized));
    }

    #[test]
    fn test_backup_before_migration_skips_nonexistent_db() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = dir.path().join("nonexistent.db");

        DatabasePool::backup_before_migration(&db_path).expect("Should succeed for nonexistent DB");

        let backup_path = db_path.with_extension("db.pre-migration");
        assert!(!backup_path.exists());
    }

    #[test]
    fn test_backup_before_migration_copies_outdated_db() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = dir.path().join("old.db");
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.execute_batch(
                "CREATE TABLE legacy (id INTEGER PRIMARY KEY, value TEXT);
                 INSERT INTO legacy (value) VALUES ('hello');",
            )
            .unwrap();
        }

        DatabasePool::backup_before_migration(&db_path).expect("Backup should succeed");

        let backup_path = db_path.with_extension("db.pre-migration");
        let conn = Connection::open(&backup_path).expect("Backup should be a valid SQLite DB");
        let value: String = conn
            .query_row("SELECT value FROM legacy WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(value, "hello");
    }
}
