use sqlx::{
    Connection, Sqlite, Transaction, pool::PoolConnection, sqlite::{
        SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
    }
};
use tokio::sync::{RwLock, RwLockReadGuard};

use std::{
    fs,
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
};

use crate::error::{Error, Result};

pub(super) struct BoardState {
    db_file: PathBuf,
    max_connections: u32,
    pool: RwLock<SqlitePool>,
}

impl std::fmt::Debug for BoardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardState")
            .field("db_file", &self.db_file)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl BoardState {
    /// Acquire a pooled connection and hold the pool read lock for the entire lifetime
    /// of the returned guard.
    pub(super) async fn conn(&self) -> Result<DbConnGuard<'_>> {
        let pool_guard = self.pool.read().await;

        // Acquire while the read lock is held; the guard keeps it held.
        let conn = pool_guard.acquire().await?;

        Ok(DbConnGuard {
            _pool_guard: pool_guard,
            conn,
        })
    }

    /// Exclusive close:
    /// - waits for all in-flight queries (because it takes a WRITE lock)
    /// - checkpoints WAL so the database file is current
    /// - closes the pool to release file handles
    pub(super) async fn close(&self) -> Result<()> {
        let pool_guard = self.pool.write().await;
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE);")
            .execute(&*pool_guard)
            .await?;
        pool_guard.close().await;
        tracing::debug!(db_file = ?self.db_file, "database closed");
        Ok(())
    }

    async fn open_pool(db_file: &Path, max_connections: u32) -> Result<SqlitePool> {
        let connect_opts = SqliteConnectOptions::new()
            .filename(db_file)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        Ok(SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_opts)
            .await?)
    }

    pub(super) async fn new<P: AsRef<Path>>(db_file: P, max_connections: u32) -> Result<Self> {
        let db_file = db_file.as_ref().to_path_buf();

        if let Some(parent) = db_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                fs::create_dir_all(parent).map_err(|e| {
                    Error::Config(format!(
                        "Failed to create database directory {:?}: {}",
                        parent, e
                    ))
                })?;
            }
        }

        let pool = Self::open_pool(&db_file, max_connections.max(1)).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!(db_file = ?db_file, "database opened");

        Ok(Self {
            db_file,
            max_connections,
            pool: RwLock::new(pool),
        })
    }
}

pub struct DbConnGuard<'a> {
    _pool_guard: RwLockReadGuard<'a, SqlitePool>,
    conn: PoolConnection<Sqlite>,
}

impl<'a> Deref for DbConnGuard<'a> {
    type Target = PoolConnection<Sqlite>;
    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl<'a> DerefMut for DbConnGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

impl<'a> DbConnGuard<'a> {
    pub(super) async fn begin_transaction(&mut self) -> Result<Transaction<'_, Sqlite>> {
        Ok(self.conn.begin().await?)
    }
}
