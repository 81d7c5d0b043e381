//! Helpers for integration tests.

use academic_matcher::db::{DbPool, establish_connection_pool, run_migrations};
use tempfile::TempDir;

/// Temporary database used in integration tests.
pub struct TestDb {
    // Held so the database file outlives the pool.
    _dir: TempDir,
    pool: DbPool,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir.");
        let db_path = dir.path().join("test.db");

        let pool = establish_connection_pool(db_path.to_str().expect("utf-8 path"))
            .expect("Failed to establish SQLite connection.");
        let mut conn = pool
            .get()
            .expect("Failed to get SQLite connection from pool.");
        run_migrations(&mut conn).expect("Failed to run migrations.");

        TestDb { _dir: dir, pool }
    }

    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }
}
