use std::sync::Arc;

use copytrail::adapter::outbound::sqlite::{
    create_pool, run_migrations, DbPool, SqliteDedupLedger, SqliteDirectory,
    SqliteSettlementLedger,
};
use tempfile::TempDir;

/// Temporary migrated SQLite database for integration tests.
pub struct TempDb {
    _dir: TempDir,
    pool: DbPool,
}

impl TempDb {
    pub fn create(name: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join(format!("{name}.db"));
        let pool = create_pool(path.to_str().expect("utf-8 temp path")).expect("create pool");
        run_migrations(&pool).expect("run migrations");
        Self { _dir: dir, pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn dedup(&self) -> Arc<SqliteDedupLedger> {
        Arc::new(SqliteDedupLedger::new(self.pool.clone()))
    }

    pub fn settlements(&self) -> Arc<SqliteSettlementLedger> {
        Arc::new(SqliteSettlementLedger::new(self.pool.clone()))
    }

    pub fn directory(&self) -> Arc<SqliteDirectory> {
        Arc::new(SqliteDirectory::new(self.pool.clone()))
    }
}
