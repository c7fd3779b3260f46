use crate::error::StoreError;
use crate::repo::{LedgerRepo, MetricsRepo, OmsExtraRepo, OrdersRepo, RiskRepo};
use crate::role::ProcessRole;
use crate::schema::ensure_schema;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// A single SQLite transaction scoped to one database file. Every mutation
/// the planning/risk/OMS/ledger crates make goes through a `UnitOfWork`
/// opened for the duration of one cycle (or recovery pass); dropping it
/// without calling [`UnitOfWork::commit`] rolls the transaction back.
pub struct UnitOfWork {
    conn: Connection,
    read_only: bool,
    finished: bool,
}

impl UnitOfWork {
    /// Open a read-write transaction. Uses `BEGIN IMMEDIATE` so the write
    /// lock is acquired up front rather than on first write, matching the
    /// single-writer-per-process contract enforced by [`crate::lock::ProcessLock`].
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        ensure_schema(&conn)?;
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(Self { conn, read_only: false, finished: false })
    }

    /// Open a read-only transaction (`BEGIN DEFERRED`, monitor role). Every
    /// repo write method rejects with [`StoreError::ReadOnlyViolation`].
    pub fn open_read_only(db_path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch("BEGIN DEFERRED")?;
        Ok(Self { conn, read_only: true, finished: false })
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn orders(&self) -> OrdersRepo<'_> {
        OrdersRepo::new(&self.conn, self.read_only)
    }

    pub fn ledger(&self) -> LedgerRepo<'_> {
        LedgerRepo::new(&self.conn, self.read_only)
    }

    pub fn risk(&self) -> RiskRepo<'_> {
        RiskRepo::new(&self.conn, self.read_only)
    }

    pub fn metrics(&self) -> MetricsRepo<'_> {
        MetricsRepo::new(&self.conn, self.read_only)
    }

    pub fn oms_extra(&self) -> OmsExtraRepo<'_> {
        OmsExtraRepo::new(&self.conn, self.read_only)
    }

    pub fn register_process_instance(&self, role: ProcessRole, pid: u32, started_at: DateTime<Utc>, lock_path: &str) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnlyViolation);
        }
        self.conn.execute(
            "INSERT INTO process_instances (role, pid, started_at, lock_path) VALUES (?1,?2,?3,?4)
             ON CONFLICT(role) DO UPDATE SET pid=excluded.pid, started_at=excluded.started_at, lock_path=excluded.lock_path",
            rusqlite::params![role.as_str(), pid, started_at.to_rfc3339(), lock_path],
        )?;
        Ok(())
    }

    pub fn commit(mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("COMMIT")?;
        self.finished = true;
        Ok(())
    }

    pub fn rollback(mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("ROLLBACK")?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use b4_domain::{Position, Symbol};
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn sample_position() -> Position {
        Position {
            symbol: Symbol::new("BTCTRY"),
            qty: dec!(1.5),
            avg_cost_quote: dec!(100),
            realized_pnl_quote: dec!(0),
            unrealized_pnl_quote: dec!(0),
            fees_paid_quote: dec!(0),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn committed_writes_are_visible_in_a_new_uow() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("b4-test.db");

        let uow = UnitOfWork::open(&db_path).unwrap();
        uow.ledger().upsert_position(&sample_position()).unwrap();
        uow.commit().unwrap();

        let uow2 = UnitOfWork::open(&db_path).unwrap();
        let loaded = uow2.ledger().get_position(&Symbol::new("BTCTRY")).unwrap();
        assert!(loaded.is_some());
        uow2.rollback().unwrap();
    }

    #[test]
    fn dropped_without_commit_rolls_back() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("b4-test.db");

        {
            let uow = UnitOfWork::open(&db_path).unwrap();
            uow.ledger().upsert_position(&sample_position()).unwrap();
            // dropped here without commit
        }

        let uow2 = UnitOfWork::open(&db_path).unwrap();
        let loaded = uow2.ledger().get_position(&Symbol::new("BTCTRY")).unwrap();
        assert!(loaded.is_none());
        uow2.rollback().unwrap();
    }

    #[test]
    fn read_only_uow_rejects_writes() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("b4-test.db");

        let uow = UnitOfWork::open(&db_path).unwrap();
        uow.commit().unwrap();

        let uow2 = UnitOfWork::open_read_only(&db_path).unwrap();
        let result = uow2.ledger().upsert_position(&sample_position());
        assert!(matches!(result, Err(StoreError::ReadOnlyViolation)));
    }
}
