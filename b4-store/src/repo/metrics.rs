use crate::codec::*;
use crate::error::StoreError;
use b4_domain::CycleMetrics;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

pub struct MetricsRepo<'a> {
    conn: &'a Connection,
    read_only: bool,
}

impl<'a> MetricsRepo<'a> {
    pub fn new(conn: &'a Connection, read_only: bool) -> Self {
        Self { conn, read_only }
    }

    fn ensure_writable(&self) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnlyViolation);
        }
        Ok(())
    }

    pub fn record_cycle_metrics(&self, metrics: &CycleMetrics) -> Result<(), StoreError> {
        self.ensure_writable()?;
        let fees_by_currency = serde_json::to_string(&metrics.fees_by_currency)?;
        self.conn.execute(
            "INSERT INTO cycle_metrics (
                cycle_id, ts_start, ts_end, mode, fills_count, orders_submitted, orders_canceled,
                rejects_count, fills_per_submitted_order, slippage_bps_avg, fees_by_currency, pnl, meta
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)
            ON CONFLICT(cycle_id) DO UPDATE SET
                ts_end=excluded.ts_end,
                fills_count=excluded.fills_count,
                orders_submitted=excluded.orders_submitted,
                orders_canceled=excluded.orders_canceled,
                rejects_count=excluded.rejects_count,
                fills_per_submitted_order=excluded.fills_per_submitted_order,
                slippage_bps_avg=excluded.slippage_bps_avg,
                fees_by_currency=excluded.fees_by_currency,
                pnl=excluded.pnl,
                meta=excluded.meta",
            params![
                metrics.cycle_id.as_str(),
                ts_to_sql(&metrics.ts_start),
                ts_to_sql(&metrics.ts_end),
                risk_mode_to_sql(metrics.mode),
                metrics.fills_count as i64,
                metrics.orders_submitted as i64,
                metrics.orders_canceled as i64,
                metrics.rejects_count as i64,
                dec_to_sql(metrics.fills_per_submitted_order),
                dec_to_sql(metrics.slippage_bps_avg),
                fees_by_currency,
                dec_to_sql(metrics.pnl),
                metrics.meta.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn record_cycle_audit(
        &self,
        cycle_id: &str,
        ts: DateTime<Utc>,
        mode_base: b4_domain::RiskMode,
        mode_final: b4_domain::RiskMode,
        fingerprint: &str,
        trace_json: &serde_json::Value,
    ) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.conn.execute(
            "INSERT INTO cycle_audit (cycle_id, ts, mode_base, mode_final, fingerprint, trace_json)
             VALUES (?1,?2,?3,?4,?5,?6)
             ON CONFLICT(cycle_id) DO UPDATE SET
                ts=excluded.ts,
                mode_base=excluded.mode_base,
                mode_final=excluded.mode_final,
                fingerprint=excluded.fingerprint,
                trace_json=excluded.trace_json",
            params![
                cycle_id,
                ts_to_sql(&ts),
                risk_mode_to_sql(mode_base),
                risk_mode_to_sql(mode_final),
                fingerprint,
                trace_json.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn record_stage7_metric(&self, cycle_id: &str, name: &str, value: &str, ts: DateTime<Utc>) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.conn.execute(
            "INSERT INTO stage7_metrics (cycle_id, name, value, ts) VALUES (?1,?2,?3,?4)",
            params![cycle_id, name, value, ts_to_sql(&ts)],
        )?;
        Ok(())
    }

    pub fn record_stage7_trace(&self, cycle_id: &str, step: &str, detail: &str, ts: DateTime<Utc>) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.conn.execute(
            "INSERT INTO stage7_trace (cycle_id, step, detail, ts) VALUES (?1,?2,?3,?4)",
            params![cycle_id, step, detail, ts_to_sql(&ts)],
        )?;
        Ok(())
    }

    pub fn get_param(&self, key: &str) -> Result<Option<String>, StoreError> {
        use rusqlite::OptionalExtension;
        let value = self
            .conn
            .query_row("SELECT value FROM stage7_params WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn set_param(&self, key: &str, value: &str, ts: DateTime<Utc>) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.conn.execute(
            "INSERT INTO stage7_params (key, value, updated_at) VALUES (?1,?2,?3)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value, updated_at=excluded.updated_at",
            params![key, value, ts_to_sql(&ts)],
        )?;
        Ok(())
    }
}
