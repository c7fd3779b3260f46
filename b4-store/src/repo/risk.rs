use crate::codec::*;
use crate::error::StoreError;
use b4_domain::{RiskDecision, RiskMode};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

pub struct RiskRepo<'a> {
    conn: &'a Connection,
    read_only: bool,
}

#[derive(Debug, Clone)]
pub struct RiskStateCurrent {
    pub current_mode: Option<RiskMode>,
    pub peak_equity_quote: Option<rust_decimal::Decimal>,
    pub peak_equity_date: Option<DateTime<Utc>>,
    pub fees_quote_today: Option<rust_decimal::Decimal>,
    pub fees_day: Option<String>,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillSwitchRole {
    Live,
    Monitor,
}

impl KillSwitchRole {
    fn as_str(&self) -> &'static str {
        match self {
            KillSwitchRole::Live => "LIVE",
            KillSwitchRole::Monitor => "MONITOR",
        }
    }
}

impl<'a> RiskRepo<'a> {
    pub fn new(conn: &'a Connection, read_only: bool) -> Self {
        Self { conn, read_only }
    }

    fn ensure_writable(&self) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnlyViolation);
        }
        Ok(())
    }

    pub fn append_decision(&self, decision_id: &str, decision: &RiskDecision, prev_mode: Option<RiskMode>) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.conn.execute(
            "INSERT INTO risk_decisions (
                decision_id, ts, mode, reasons_json, signals_json, limits_json, decision_json, prev_mode
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
            params![
                decision_id,
                ts_to_sql(&decision.decided_at),
                risk_mode_to_sql(decision.mode),
                serde_json::to_string(&decision.reasons)?,
                decision.signals.to_string(),
                decision.limits.to_string(),
                serde_json::to_string(decision)?,
                prev_mode.map(risk_mode_to_sql),
            ],
        )?;
        Ok(())
    }

    /// The most recently appended decision, by `rowid`. Used by tests and
    /// diagnostics that need the exact reason list a cycle recorded.
    pub fn get_latest_decision(&self) -> Result<Option<RiskDecision>, StoreError> {
        let decision = self
            .conn
            .query_row(
                "SELECT decision_json FROM risk_decisions ORDER BY rowid DESC LIMIT 1",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(decision.map(|json| serde_json::from_str(&json)).transpose()?)
    }

    pub fn get_current_state(&self) -> Result<Option<RiskStateCurrent>, StoreError> {
        let state = self
            .conn
            .query_row(
                "SELECT current_mode, peak_equity_quote, peak_equity_date, fees_quote_today,
                        fees_day, cooldown_until, updated_at
                 FROM risk_state_current WHERE state_id = 1",
                [],
                |row| {
                    let mode: Option<String> = row.get(0)?;
                    let peak: Option<String> = row.get(1)?;
                    let peak_date: Option<String> = row.get(2)?;
                    let fees: Option<String> = row.get(3)?;
                    let fees_day: Option<String> = row.get(4)?;
                    let cooldown: Option<String> = row.get(5)?;
                    let updated: Option<String> = row.get(6)?;
                    Ok(RiskStateCurrent {
                        current_mode: mode.map(|m| risk_mode_from_sql(&m)),
                        peak_equity_quote: peak.map(|p| dec_from_sql(&p)).transpose()?,
                        peak_equity_date: peak_date.map(|p| ts_from_sql(&p)).transpose()?,
                        fees_quote_today: fees.map(|f| dec_from_sql(&f)).transpose()?,
                        fees_day,
                        cooldown_until: cooldown.map(|c| ts_from_sql(&c)).transpose()?,
                        updated_at: updated.map(|u| ts_from_sql(&u)).transpose()?,
                    })
                },
            )
            .optional()?;
        Ok(state)
    }

    pub fn upsert_current_state(&self, state: &RiskStateCurrent) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.conn.execute(
            "INSERT INTO risk_state_current (
                state_id, current_mode, peak_equity_quote, peak_equity_date, fees_quote_today,
                fees_day, cooldown_until, updated_at
            ) VALUES (1,?1,?2,?3,?4,?5,?6,?7)
            ON CONFLICT(state_id) DO UPDATE SET
                current_mode=excluded.current_mode,
                peak_equity_quote=excluded.peak_equity_quote,
                peak_equity_date=excluded.peak_equity_date,
                fees_quote_today=excluded.fees_quote_today,
                fees_day=excluded.fees_day,
                cooldown_until=excluded.cooldown_until,
                updated_at=excluded.updated_at",
            params![
                state.current_mode.map(risk_mode_to_sql),
                state.peak_equity_quote.map(dec_to_sql),
                state.peak_equity_date.as_ref().map(ts_to_sql),
                state.fees_quote_today.map(dec_to_sql),
                state.fees_day,
                state.cooldown_until.as_ref().map(ts_to_sql),
                state.updated_at.as_ref().map(ts_to_sql),
            ],
        )?;
        Ok(())
    }

    pub fn is_kill_switch_enabled(&self, role: KillSwitchRole) -> Result<bool, StoreError> {
        let enabled: Option<bool> = self
            .conn
            .query_row(
                "SELECT enabled FROM kill_switch WHERE role = ?1",
                params![role.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .map(|v| v != 0);
        Ok(enabled.unwrap_or(false))
    }

    pub fn set_kill_switch(&self, role: KillSwitchRole, enabled: bool, reason: Option<&str>, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.conn.execute(
            "INSERT INTO kill_switch (role, enabled, reason, consecutive_errors, updated_at)
             VALUES (?1,?2,?3,0,?4)
             ON CONFLICT(role) DO UPDATE SET
                enabled=excluded.enabled,
                reason=excluded.reason,
                updated_at=excluded.updated_at",
            params![role.as_str(), enabled as i64, reason, ts_to_sql(&now)],
        )?;
        Ok(())
    }

    pub fn record_consecutive_error(&self, role: KillSwitchRole, trip_threshold: u32, now: DateTime<Utc>) -> Result<bool, StoreError> {
        self.ensure_writable()?;
        let count: i64 = self.conn.query_row(
            "INSERT INTO kill_switch (role, enabled, reason, consecutive_errors, updated_at)
             VALUES (?1,0,NULL,1,?2)
             ON CONFLICT(role) DO UPDATE SET
                consecutive_errors = kill_switch.consecutive_errors + 1,
                updated_at = excluded.updated_at
             RETURNING consecutive_errors",
            params![role.as_str(), ts_to_sql(&now)],
            |row| row.get(0),
        )?;
        let tripped = count as u32 >= trip_threshold;
        if tripped {
            self.set_kill_switch(role, true, Some("consecutive_error_threshold"), now)?;
        }
        Ok(tripped)
    }

    pub fn clear_consecutive_errors(&self, role: KillSwitchRole, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.conn.execute(
            "UPDATE kill_switch SET consecutive_errors = 0, updated_at = ?2 WHERE role = ?1",
            params![role.as_str(), ts_to_sql(&now)],
        )?;
        Ok(())
    }
}
