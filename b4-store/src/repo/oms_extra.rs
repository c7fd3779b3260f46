use crate::codec::*;
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationState {
    Reserved,
    Confirmed,
    Released,
}

impl ReservationState {
    fn as_str(&self) -> &'static str {
        match self {
            ReservationState::Reserved => "RESERVED",
            ReservationState::Confirmed => "CONFIRMED",
            ReservationState::Released => "RELEASED",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "CONFIRMED" => ReservationState::Confirmed,
            "RELEASED" => ReservationState::Released,
            _ => ReservationState::Reserved,
        }
    }
}

pub struct OmsExtraRepo<'a> {
    conn: &'a Connection,
    read_only: bool,
}

impl<'a> OmsExtraRepo<'a> {
    pub fn new(conn: &'a Connection, read_only: bool) -> Self {
        Self { conn, read_only }
    }

    fn ensure_writable(&self) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnlyViolation);
        }
        Ok(())
    }

    /// Reserve a client order id under the given payload hash. Returns
    /// `false` (no row inserted) when the id is already reserved — the
    /// caller must treat that as a duplicate submission.
    pub fn try_reserve(&self, client_order_id: &str, payload_hash: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        self.ensure_writable()?;
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO idempotency_reservations (client_order_id, payload_hash, state, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?4)",
            params![client_order_id, payload_hash, ReservationState::Reserved.as_str(), ts_to_sql(&now)],
        )?;
        Ok(inserted > 0)
    }

    pub fn get_reservation_state(&self, client_order_id: &str) -> Result<Option<ReservationState>, StoreError> {
        let state: Option<String> = self
            .conn
            .query_row(
                "SELECT state FROM idempotency_reservations WHERE client_order_id = ?1",
                params![client_order_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(state.map(|s| ReservationState::from_str(&s)))
    }

    /// Fetches the reservation's state together with the payload hash it was
    /// reserved under, so callers can distinguish a harmless resubmission
    /// from a same-id-different-payload conflict.
    pub fn get_reservation(&self, client_order_id: &str) -> Result<Option<(ReservationState, String)>, StoreError> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT state, payload_hash FROM idempotency_reservations WHERE client_order_id = ?1",
                params![client_order_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(row.map(|(state, hash)| (ReservationState::from_str(&state), hash)))
    }

    pub fn mark_confirmed(&self, client_order_id: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.conn.execute(
            "UPDATE idempotency_reservations SET state = ?2, updated_at = ?3 WHERE client_order_id = ?1",
            params![client_order_id, ReservationState::Confirmed.as_str(), ts_to_sql(&now)],
        )?;
        Ok(())
    }

    pub fn mark_released(&self, client_order_id: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.conn.execute(
            "UPDATE idempotency_reservations SET state = ?2, updated_at = ?3 WHERE client_order_id = ?1",
            params![client_order_id, ReservationState::Released.as_str(), ts_to_sql(&now)],
        )?;
        Ok(())
    }

    pub fn record_unknown_order(&self, client_order_id: &str, symbol: &str, reason: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.conn.execute(
            "INSERT OR IGNORE INTO unknown_orders (client_order_id, symbol, reason, recorded_at, resolved_at)
             VALUES (?1,?2,?3,?4,NULL)",
            params![client_order_id, symbol, reason, ts_to_sql(&now)],
        )?;
        Ok(())
    }

    pub fn resolve_unknown_order(&self, client_order_id: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.conn.execute(
            "UPDATE unknown_orders SET resolved_at = ?2 WHERE client_order_id = ?1",
            params![client_order_id, ts_to_sql(&now)],
        )?;
        Ok(())
    }

    pub fn unresolved_unknown_orders(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT client_order_id FROM unknown_orders WHERE resolved_at IS NULL")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn start_replace(
        &self,
        replace_id: &str,
        symbol: &str,
        side: b4_domain::Side,
        old_client_order_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.conn.execute(
            "INSERT INTO replace_tx (replace_id, symbol, side, old_client_order_id, new_client_order_id, state, last_error, created_at, updated_at)
             VALUES (?1,?2,?3,?4,NULL,'INIT',NULL,?5,?5)",
            params![replace_id, symbol, side_to_sql(side), old_client_order_id, ts_to_sql(&now)],
        )?;
        Ok(())
    }

    pub fn advance_replace(&self, replace_id: &str, state: &str, new_client_order_id: Option<&str>, last_error: Option<&str>, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.conn.execute(
            "UPDATE replace_tx SET state = ?2, new_client_order_id = COALESCE(?3, new_client_order_id),
                last_error = ?4, updated_at = ?5 WHERE replace_id = ?1",
            params![replace_id, state, new_client_order_id, last_error, ts_to_sql(&now)],
        )?;
        Ok(())
    }

    /// Raw stored fields of a replace-tx row: `(symbol, side, old_client_order_id,
    /// new_client_order_id, state, last_error)`.
    #[allow(clippy::type_complexity)]
    pub fn get_replace_tx(
        &self,
        replace_id: &str,
    ) -> Result<Option<(String, b4_domain::Side, String, Option<String>, String, Option<String>)>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT symbol, side, old_client_order_id, new_client_order_id, state, last_error
                 FROM replace_tx WHERE replace_id = ?1",
                params![replace_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()?;
        Ok(row.map(|(symbol, side, old_cid, new_cid, state, last_error)| {
            (symbol, side_from_sql(&side), old_cid, new_cid, state, last_error)
        }))
    }
}
