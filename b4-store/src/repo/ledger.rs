use crate::codec::*;
use crate::error::StoreError;
use b4_domain::{LedgerEvent, Position, Symbol};
use rusqlite::{params, Connection, OptionalExtension};
use smol_str::SmolStr;

pub struct LedgerRepo<'a> {
    conn: &'a Connection,
    read_only: bool,
}

impl<'a> LedgerRepo<'a> {
    pub fn new(conn: &'a Connection, read_only: bool) -> Self {
        Self { conn, read_only }
    }

    fn ensure_writable(&self) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnlyViolation);
        }
        Ok(())
    }

    /// Inserts the event keyed on its dedup key; a pre-existing dedup key is
    /// silently ignored (idempotent replay of the same exchange trade).
    pub fn append_event(&self, event: &LedgerEvent) -> Result<bool, StoreError> {
        self.ensure_writable()?;
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO ledger_events (
                event_id, ts, symbol, event_type, side, qty, price, fee, fee_currency,
                exchange_trade_id, client_order_id, dedup_key, meta
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
            params![
                event.event_id.as_str(),
                ts_to_sql(&event.ts),
                event.symbol.as_str(),
                ledger_event_type_to_sql(event.event_type),
                event.side.map(side_to_sql),
                dec_to_sql(event.qty),
                event.price.map(dec_to_sql),
                event.fee.map(dec_to_sql),
                event.fee_currency.as_ref().map(|s| s.as_str()),
                event.exchange_trade_id.as_ref().map(|s| s.as_str()),
                event.client_order_id.as_ref().map(|s| s.as_str()),
                event.dedup_key().as_str(),
                event.meta.to_string(),
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn existing_dedup_keys(&self) -> Result<std::collections::HashSet<SmolStr>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT dedup_key FROM ledger_events")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut set = std::collections::HashSet::new();
        for row in rows {
            set.insert(SmolStr::new(row?));
        }
        Ok(set)
    }

    /// Every stored ledger event whose sqlite `rowid` exceeds `after_rowid`,
    /// paired with that rowid — the resumable-replay input consumed by
    /// [`b4_ledger::checkpoint::load_state_incremental`].
    pub fn events_after_rowid(&self, after_rowid: i64) -> Result<Vec<(i64, LedgerEvent)>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT rowid, event_id, ts, symbol, event_type, side, qty, price, fee, fee_currency,
                    exchange_trade_id, client_order_id, meta
             FROM ledger_events WHERE rowid > ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![after_rowid], row_to_ledger_event_with_rowid)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn upsert_position(&self, position: &Position) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.conn.execute(
            "INSERT INTO positions (
                symbol, qty, avg_cost_quote, realized_pnl_quote, unrealized_pnl_quote,
                fees_paid_quote, updated_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7)
            ON CONFLICT(symbol) DO UPDATE SET
                qty=excluded.qty,
                avg_cost_quote=excluded.avg_cost_quote,
                realized_pnl_quote=excluded.realized_pnl_quote,
                unrealized_pnl_quote=excluded.unrealized_pnl_quote,
                fees_paid_quote=excluded.fees_paid_quote,
                updated_at=excluded.updated_at",
            params![
                position.symbol.as_str(),
                dec_to_sql(position.qty),
                dec_to_sql(position.avg_cost_quote),
                dec_to_sql(position.realized_pnl_quote),
                dec_to_sql(position.unrealized_pnl_quote),
                dec_to_sql(position.fees_paid_quote),
                ts_to_sql(&position.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_position(&self, symbol: &Symbol) -> Result<Option<Position>, StoreError> {
        let position = self
            .conn
            .query_row(
                "SELECT symbol, qty, avg_cost_quote, realized_pnl_quote, unrealized_pnl_quote,
                        fees_paid_quote, updated_at
                 FROM positions WHERE symbol = ?1",
                params![symbol.as_str()],
                row_to_position,
            )
            .optional()?;
        Ok(position)
    }

    pub fn all_positions(&self) -> Result<Vec<Position>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT symbol, qty, avg_cost_quote, realized_pnl_quote, unrealized_pnl_quote,
                    fees_paid_quote, updated_at
             FROM positions",
        )?;
        let rows = stmt.query_map([], row_to_position)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

fn row_to_ledger_event_with_rowid(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, LedgerEvent)> {
    let rowid: i64 = row.get(0)?;
    let symbol: String = row.get(3)?;
    let event_type: String = row.get(4)?;
    let side: Option<String> = row.get(5)?;
    let qty: String = row.get(6)?;
    let price: Option<String> = row.get(7)?;
    let fee: Option<String> = row.get(8)?;
    let ts: String = row.get(2)?;

    let event = LedgerEvent {
        event_id: SmolStr::new(row.get::<_, String>(1)?),
        ts: ts_from_sql(&ts)?,
        symbol: Symbol::new(&symbol),
        event_type: ledger_event_type_from_sql(&event_type),
        side: side.as_deref().map(side_from_sql),
        qty: dec_from_sql(&qty)?,
        price: price.map(|p| dec_from_sql(&p)).transpose()?,
        fee: fee.map(|f| dec_from_sql(&f)).transpose()?,
        fee_currency: row.get::<_, Option<String>>(9)?.map(SmolStr::new),
        exchange_trade_id: row.get::<_, Option<String>>(10)?.map(SmolStr::new),
        client_order_id: row.get::<_, Option<String>>(11)?.map(SmolStr::new),
        meta: serde_json::from_str(&row.get::<_, String>(12)?)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(12, rusqlite::types::Type::Text, Box::new(e)))?,
    };
    Ok((rowid, event))
}

fn row_to_position(row: &rusqlite::Row<'_>) -> rusqlite::Result<Position> {
    let symbol: String = row.get(0)?;
    Ok(Position {
        symbol: Symbol::new(&symbol),
        qty: dec_from_sql(&row.get::<_, String>(1)?)?,
        avg_cost_quote: dec_from_sql(&row.get::<_, String>(2)?)?,
        realized_pnl_quote: dec_from_sql(&row.get::<_, String>(3)?)?,
        unrealized_pnl_quote: dec_from_sql(&row.get::<_, String>(4)?)?,
        fees_paid_quote: dec_from_sql(&row.get::<_, String>(5)?)?,
        updated_at: ts_from_sql(&row.get::<_, String>(6)?)?,
    })
}
