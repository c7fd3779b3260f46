use crate::codec::*;
use crate::error::StoreError;
use b4_domain::{Order, OrderEvent, Symbol};
use rusqlite::{params, Connection, OptionalExtension};
use smol_str::SmolStr;

pub struct OrdersRepo<'a> {
    conn: &'a Connection,
    read_only: bool,
}

impl<'a> OrdersRepo<'a> {
    pub fn new(conn: &'a Connection, read_only: bool) -> Self {
        Self { conn, read_only }
    }

    fn ensure_writable(&self) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnlyViolation);
        }
        Ok(())
    }

    pub fn upsert_order(&self, order: &Order) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.conn.execute(
            "INSERT INTO orders (
                order_id, client_order_id, exchange_order_id, symbol, side, order_type,
                price, qty, filled_qty, avg_fill_price, status, last_update, intent_hash, mode
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)
            ON CONFLICT(order_id) DO UPDATE SET
                exchange_order_id=excluded.exchange_order_id,
                filled_qty=excluded.filled_qty,
                avg_fill_price=excluded.avg_fill_price,
                status=excluded.status,
                last_update=excluded.last_update,
                mode=excluded.mode",
            params![
                order.order_id.as_str(),
                order.client_order_id.as_str(),
                order.exchange_order_id.as_ref().map(|s| s.as_str()),
                order.symbol.as_str(),
                side_to_sql(order.side),
                order_type_to_sql(order.order_type),
                dec_to_sql(order.price),
                dec_to_sql(order.qty),
                dec_to_sql(order.filled_qty),
                order.avg_fill_price.map(dec_to_sql),
                order_status_to_sql(order.status),
                ts_to_sql(&order.last_update),
                order.intent_hash.as_str(),
                mode_to_sql(order.mode),
            ],
        )?;
        Ok(())
    }

    pub fn get_by_client_order_id(&self, client_order_id: &str) -> Result<Option<Order>, StoreError> {
        let order = self
            .conn
            .query_row(
                "SELECT order_id, client_order_id, exchange_order_id, symbol, side, order_type,
                        price, qty, filled_qty, avg_fill_price, status, last_update, intent_hash, mode
                 FROM orders WHERE client_order_id = ?1",
                params![client_order_id],
                row_to_order,
            )
            .optional()?;
        Ok(order)
    }

    pub fn open_orders_count_by_symbol(&self, symbol: &Symbol) -> Result<u32, StoreError> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM orders WHERE symbol = ?1 AND status IN ('PLANNED','SUBMITTED','ACKED','PARTIALLY_FILLED')",
            params![symbol.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Every order still in a non-terminal status, across all symbols — the
    /// `db_open_orders` input to [`crate::StoreError`]-free reconciliation
    /// (`b4_oms::reconcile::reconcile_open_orders`).
    pub fn list_open_orders(&self) -> Result<Vec<Order>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT order_id, client_order_id, exchange_order_id, symbol, side, order_type,
                    price, qty, filled_qty, avg_fill_price, status, last_update, intent_hash, mode
             FROM orders WHERE status IN ('PLANNED','SUBMITTED','ACKED','PARTIALLY_FILLED')",
        )?;
        let rows = stmt.query_map([], row_to_order)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Orders left in `PLANNED`/`SUBMITTED` with no recorded completion —
    /// the crash-recovery input for [`crate::StoreError`]-free startup
    /// reconciliation (spec §4.H "Crash recovery").
    pub fn list_in_flight(&self) -> Result<Vec<Order>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT order_id, client_order_id, exchange_order_id, symbol, side, order_type,
                    price, qty, filled_qty, avg_fill_price, status, last_update, intent_hash, mode
             FROM orders WHERE status IN ('PLANNED','SUBMITTED')",
        )?;
        let rows = stmt.query_map([], row_to_order)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn append_event(&self, event: &OrderEvent) -> Result<bool, StoreError> {
        self.ensure_writable()?;
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO order_events (event_id, ts, client_order_id, order_id, event_type, payload, cycle_id)
             VALUES (?1,?2,?3,?4,?5,?6,?7)",
            params![
                event.event_id.as_str(),
                ts_to_sql(&event.ts),
                event.client_order_id.as_str(),
                event.order_id.as_ref().map(|s| s.as_str()),
                order_event_type_to_sql(event.event_type),
                event.payload.to_string(),
                event.cycle_id.as_str(),
            ],
        )?;
        Ok(changed > 0)
    }

    /// Events for one order in insertion order, as recorded by `rowid`.
    /// Used by reconciliation diagnostics and by tests asserting the
    /// lifecycle event sequence a cycle produced.
    pub fn list_events_for_order(&self, client_order_id: &str) -> Result<Vec<OrderEvent>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id, ts, client_order_id, order_id, event_type, payload, cycle_id
             FROM order_events WHERE client_order_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![client_order_id], row_to_event)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<OrderEvent> {
    let event_id: String = row.get(0)?;
    let ts: String = row.get(1)?;
    let client_order_id: String = row.get(2)?;
    let order_id: Option<String> = row.get(3)?;
    let event_type: String = row.get(4)?;
    let payload: String = row.get(5)?;
    let cycle_id: String = row.get(6)?;
    Ok(OrderEvent {
        event_id: event_id.into(),
        ts: ts_from_sql(&ts)?,
        client_order_id: client_order_id.into(),
        order_id: order_id.map(Into::into),
        event_type: order_event_type_from_sql(&event_type),
        payload: serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null),
        cycle_id: cycle_id.into(),
    })
}

fn row_to_order(row: &rusqlite::Row<'_>) -> rusqlite::Result<Order> {
    let symbol: String = row.get(3)?;
    let price_str: String = row.get(6)?;
    let qty_str: String = row.get(7)?;
    let filled_str: String = row.get(8)?;
    let avg_str: Option<String> = row.get(9)?;
    let last_update_str: String = row.get(11)?;

    Ok(Order {
        order_id: SmolStr::new(row.get::<_, String>(0)?),
        client_order_id: SmolStr::new(row.get::<_, String>(1)?),
        exchange_order_id: row.get::<_, Option<String>>(2)?.map(SmolStr::new),
        symbol: Symbol::new(&symbol),
        side: side_from_sql(&row.get::<_, String>(4)?),
        order_type: order_type_from_sql(&row.get::<_, String>(5)?),
        price: dec_from_sql(&price_str)?,
        qty: dec_from_sql(&qty_str)?,
        filled_qty: dec_from_sql(&filled_str)?,
        avg_fill_price: avg_str.map(|s| dec_from_sql(&s)).transpose()?,
        status: order_status_from_sql(&row.get::<_, String>(10)?),
        last_update: ts_from_sql(&last_update_str)?,
        intent_hash: SmolStr::new(row.get::<_, String>(12)?),
        mode: mode_from_sql(&row.get::<_, String>(13)?),
    })
}
