use rusqlite::Connection;

/// Creates every table the store owns if it does not already exist. Called
/// once per connection on [`crate::uow::UnitOfWork`] entry — cheap no-op on
/// a warm database.
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS ledger_events (
            event_id TEXT PRIMARY KEY,
            ts TEXT NOT NULL,
            symbol TEXT NOT NULL,
            event_type TEXT NOT NULL,
            side TEXT,
            qty TEXT NOT NULL,
            price TEXT,
            fee TEXT,
            fee_currency TEXT,
            exchange_trade_id TEXT,
            client_order_id TEXT,
            dedup_key TEXT NOT NULL UNIQUE,
            meta TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS orders (
            order_id TEXT PRIMARY KEY,
            client_order_id TEXT NOT NULL UNIQUE,
            exchange_order_id TEXT,
            symbol TEXT NOT NULL,
            side TEXT NOT NULL,
            order_type TEXT NOT NULL,
            price TEXT NOT NULL,
            qty TEXT NOT NULL,
            filled_qty TEXT NOT NULL,
            avg_fill_price TEXT,
            status TEXT NOT NULL,
            last_update TEXT NOT NULL,
            intent_hash TEXT NOT NULL,
            mode TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS order_events (
            event_id TEXT PRIMARY KEY,
            ts TEXT NOT NULL,
            client_order_id TEXT NOT NULL,
            order_id TEXT,
            event_type TEXT NOT NULL,
            payload TEXT NOT NULL,
            cycle_id TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS positions (
            symbol TEXT PRIMARY KEY,
            qty TEXT NOT NULL,
            avg_cost_quote TEXT NOT NULL,
            realized_pnl_quote TEXT NOT NULL,
            unrealized_pnl_quote TEXT NOT NULL,
            fees_paid_quote TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS intents (
            intent_id TEXT PRIMARY KEY,
            cycle_id TEXT NOT NULL,
            symbol TEXT NOT NULL,
            side TEXT NOT NULL,
            qty TEXT NOT NULL,
            limit_price TEXT,
            reason TEXT NOT NULL,
            confidence TEXT NOT NULL,
            idempotency_key TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cycle_metrics (
            cycle_id TEXT PRIMARY KEY,
            ts_start TEXT NOT NULL,
            ts_end TEXT NOT NULL,
            mode TEXT NOT NULL,
            fills_count INTEGER NOT NULL,
            orders_submitted INTEGER NOT NULL,
            orders_canceled INTEGER NOT NULL,
            rejects_count INTEGER NOT NULL,
            fills_per_submitted_order TEXT NOT NULL,
            slippage_bps_avg TEXT NOT NULL,
            fees_by_currency TEXT NOT NULL,
            pnl TEXT NOT NULL,
            meta TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cycle_audit (
            cycle_id TEXT PRIMARY KEY,
            ts TEXT NOT NULL,
            mode_base TEXT NOT NULL,
            mode_final TEXT NOT NULL,
            fingerprint TEXT NOT NULL,
            trace_json TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS risk_decisions (
            decision_id TEXT PRIMARY KEY,
            ts TEXT NOT NULL,
            mode TEXT NOT NULL,
            reasons_json TEXT NOT NULL,
            signals_json TEXT NOT NULL,
            limits_json TEXT NOT NULL,
            decision_json TEXT NOT NULL,
            prev_mode TEXT
        );

        CREATE TABLE IF NOT EXISTS risk_state_current (
            state_id INTEGER PRIMARY KEY CHECK (state_id = 1),
            current_mode TEXT,
            peak_equity_quote TEXT,
            peak_equity_date TEXT,
            fees_quote_today TEXT,
            fees_day TEXT,
            cooldown_until TEXT,
            updated_at TEXT
        );

        CREATE TABLE IF NOT EXISTS idempotency_reservations (
            client_order_id TEXT PRIMARY KEY,
            payload_hash TEXT NOT NULL,
            state TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS kill_switch (
            role TEXT PRIMARY KEY,
            enabled INTEGER NOT NULL,
            reason TEXT,
            consecutive_errors INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS stage7_params (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS stage7_metrics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            cycle_id TEXT NOT NULL,
            name TEXT NOT NULL,
            value TEXT NOT NULL,
            ts TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS stage7_trace (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            cycle_id TEXT NOT NULL,
            step TEXT NOT NULL,
            detail TEXT NOT NULL,
            ts TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS process_instances (
            role TEXT PRIMARY KEY,
            pid INTEGER NOT NULL,
            started_at TEXT NOT NULL,
            lock_path TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS replace_tx (
            replace_id TEXT PRIMARY KEY,
            symbol TEXT NOT NULL,
            side TEXT NOT NULL,
            old_client_order_id TEXT NOT NULL,
            new_client_order_id TEXT,
            state TEXT NOT NULL,
            last_error TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS unknown_orders (
            client_order_id TEXT PRIMARY KEY,
            symbol TEXT NOT NULL,
            reason TEXT NOT NULL,
            recorded_at TEXT NOT NULL,
            resolved_at TEXT
        );
        "#,
    )
}
