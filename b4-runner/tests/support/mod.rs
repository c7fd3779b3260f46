//! Shared fixtures for the cycle-runner integration tests. Builds `Config`
//! directly rather than through `Config::from_env`, since the env-var path
//! is already covered by `config.rs`'s own unit tests and reading process
//! environment would serialize these tests against each other.

use b4_runner::config::{
    Config, LimitsConfig, ObservabilityConfig, PolicyConfig, SizingConfig, StorageConfig, UniverseConfig,
};
use b4_runner::config::AppRole;
use b4_domain::Symbol;
use rust_decimal_macros::dec;
use std::path::PathBuf;

pub fn live_config(db_path: PathBuf, account_key: &str) -> Config {
    Config {
        policy: PolicyConfig {
            dry_run: false,
            live_trading: true,
            live_trading_ack: "I_UNDERSTAND".into(),
            kill_switch: false,
            safe_mode: false,
            app_role: AppRole::Live,
        },
        sizing: SizingConfig {
            target_try: dec!(1000),
            offset_bps: dec!(10),
            ttl_seconds: 60,
            min_order_notional_try: dec!(25),
            notional_cap_try_per_cycle: dec!(500),
            max_notional_per_order_try: dec!(200),
            max_position_try_per_symbol: dec!(2000),
        },
        limits: LimitsConfig {
            max_orders_per_cycle: 5,
            max_open_orders_per_symbol: 2,
            cooldown_seconds: 30,
            min_profit_bps: dec!(5),
            kill_chain_max_consecutive_errors: 3,
        },
        observability: ObservabilityConfig { log_level: "info".to_string(), httpx_log_level: "warn".to_string() },
        storage: StorageConfig { state_db_path: db_path, account_key: account_key.into() },
        universe: UniverseConfig {
            symbols: vec![Symbol::new("BTCTRY")],
            quote_currency: "TRY".into(),
            allow_symbols: vec![],
            deny_symbols: vec![],
            require_same_quote: true,
            max_spread_bps: dec!(100),
            min_notional_quote: dec!(10),
            max_universe_size: 10,
        },
    }
}
