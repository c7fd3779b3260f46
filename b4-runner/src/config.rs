//! Process-wide configuration, read once from the environment at startup.
//!
//! Every variable in this module is required; there are no hidden defaults.
//! A variable that is absent or fails to parse is `ConfigError`, not a
//! silently-substituted value (grounded in
//! `original_source/tests/test_config_symbol_parsing.py` — even list-shaped
//! variables like `SYMBOLS` must be present, just possibly empty).

use b4_domain::{normalize_symbol, Symbol};
use rust_decimal::Decimal;
use smol_str::SmolStr;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },
}

fn read_var(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingVar(key.to_string()))
}

fn parse_bool(key: &str) -> Result<bool, ConfigError> {
    let raw = read_var(key)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            var: key.to_string(),
            reason: format!("expected a boolean, got {other:?}"),
        }),
    }
}

fn parse_decimal(key: &str) -> Result<Decimal, ConfigError> {
    let raw = read_var(key)?;
    Decimal::from_str(raw.trim()).map_err(|e| ConfigError::InvalidValue {
        var: key.to_string(),
        reason: e.to_string(),
    })
}

fn parse_u64(key: &str) -> Result<u64, ConfigError> {
    let raw = read_var(key)?;
    raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidValue {
        var: key.to_string(),
        reason: e.to_string(),
    })
}

fn parse_usize(key: &str) -> Result<usize, ConfigError> {
    let raw = read_var(key)?;
    raw.trim().parse::<usize>().map_err(|e| ConfigError::InvalidValue {
        var: key.to_string(),
        reason: e.to_string(),
    })
}

fn parse_i64(key: &str) -> Result<i64, ConfigError> {
    let raw = read_var(key)?;
    raw.trim().parse::<i64>().map_err(|e| ConfigError::InvalidValue {
        var: key.to_string(),
        reason: e.to_string(),
    })
}

/// Parses a symbol list from either a CSV string or a JSON array, uppercases
/// and strips separators via [`normalize_symbol`], dedupes preserving
/// first-seen order, and treats an empty string as an empty (not missing)
/// list. Mirrors `Settings.symbols`/`Settings.universe_allow_symbols`.
fn parse_symbol_list(key: &str) -> Result<Vec<Symbol>, ConfigError> {
    let raw = read_var(key)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let raw_entries: Vec<String> = if trimmed.starts_with('[') {
        let value: serde_json::Value = serde_json::from_str(trimmed).map_err(|e| ConfigError::InvalidValue {
            var: key.to_string(),
            reason: format!("invalid JSON: {e}"),
        })?;
        let arr = value.as_array().ok_or_else(|| ConfigError::InvalidValue {
            var: key.to_string(),
            reason: "JSON value must be a list".to_string(),
        })?;
        arr.iter()
            .map(|v| {
                v.as_str().map(str::to_string).ok_or_else(|| ConfigError::InvalidValue {
                    var: key.to_string(),
                    reason: "JSON list entries must be strings".to_string(),
                })
            })
            .collect::<Result<_, _>>()?
    } else {
        trimmed.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
    };

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for entry in raw_entries {
        let normalized = normalize_symbol(&entry);
        if seen.insert(normalized.clone()) {
            out.push(Symbol::new(normalized));
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppRole {
    Live,
    Monitor,
}

impl AppRole {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "LIVE" => Ok(AppRole::Live),
            "MONITOR" => Ok(AppRole::Monitor),
            other => Err(ConfigError::InvalidValue {
                var: "APP_ROLE".to_string(),
                reason: format!("expected LIVE or MONITOR, got {other:?}"),
            }),
        }
    }

    /// Bridges to the store's path-naming role, which is deliberately a
    /// distinct type from both this enum and [`b4_risk::side_effect::ProcessRole`] —
    /// each governs a different boundary (db filename convention, runtime
    /// side-effect permission).
    pub fn to_store_role(self) -> b4_store::ProcessRole {
        match self {
            AppRole::Live => b4_store::ProcessRole::Live,
            AppRole::Monitor => b4_store::ProcessRole::Monitor,
        }
    }

    pub fn to_side_effect_role(self) -> b4_risk::side_effect::ProcessRole {
        match self {
            AppRole::Live => b4_risk::side_effect::ProcessRole::Live,
            AppRole::Monitor => b4_risk::side_effect::ProcessRole::Monitor,
        }
    }

    pub fn to_kill_switch_role(self) -> b4_store::repo::KillSwitchRole {
        match self {
            AppRole::Live => b4_store::repo::KillSwitchRole::Live,
            AppRole::Monitor => b4_store::repo::KillSwitchRole::Monitor,
        }
    }
}

/// `DRY_RUN`, `LIVE_TRADING`, `LIVE_TRADING_ACK`, `KILL_SWITCH`, `SAFE_MODE`,
/// `APP_ROLE`.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub dry_run: bool,
    pub live_trading: bool,
    pub live_trading_ack: SmolStr,
    pub kill_switch: bool,
    pub safe_mode: bool,
    pub app_role: AppRole,
}

/// `TARGET_TRY`, `OFFSET_BPS`, `TTL_SECONDS`, `MIN_ORDER_NOTIONAL_TRY`,
/// `NOTIONAL_CAP_TRY_PER_CYCLE`, `MAX_NOTIONAL_PER_ORDER_TRY`,
/// `MAX_POSITION_TRY_PER_SYMBOL`.
#[derive(Debug, Clone)]
pub struct SizingConfig {
    pub target_try: Decimal,
    pub offset_bps: Decimal,
    pub ttl_seconds: u64,
    pub min_order_notional_try: Decimal,
    pub notional_cap_try_per_cycle: Decimal,
    pub max_notional_per_order_try: Decimal,
    pub max_position_try_per_symbol: Decimal,
}

/// `MAX_ORDERS_PER_CYCLE`, `MAX_OPEN_ORDERS_PER_SYMBOL`, `COOLDOWN_SECONDS`,
/// `MIN_PROFIT_BPS`, `KILL_CHAIN_MAX_CONSECUTIVE_ERRORS`.
#[derive(Debug, Clone)]
pub struct LimitsConfig {
    pub max_orders_per_cycle: usize,
    pub max_open_orders_per_symbol: usize,
    pub cooldown_seconds: i64,
    pub min_profit_bps: Decimal,
    pub kill_chain_max_consecutive_errors: u32,
}

/// `LOG_LEVEL`, `HTTPX_LOG_LEVEL`.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub httpx_log_level: String,
}

/// `STATE_DB_PATH` — absolute, ends `.db`, must contain the role's path
/// fragment (enforced by [`b4_store::ProcessRole::assert_db_path_convention`]
/// at lock-acquisition time, not here). `ACCOUNT_KEY` identifies the trading
/// account for process-lock keying (`sha256(state_db_path|account_key)`);
/// required, since two accounts pointed at the same path would otherwise
/// collide under one lock.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub state_db_path: PathBuf,
    pub account_key: SmolStr,
}

/// `SYMBOLS`, `UNIVERSE_QUOTE_CCY`, `UNIVERSE_ALLOW_SYMBOLS`,
/// `UNIVERSE_DENY_SYMBOLS`, `UNIVERSE_REQUIRE_SAME_QUOTE`,
/// `UNIVERSE_MAX_SPREAD_BPS`, `UNIVERSE_MIN_NOTIONAL_QUOTE`,
/// `UNIVERSE_MAX_SIZE`.
#[derive(Debug, Clone)]
pub struct UniverseConfig {
    pub symbols: Vec<Symbol>,
    pub quote_currency: SmolStr,
    pub allow_symbols: Vec<Symbol>,
    pub deny_symbols: Vec<Symbol>,
    pub require_same_quote: bool,
    pub max_spread_bps: Decimal,
    pub min_notional_quote: Decimal,
    pub max_universe_size: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub policy: PolicyConfig,
    pub sizing: SizingConfig,
    pub limits: LimitsConfig,
    pub observability: ObservabilityConfig,
    pub storage: StorageConfig,
    pub universe: UniverseConfig,
}

impl Config {
    /// Reads every variable documented on this module's field groups.
    /// Does not load a `.env` file itself — call [`dotenvy::dotenv`] or
    /// [`dotenvy::from_path`] before this if a dotenv file is in play.
    pub fn from_env() -> Result<Self, ConfigError> {
        let app_role = AppRole::parse(&read_var("APP_ROLE")?)?;

        let policy = PolicyConfig {
            dry_run: parse_bool("DRY_RUN")?,
            live_trading: parse_bool("LIVE_TRADING")?,
            live_trading_ack: read_var("LIVE_TRADING_ACK")?.into(),
            kill_switch: parse_bool("KILL_SWITCH")?,
            safe_mode: parse_bool("SAFE_MODE")?,
            app_role,
        };

        let sizing = SizingConfig {
            target_try: parse_decimal("TARGET_TRY")?,
            offset_bps: parse_decimal("OFFSET_BPS")?,
            ttl_seconds: parse_u64("TTL_SECONDS")?,
            min_order_notional_try: parse_decimal("MIN_ORDER_NOTIONAL_TRY")?,
            notional_cap_try_per_cycle: parse_decimal("NOTIONAL_CAP_TRY_PER_CYCLE")?,
            max_notional_per_order_try: parse_decimal("MAX_NOTIONAL_PER_ORDER_TRY")?,
            max_position_try_per_symbol: parse_decimal("MAX_POSITION_TRY_PER_SYMBOL")?,
        };

        let limits = LimitsConfig {
            max_orders_per_cycle: parse_usize("MAX_ORDERS_PER_CYCLE")?,
            max_open_orders_per_symbol: parse_usize("MAX_OPEN_ORDERS_PER_SYMBOL")?,
            cooldown_seconds: parse_i64("COOLDOWN_SECONDS")?,
            min_profit_bps: parse_decimal("MIN_PROFIT_BPS")?,
            kill_chain_max_consecutive_errors: parse_u64("KILL_CHAIN_MAX_CONSECUTIVE_ERRORS")? as u32,
        };

        let observability =
            ObservabilityConfig { log_level: read_var("LOG_LEVEL")?, httpx_log_level: read_var("HTTPX_LOG_LEVEL")? };

        let state_db_path = PathBuf::from(read_var("STATE_DB_PATH")?);
        if !state_db_path.is_absolute() {
            return Err(ConfigError::InvalidValue {
                var: "STATE_DB_PATH".to_string(),
                reason: "must be an absolute path".to_string(),
            });
        }
        if state_db_path.extension().and_then(|e| e.to_str()) != Some("db") {
            return Err(ConfigError::InvalidValue {
                var: "STATE_DB_PATH".to_string(),
                reason: "must end with .db".to_string(),
            });
        }
        let account_key = read_var("ACCOUNT_KEY")?.into();
        let storage = StorageConfig { state_db_path, account_key };

        let universe = UniverseConfig {
            symbols: parse_symbol_list("SYMBOLS")?,
            quote_currency: read_var("UNIVERSE_QUOTE_CCY")?.into(),
            allow_symbols: parse_symbol_list("UNIVERSE_ALLOW_SYMBOLS")?,
            deny_symbols: parse_symbol_list("UNIVERSE_DENY_SYMBOLS")?,
            require_same_quote: parse_bool("UNIVERSE_REQUIRE_SAME_QUOTE")?,
            max_spread_bps: parse_decimal("UNIVERSE_MAX_SPREAD_BPS")?,
            min_notional_quote: parse_decimal("UNIVERSE_MIN_NOTIONAL_QUOTE")?,
            max_universe_size: parse_usize("UNIVERSE_MAX_SIZE")?,
        };

        Ok(Config { policy, sizing, limits, observability, storage, universe })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn set_all_required(db_path: &str) {
        let pairs: &[(&str, &str)] = &[
            ("DRY_RUN", "true"),
            ("LIVE_TRADING", "false"),
            ("LIVE_TRADING_ACK", ""),
            ("KILL_SWITCH", "false"),
            ("SAFE_MODE", "false"),
            ("APP_ROLE", "LIVE"),
            ("TARGET_TRY", "1000"),
            ("OFFSET_BPS", "10"),
            ("TTL_SECONDS", "60"),
            ("MIN_ORDER_NOTIONAL_TRY", "10"),
            ("NOTIONAL_CAP_TRY_PER_CYCLE", "500"),
            ("MAX_NOTIONAL_PER_ORDER_TRY", "200"),
            ("MAX_POSITION_TRY_PER_SYMBOL", "2000"),
            ("MAX_ORDERS_PER_CYCLE", "5"),
            ("MAX_OPEN_ORDERS_PER_SYMBOL", "2"),
            ("COOLDOWN_SECONDS", "30"),
            ("MIN_PROFIT_BPS", "5"),
            ("KILL_CHAIN_MAX_CONSECUTIVE_ERRORS", "3"),
            ("LOG_LEVEL", "info"),
            ("HTTPX_LOG_LEVEL", "warn"),
            ("SYMBOLS", "BTC_TRY,eth_try"),
            ("UNIVERSE_QUOTE_CCY", "TRY"),
            ("UNIVERSE_ALLOW_SYMBOLS", ""),
            ("UNIVERSE_DENY_SYMBOLS", ""),
            ("UNIVERSE_REQUIRE_SAME_QUOTE", "true"),
            ("UNIVERSE_MAX_SPREAD_BPS", "50"),
            ("UNIVERSE_MIN_NOTIONAL_QUOTE", "10"),
            ("UNIVERSE_MAX_SIZE", "10"),
            ("ACCOUNT_KEY", "test-account"),
        ];
        for (k, v) in pairs {
            std::env::set_var(k, v);
        }
        std::env::set_var("STATE_DB_PATH", db_path);
    }

    fn clear_all() {
        let pairs = [
            "DRY_RUN", "LIVE_TRADING", "LIVE_TRADING_ACK", "KILL_SWITCH", "SAFE_MODE", "APP_ROLE", "TARGET_TRY",
            "OFFSET_BPS", "TTL_SECONDS", "MIN_ORDER_NOTIONAL_TRY", "NOTIONAL_CAP_TRY_PER_CYCLE",
            "MAX_NOTIONAL_PER_ORDER_TRY", "MAX_POSITION_TRY_PER_SYMBOL", "MAX_ORDERS_PER_CYCLE",
            "MAX_OPEN_ORDERS_PER_SYMBOL", "COOLDOWN_SECONDS", "MIN_PROFIT_BPS", "KILL_CHAIN_MAX_CONSECUTIVE_ERRORS",
            "LOG_LEVEL", "HTTPX_LOG_LEVEL", "STATE_DB_PATH", "SYMBOLS", "UNIVERSE_QUOTE_CCY", "UNIVERSE_ALLOW_SYMBOLS",
            "UNIVERSE_DENY_SYMBOLS", "UNIVERSE_REQUIRE_SAME_QUOTE", "UNIVERSE_MAX_SPREAD_BPS",
            "UNIVERSE_MIN_NOTIONAL_QUOTE", "UNIVERSE_MAX_SIZE", "ACCOUNT_KEY",
        ];
        for k in pairs {
            std::env::remove_var(k);
        }
    }

    #[test]
    fn loads_a_complete_environment() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_all_required("/tmp/live-state.db");
        let config = Config::from_env().unwrap();
        assert_eq!(config.universe.symbols, vec![Symbol::new("BTCTRY"), Symbol::new("ETHTRY")]);
        assert_eq!(config.policy.app_role, AppRole::Live);
        clear_all();
    }

    #[test]
    fn missing_variable_is_reported_by_name() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_all_required("/tmp/live-state.db");
        std::env::remove_var("MAX_ORDERS_PER_CYCLE");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(var) if var == "MAX_ORDERS_PER_CYCLE"));
        clear_all();
    }

    #[test]
    fn relative_db_path_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_all_required("relative-state.db");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var, .. } if var == "STATE_DB_PATH"));
        clear_all();
    }

    #[test]
    fn empty_symbols_string_is_an_empty_list_not_an_error() {
        assert_eq!(parse_symbol_list_for_test(""), Vec::<Symbol>::new());
    }

    fn parse_symbol_list_for_test(value: &str) -> Vec<Symbol> {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("B4_TEST_SYMBOLS", value);
        let result = parse_symbol_list("B4_TEST_SYMBOLS").unwrap();
        std::env::remove_var("B4_TEST_SYMBOLS");
        result
    }
}
