//! TTL cache of per-symbol [`PairRules`], refreshed from an
//! [`ExchangePort::get_exchange_info`] poll. On refresh failure the cache
//! either serves conservative defaults with a warning (`FailOpen`) or
//! raises `exchange_rules_missing_fail_closed:<symbol>` (`FailClosed`). The
//! switch is fixed at construction time; LIVE deployments must construct
//! `FailClosed` (spec §9 open question — resolved in DESIGN.md).

use b4_domain::{PairRules, Symbol};
use b4_exchange::{ExchangeError, ExchangePort};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const DEFAULT_TTL_SECONDS: u64 = 600;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RulesCacheError {
    #[error("exchange_rules_missing_fail_closed:{0}")]
    MissingFailClosed(String),
}

#[derive(Debug, Clone, Copy)]
pub struct DefaultRules {
    pub min_notional: Decimal,
    pub price_tick: Decimal,
    pub qty_step: Decimal,
}

impl Default for DefaultRules {
    fn default() -> Self {
        Self {
            min_notional: dec!(10),
            price_tick: dec!(0.01),
            qty_step: dec!(0.00000001),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum RulesCachePolicy {
    FailClosed,
    FailOpenWithDefaults(DefaultRules),
}

struct Entry {
    rules: PairRules,
    fetched_at: Instant,
}

pub struct RulesCache {
    ttl: Duration,
    policy: RulesCachePolicy,
    entries: Mutex<HashMap<Symbol, Entry>>,
}

impl RulesCache {
    pub fn new(ttl_seconds: u64, policy: RulesCachePolicy) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_seconds),
            policy,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Poll `source.get_exchange_info()` and repopulate every entry's
    /// timestamp. A transport failure does not clear existing entries —
    /// they simply age toward TTL expiry, at which point `get` applies the
    /// configured policy.
    pub async fn refresh(&self, source: &dyn ExchangePort) -> Result<(), ExchangeError> {
        let infos = source.get_exchange_info().await?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        for info in infos {
            if !info.active {
                continue;
            }
            entries.insert(
                info.symbol.clone(),
                Entry { rules: info.rules, fetched_at: now },
            );
        }
        Ok(())
    }

    /// Fetch cached rules for `symbol`, applying the TTL and fail-open/
    /// fail-closed policy.
    pub fn get(&self, symbol: &Symbol) -> Result<PairRules, RulesCacheError> {
        let entries = self.entries.lock();
        if let Some(entry) = entries.get(symbol) {
            if entry.fetched_at.elapsed() < self.ttl {
                return Ok(entry.rules.clone());
            }
        }
        drop(entries);

        match self.policy {
            RulesCachePolicy::FailClosed => {
                Err(RulesCacheError::MissingFailClosed(symbol.as_str().to_string()))
            }
            RulesCachePolicy::FailOpenWithDefaults(defaults) => {
                tracing::warn!(symbol = %symbol, "exchange rules missing or stale, serving defaults");
                Ok(PairRules {
                    symbol: symbol.clone(),
                    price_tick: defaults.price_tick,
                    qty_step: defaults.qty_step,
                    min_notional_quote: defaults.min_notional,
                    price_precision: 8,
                    qty_precision: 8,
                })
            }
        }
    }
}
