use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Cycle-wide trading posture. Ordered so that `NORMAL < REDUCE_RISK_ONLY <
/// OBSERVE_ONLY`; the risk gates never downgrade below the previous stored
/// mode while its cooldown is active (see [`RiskDecision::cooldown_until`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskMode {
    Normal,
    ReduceRiskOnly,
    ObserveOnly,
}

impl RiskMode {
    pub fn max(self, other: RiskMode) -> RiskMode {
        std::cmp::max(self, other)
    }
}

/// Closed set of reasons a risk/safety gate can cite when it blocks or
/// mutates a cycle's behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReasonCode {
    // side-effect policy, evaluated in this canonical order
    MonitorRole,
    KillSwitch,
    DryRun,
    NotArmed,
    AckMissing,

    // per-order policy
    MaxOpenOrdersPerSymbol,
    Cooldown,
    MissingLimitPrice,
    NonPositiveAfterQuantize,
    MinNotional,
    NotionalCap,

    // action filter
    RiskSubmitDisabled,
    RiskCancelDisabled,
    RiskCapMaxOrders,
    RiskCapMaxNotional,
    RiskCapMaxExposure,
    RiskReduceOnlyBlocked,

    // environmental gates
    StaleMarketData,
    ExchangeDegraded,

    Accepted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskDecision {
    pub mode: RiskMode,
    pub reasons: Vec<ReasonCode>,
    pub limits: serde_json::Value,
    pub signals: serde_json::Value,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub decided_at: DateTime<Utc>,
    pub inputs_hash: SmolStr,
}
