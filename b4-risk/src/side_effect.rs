use b4_domain::ReasonCode;

/// Process posture relevant to whether side effects (order submission,
/// cancellation) are allowed at all this cycle. Distinct from
/// `b4_store::ProcessRole`, which governs the DB-path convention — this one
/// governs runtime behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessRole {
    Live,
    Monitor,
}

/// Everything the side-effect gate needs to decide whether a cycle is
/// allowed to touch the exchange. Every field is an explicit flag — no
/// implicit defaults.
#[derive(Debug, Clone, Copy)]
pub struct SideEffectContext {
    pub process_role: ProcessRole,
    pub kill_switch_engaged: bool,
    pub dry_run: bool,
    pub live_trading_enabled: bool,
    pub live_trading_ack: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideEffectDecision {
    pub allowed: bool,
    pub reasons: Vec<ReasonCode>,
}

/// `allowed <=> !kill_switch && !dry_run && live_trading_enabled &&
/// live_trading_ack && process_role != MONITOR`. Reasons accumulate in the
/// canonical order `[MONITOR_ROLE, KILL_SWITCH, DRY_RUN, NOT_ARMED,
/// ACK_MISSING]` regardless of which checks actually fail.
pub fn evaluate_side_effect_policy(context: &SideEffectContext) -> SideEffectDecision {
    let mut reasons = Vec::new();

    if context.process_role == ProcessRole::Monitor {
        reasons.push(ReasonCode::MonitorRole);
    }
    if context.kill_switch_engaged {
        reasons.push(ReasonCode::KillSwitch);
    }
    if context.dry_run {
        reasons.push(ReasonCode::DryRun);
    }
    if !context.live_trading_enabled {
        reasons.push(ReasonCode::NotArmed);
    }
    if !context.live_trading_ack {
        reasons.push(ReasonCode::AckMissing);
    }

    SideEffectDecision { allowed: reasons.is_empty(), reasons }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armed() -> SideEffectContext {
        SideEffectContext {
            process_role: ProcessRole::Live,
            kill_switch_engaged: false,
            dry_run: false,
            live_trading_enabled: true,
            live_trading_ack: true,
        }
    }

    #[test]
    fn allows_when_fully_armed() {
        let decision = evaluate_side_effect_policy(&armed());
        assert!(decision.allowed);
        assert!(decision.reasons.is_empty());
    }

    #[test]
    fn blocks_monitor_role_first() {
        let mut ctx = armed();
        ctx.process_role = ProcessRole::Monitor;
        ctx.kill_switch_engaged = true;
        let decision = evaluate_side_effect_policy(&ctx);
        assert!(!decision.allowed);
        assert_eq!(decision.reasons[0], ReasonCode::MonitorRole);
        assert_eq!(decision.reasons[1], ReasonCode::KillSwitch);
    }

    #[test]
    fn accumulates_all_failing_reasons_in_canonical_order() {
        let ctx = SideEffectContext {
            process_role: ProcessRole::Monitor,
            kill_switch_engaged: true,
            dry_run: true,
            live_trading_enabled: false,
            live_trading_ack: false,
        };
        let decision = evaluate_side_effect_policy(&ctx);
        assert_eq!(
            decision.reasons,
            vec![
                ReasonCode::MonitorRole,
                ReasonCode::KillSwitch,
                ReasonCode::DryRun,
                ReasonCode::NotArmed,
                ReasonCode::AckMissing,
            ]
        );
    }

    #[test]
    fn blocks_when_ack_missing_alone() {
        let mut ctx = armed();
        ctx.live_trading_ack = false;
        let decision = evaluate_side_effect_policy(&ctx);
        assert!(!decision.allowed);
        assert_eq!(decision.reasons, vec![ReasonCode::AckMissing]);
    }
}
