//! The replace-transaction state machine: an atomic cancel-then-place
//! substitution for a resting order, persisted so a crash mid-replace can be
//! resumed rather than silently losing track of the old or new order.
//!
//! `INIT -> CANCEL_SENT -> CANCEL_CONFIRMED -> NEW_SENT -> NEW_CONFIRMED -> DONE`,
//! with a failure fork `{CANCEL_SENT, CANCEL_CONFIRMED, NEW_SENT, NEW_CONFIRMED} -> ROLLING_BACK -> DONE`.
//! Transitions are forward-only; re-upserting the same `replace_id` under
//! different metadata (symbol/side/old order) is accepted non-destructively
//! (grounded in `original_source/tests/test_replace_tx_state_store.py`).

use b4_domain::{Side, Symbol};
use b4_store::{OmsExtraRepo, StoreError};
use chrono::{DateTime, Utc};
use smol_str::SmolStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceTxState {
    Init,
    CancelSent,
    CancelConfirmed,
    NewSent,
    NewConfirmed,
    Done,
    RollingBack,
}

impl ReplaceTxState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplaceTxState::Init => "INIT",
            ReplaceTxState::CancelSent => "CANCEL_SENT",
            ReplaceTxState::CancelConfirmed => "CANCEL_CONFIRMED",
            ReplaceTxState::NewSent => "NEW_SENT",
            ReplaceTxState::NewConfirmed => "NEW_CONFIRMED",
            ReplaceTxState::Done => "DONE",
            ReplaceTxState::RollingBack => "ROLLING_BACK",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplaceTxError {
    #[error("unknown replace-tx state: {0}")]
    UnknownState(String),
    #[error("replace-tx transition {from:?} -> {to:?} is not forward")]
    NotForward { from: ReplaceTxState, to: ReplaceTxState },
}

fn parse_state(s: &str) -> Result<ReplaceTxState, ReplaceTxError> {
    match s {
        "INIT" => Ok(ReplaceTxState::Init),
        "CANCEL_SENT" => Ok(ReplaceTxState::CancelSent),
        "CANCEL_CONFIRMED" => Ok(ReplaceTxState::CancelConfirmed),
        "NEW_SENT" => Ok(ReplaceTxState::NewSent),
        "NEW_CONFIRMED" => Ok(ReplaceTxState::NewConfirmed),
        "DONE" => Ok(ReplaceTxState::Done),
        "ROLLING_BACK" => Ok(ReplaceTxState::RollingBack),
        other => Err(ReplaceTxError::UnknownState(other.to_string())),
    }
}

/// Whether `current -> next` is a legal forward transition (or a no-op
/// resubmission of the same state). Mirrors
/// `_is_replace_tx_forward_transition`: unrecognized state names are a hard
/// error rather than silently `false`.
pub fn is_forward_transition(current: &str, next: &str) -> Result<bool, ReplaceTxError> {
    let from = parse_state(current)?;
    let to = parse_state(next)?;
    if from == to {
        return Ok(true);
    }
    use ReplaceTxState::*;
    let forward = matches!(
        (from, to),
        (Init, CancelSent)
            | (CancelSent, CancelConfirmed)
            | (CancelConfirmed, NewSent)
            | (NewSent, NewConfirmed)
            | (NewConfirmed, Done)
            | (RollingBack, Done)
    ) || (matches!(from, CancelSent | CancelConfirmed | NewSent | NewConfirmed) && to == RollingBack);
    Ok(forward)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceTxMetadata {
    pub symbol: Symbol,
    pub side: Side,
    pub old_client_order_id: SmolStr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceTxRecord {
    pub metadata: ReplaceTxMetadata,
    pub new_client_order_id: Option<SmolStr>,
    pub state: ReplaceTxState,
    pub last_error: Option<SmolStr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceTxOutcome {
    Started,
    Advanced { from: ReplaceTxState, to: ReplaceTxState },
    RejectedNotForward { from: ReplaceTxState, to: ReplaceTxState },
    MetadataMismatch,
}

/// Starts a brand-new replace-tx, or advances an existing one, keyed on
/// `replace_id`. A request against an existing id whose metadata doesn't
/// match the stored row is never applied to the stored fields — only
/// `last_error` is set, so a concurrent/duplicate replace attempt can never
/// corrupt the original transaction's record of which order it is replacing.
pub fn upsert_replace_tx(
    repo: &OmsExtraRepo<'_>,
    replace_id: &str,
    metadata: &ReplaceTxMetadata,
    requested_state: ReplaceTxState,
    new_client_order_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ReplaceTxOutcome, StoreError> {
    match repo.get_replace_tx(replace_id)? {
        None => {
            repo.start_replace(replace_id, metadata.symbol.as_str(), metadata.side, metadata.old_client_order_id.as_str(), now)?;
            if requested_state != ReplaceTxState::Init {
                repo.advance_replace(replace_id, requested_state.as_str(), new_client_order_id, None, now)?;
            }
            Ok(ReplaceTxOutcome::Started)
        }
        Some((symbol, side, old_cid, _new_cid, state_str, _last_error)) => {
            let stored_metadata_matches =
                symbol == metadata.symbol.as_str() && side == metadata.side && old_cid == metadata.old_client_order_id.as_str();

            if !stored_metadata_matches {
                repo.advance_replace(replace_id, &state_str, None, Some("replace_tx_metadata_mismatch"), now)?;
                return Ok(ReplaceTxOutcome::MetadataMismatch);
            }

            let current = parse_state(&state_str).unwrap_or(ReplaceTxState::Init);
            match is_forward_transition(&state_str, requested_state.as_str()) {
                Ok(true) => {
                    repo.advance_replace(replace_id, requested_state.as_str(), new_client_order_id, None, now)?;
                    Ok(ReplaceTxOutcome::Advanced { from: current, to: requested_state })
                }
                Ok(false) => Ok(ReplaceTxOutcome::RejectedNotForward { from: current, to: requested_state }),
                Err(_) => Ok(ReplaceTxOutcome::RejectedNotForward { from: current, to: requested_state }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use b4_store::UnitOfWork;

    #[test]
    fn unknown_state_transition_is_rejected() {
        assert!(is_forward_transition("INIT", "NOT_A_STATE").is_err());
    }

    #[test]
    fn init_to_cancel_sent_is_forward() {
        assert_eq!(is_forward_transition("INIT", "CANCEL_SENT"), Ok(true));
    }

    #[test]
    fn cancel_confirmed_to_init_is_not_forward() {
        assert_eq!(is_forward_transition("CANCEL_CONFIRMED", "INIT"), Ok(false));
    }

    #[test]
    fn any_in_flight_state_can_roll_back() {
        assert_eq!(is_forward_transition("NEW_SENT", "ROLLING_BACK"), Ok(true));
        assert_eq!(is_forward_transition("ROLLING_BACK", "DONE"), Ok(true));
    }

    fn ts() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn metadata_mismatch_is_non_destructive() {
        let dir = tempfile::tempdir().unwrap();
        let uow = UnitOfWork::open(&dir.path().join("state.db")).unwrap();
        let repo = uow.oms_extra();

        let original = ReplaceTxMetadata { symbol: Symbol::new("BTCTRY"), side: Side::Buy, old_client_order_id: "old-1".into() };
        upsert_replace_tx(&repo, "rpl:mismatch", &original, ReplaceTxState::Init, Some("new-1"), ts()).unwrap();

        let conflicting = ReplaceTxMetadata { symbol: Symbol::new("ETHTRY"), side: Side::Sell, old_client_order_id: "old-2".into() };
        let outcome = upsert_replace_tx(&repo, "rpl:mismatch", &conflicting, ReplaceTxState::CancelSent, Some("new-2"), ts()).unwrap();
        assert_eq!(outcome, ReplaceTxOutcome::MetadataMismatch);

        let (symbol, side, old_cid, new_cid, _state, last_error) = repo.get_replace_tx("rpl:mismatch").unwrap().unwrap();
        assert_eq!(symbol, "BTCTRY");
        assert_eq!(side, Side::Buy);
        assert_eq!(old_cid, "old-1");
        assert_eq!(new_cid.as_deref(), Some("new-1"));
        assert_eq!(last_error.as_deref(), Some("replace_tx_metadata_mismatch"));
    }

    #[test]
    fn forward_progression_persists_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let uow = UnitOfWork::open(&dir.path().join("state.db")).unwrap();
        let repo = uow.oms_extra();
        let metadata = ReplaceTxMetadata { symbol: Symbol::new("BTCTRY"), side: Side::Buy, old_client_order_id: "old-1".into() };

        upsert_replace_tx(&repo, "rpl:ok", &metadata, ReplaceTxState::Init, None, ts()).unwrap();
        let outcome = upsert_replace_tx(&repo, "rpl:ok", &metadata, ReplaceTxState::CancelSent, None, ts()).unwrap();
        assert_eq!(outcome, ReplaceTxOutcome::Advanced { from: ReplaceTxState::Init, to: ReplaceTxState::CancelSent });

        let backward = upsert_replace_tx(&repo, "rpl:ok", &metadata, ReplaceTxState::Init, None, ts()).unwrap();
        assert_eq!(backward, ReplaceTxOutcome::RejectedNotForward { from: ReplaceTxState::CancelSent, to: ReplaceTxState::Init });
    }
}
