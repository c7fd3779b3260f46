use crate::fifo::{replay, LedgerError, LedgerState, PriceConverter};
use b4_domain::LedgerEvent;
use serde::{Deserialize, Serialize};

/// A serializable snapshot of [`LedgerState`] alongside the highest consumed
/// event rowid, so the next cycle can resume replay from only the events
/// that arrived since.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub state: LedgerState,
    pub last_rowid: i64,
}

/// Resume replay from `checkpoint` (if any) applying only `new_events` whose
/// rowid is greater than the checkpoint's `last_rowid`. Must be bit-exact
/// equivalent to [`replay`] over the full event history for any prefix.
///
/// Returns `(state, last_rowid, used_checkpoint, applied_events)`.
pub fn load_state_incremental(
    checkpoint: Option<Checkpoint>,
    new_events: Vec<(i64, LedgerEvent)>,
    converter: &dyn PriceConverter,
) -> Result<(LedgerState, i64, bool, usize), LedgerError> {
    let (mut state, mut last_rowid, used_checkpoint) = match checkpoint {
        Some(cp) => (cp.state, cp.last_rowid, true),
        None => (LedgerState::new(), 0, false),
    };

    let mut pending: Vec<(i64, LedgerEvent)> = new_events
        .into_iter()
        .filter(|(rowid, _)| *rowid > last_rowid)
        .collect();
    pending.sort_by(|a, b| a.1.ts.cmp(&b.1.ts).then_with(|| a.1.event_id.cmp(&b.1.event_id)));

    let applied = pending.len();
    for (rowid, event) in pending {
        state.apply(&event, converter)?;
        last_rowid = last_rowid.max(rowid);
    }

    Ok((state, last_rowid, used_checkpoint, applied))
}

/// Equivalence check used in tests: incremental load from any prefix split
/// must equal a full replay of the whole history.
pub fn full_replay_equivalent(
    all_events: Vec<LedgerEvent>,
    converter: &dyn PriceConverter,
) -> Result<LedgerState, LedgerError> {
    replay(all_events, converter)
}
