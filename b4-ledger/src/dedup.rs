use b4_domain::LedgerEvent;
use smol_str::SmolStr;
use std::collections::HashSet;

/// Partition candidate events into those genuinely new against `seen` dedup
/// keys (see [`b4_domain::LedgerEvent::dedup_key`]) and a count of
/// duplicates dropped. Calling this twice with the same input and an
/// updated `seen` set (as the caller would after persisting the first
/// batch) inserts each fill exactly once — spec §8 property 3.
pub fn dedupe_new_events(
    seen: &HashSet<SmolStr>,
    candidates: Vec<LedgerEvent>,
) -> (Vec<LedgerEvent>, usize) {
    let mut fresh = Vec::with_capacity(candidates.len());
    let mut local_seen: HashSet<SmolStr> = seen.clone();
    let mut duplicates = 0;

    for event in candidates {
        let key = event.dedup_key();
        if local_seen.insert(key) {
            fresh.push(event);
        } else {
            duplicates += 1;
        }
    }

    (fresh, duplicates)
}
