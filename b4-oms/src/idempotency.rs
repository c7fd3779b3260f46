use b4_store::ReservationState;

/// Outcome of checking a `client_order_id` against the reservation table
/// (grounded in `original_source/tests/test_oms_idempotency.py`): a brand
/// new key is free to submit; the same key with the same payload hash is a
/// harmless resubmission (duplicate, never re-sent to the exchange); the
/// same key with a *different* payload hash is a conflict — the caller must
/// isolate it rather than silently overwrite the original order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdempotencyOutcome {
    New,
    Duplicate,
    Conflict,
}

pub fn check_idempotency(
    existing: Option<(ReservationState, &str)>,
    new_payload_hash: &str,
) -> IdempotencyOutcome {
    match existing {
        None => IdempotencyOutcome::New,
        Some((_, stored_hash)) if stored_hash == new_payload_hash => IdempotencyOutcome::Duplicate,
        Some(_) => IdempotencyOutcome::Conflict,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_key_is_new() {
        assert_eq!(check_idempotency(None, "h1"), IdempotencyOutcome::New);
    }

    #[test]
    fn same_key_same_payload_is_duplicate() {
        assert_eq!(
            check_idempotency(Some((ReservationState::Confirmed, "h1")), "h1"),
            IdempotencyOutcome::Duplicate
        );
    }

    #[test]
    fn same_key_different_payload_is_conflict() {
        assert_eq!(
            check_idempotency(Some((ReservationState::Confirmed, "h1")), "h2"),
            IdempotencyOutcome::Conflict
        );
    }
}
