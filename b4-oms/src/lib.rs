//! Order management: idempotency, rate limiting, retry, submission,
//! reconciliation, and the replace-tx state machine sit together here
//! because they all guard the same boundary — the exchange call a cycle
//! is allowed to make at most once per intent.

pub mod idempotency;
pub mod rate_limit;
pub mod reconcile;
pub mod replace_tx;
pub mod retry;
pub mod submit;

pub use idempotency::{check_idempotency, IdempotencyOutcome};
pub use rate_limit::{EndpointGroup, Priority, RateLimiter, RateLimiterRegistry};
pub use reconcile::{
    reconcile_open_orders, FillEvent, OpenOrderView, OrderAggregate, OrderTerminalUpdate,
    ReconcileMergeResult, ReconcileState, Reconciler, SnapshotReconcileResult, TerminalStatus,
};
pub use replace_tx::{
    is_forward_transition, upsert_replace_tx, ReplaceTxError, ReplaceTxMetadata, ReplaceTxOutcome,
    ReplaceTxRecord, ReplaceTxState,
};
pub use retry::{backoff_delay, retry_with_backoff, RetryClass, RetryPolicy};
pub use submit::{payload_hash, submit_intent, SubmitOutcome};
