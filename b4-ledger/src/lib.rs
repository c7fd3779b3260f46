//! Pure, deterministic ledger replay: FIFO lot matching, fee accounting
//! with cross-currency conversion, equity/drawdown, and incremental
//! checkpointing. No I/O — callers own persistence.

pub mod accounting;
pub mod checkpoint;
pub mod dedup;
pub mod fifo;

pub use accounting::{equity, max_drawdown};
pub use checkpoint::{load_state_incremental, Checkpoint};
pub use dedup::dedupe_new_events;
pub use fifo::{replay, sort_events, IdentityConverter, LedgerError, LedgerState, PriceConverter};
