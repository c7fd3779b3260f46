use std::time::Duration;
use thiserror::Error;

/// How long a caller should wait before retrying a [`ExchangeError::RateLimit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAfter {
    Duration(Duration),
    /// No `Retry-After` header was present; callers apply the floor (250ms).
    Unspecified,
}

impl RetryAfter {
    pub const FLOOR: Duration = Duration::from_millis(250);

    pub fn resolved(self) -> Duration {
        match self {
            RetryAfter::Duration(d) => d.max(Self::FLOOR),
            RetryAfter::Unspecified => Self::FLOOR,
        }
    }
}

/// Error taxonomy (spec §7). Every leaf adapter call is classified into
/// exactly one of these kinds; the runner then maps the kind onto a
/// `ReasonCode` and a mode transition.
#[derive(Debug, Error, Clone)]
pub enum ExchangeError {
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimit { retry_after: RetryAfter },

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("authentication failure: {0}")]
    Auth(String),

    #[error("request rejected: {0}")]
    Reject(String),

    #[error("uncertain outcome (timeout or ambiguous response): {0}")]
    Uncertain(String),

    #[error("fatal/programming error: {0}")]
    Fatal(String),

    #[error("missing mark/fee rate: {0}")]
    Oracle(String),
}

impl ExchangeError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExchangeError::RateLimit { .. } | ExchangeError::Transient(_))
    }
}
