use indexmap::IndexMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, Mutex};

/// Priority levels for rate limited operations.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum Priority {
    High,
    Normal,
    Low,
}

/// Venue endpoint groups that typically carry independent rate budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointGroup {
    Orders,
    MarketData,
    Account,
}

struct Waiter {
    tx: oneshot::Sender<()>,
}

struct Inner {
    capacity: usize,
    tokens: usize,
    interval: Duration,
    last_refill: Instant,
    base_interval: Duration,
    max_interval: Duration,
    high: VecDeque<Waiter>,
    normal: VecDeque<Waiter>,
    low: VecDeque<Waiter>,
}

impl Inner {
    fn refill(&mut self) {
        let now = Instant::now();
        if now.duration_since(self.last_refill) >= self.interval {
            let periods = now.duration_since(self.last_refill).as_millis() / self.interval.as_millis();
            let add_tokens = (periods as usize + 1) * self.capacity;
            self.last_refill = now;
            self.tokens = usize::min(self.tokens + add_tokens, self.capacity);
            while self.tokens > 0 {
                if let Some(waiter) = self.high.pop_front().or_else(|| self.normal.pop_front()).or_else(|| self.low.pop_front()) {
                    self.tokens -= 1;
                    let _ = waiter.tx.send(());
                } else {
                    break;
                }
            }
            if self.tokens > self.capacity {
                self.tokens = self.capacity;
            }
        }
    }
}

/// Token bucket rate limiter with priority queues and adaptive backoff on
/// observed rate-limit violations.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<Inner>>,
}

impl RateLimiter {
    pub fn new(capacity: usize, interval: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                capacity,
                tokens: capacity,
                interval,
                last_refill: Instant::now(),
                base_interval: interval,
                max_interval: interval * 16,
                high: VecDeque::new(),
                normal: VecDeque::new(),
                low: VecDeque::new(),
            })),
        }
    }

    pub async fn acquire(&self, priority: Priority) {
        loop {
            let rx = {
                let mut inner = self.inner.lock().await;
                inner.refill();
                if inner.tokens > 0 {
                    inner.tokens -= 1;
                    None
                } else {
                    let (tx, rx) = oneshot::channel();
                    let waiter = Waiter { tx };
                    match priority {
                        Priority::High => inner.high.push_back(waiter),
                        Priority::Normal => inner.normal.push_back(waiter),
                        Priority::Low => inner.low.push_back(waiter),
                    }
                    Some(rx)
                }
            };
            match rx {
                None => return,
                Some(rx) => {
                    let _ = rx.await;
                }
            }
        }
    }

    pub async fn report_violation(&self) {
        let mut inner = self.inner.lock().await;
        let next = inner.interval * 2;
        inner.interval = std::cmp::min(next, inner.max_interval);
    }

    pub async fn reset_backoff(&self) {
        let mut inner = self.inner.lock().await;
        inner.interval = inner.base_interval;
    }
}

/// Per-endpoint-group rate limiters, so order submission throttling never
/// starves market-data or account polling and vice versa.
pub struct RateLimiterRegistry {
    limiters: IndexMap<EndpointGroup, RateLimiter>,
}

impl RateLimiterRegistry {
    pub fn new() -> Self {
        Self { limiters: IndexMap::new() }
    }

    pub fn with_group(mut self, group: EndpointGroup, capacity: usize, interval: Duration) -> Self {
        self.limiters.insert(group, RateLimiter::new(capacity, interval));
        self
    }

    pub fn group(&self, group: EndpointGroup) -> Option<&RateLimiter> {
        self.limiters.get(&group)
    }

    pub async fn acquire(&self, group: EndpointGroup, priority: Priority) {
        if let Some(limiter) = self.limiters.get(&group) {
            limiter.acquire(priority).await;
        }
    }

    pub async fn report_violation(&self, group: EndpointGroup) {
        if let Some(limiter) = self.limiters.get(&group) {
            limiter.report_violation().await;
        }
    }
}

impl Default for RateLimiterRegistry {
    fn default() -> Self {
        Self::new()
            .with_group(EndpointGroup::Orders, 10, Duration::from_secs(1))
            .with_group(EndpointGroup::MarketData, 20, Duration::from_secs(1))
            .with_group(EndpointGroup::Account, 5, Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Instant as TokioInstant};

    #[tokio::test]
    async fn burst_then_throttled_until_refill() {
        let rl = RateLimiter::new(1, Duration::from_millis(50));
        rl.acquire(Priority::Normal).await;
        let start = TokioInstant::now();
        rl.acquire(Priority::Normal).await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn report_violation_doubles_interval() {
        let rl = RateLimiter::new(1, Duration::from_millis(20));
        rl.acquire(Priority::Normal).await;
        rl.report_violation().await;
        let start = TokioInstant::now();
        rl.acquire(Priority::Normal).await;
        assert!(start.elapsed() >= Duration::from_millis(35));
    }

    #[tokio::test]
    async fn registry_groups_are_independent() {
        let registry = RateLimiterRegistry::default();
        registry.acquire(EndpointGroup::Orders, Priority::Normal).await;
        registry.acquire(EndpointGroup::MarketData, Priority::Normal).await;
        sleep(Duration::from_millis(1)).await;
        assert!(registry.group(EndpointGroup::Orders).is_some());
    }
}
