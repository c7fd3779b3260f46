//! Submission pipeline: idempotency guard, per-endpoint rate limiting, and
//! a retryable exchange call, producing the `Order`/`OrderEvent` records the
//! store persists. Grounded in `original_source/src/btcbot/services/oms_service.py`'s
//! `process_intents` and `original_source/tests/test_oms_idempotency.py`.

use crate::idempotency::{check_idempotency, IdempotencyOutcome};
use crate::rate_limit::{EndpointGroup, Priority, RateLimiterRegistry};
use crate::retry::{retry_with_backoff, RetryClass, RetryPolicy};
use b4_domain::{Mode, Order, OrderEvent, OrderEventType, OrderIntent, OrderStatus};
use b4_exchange::{ExchangeError, ExchangePort, PlacedOrder};
use b4_store::{OmsExtraRepo, OrdersRepo};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Hash of the fields that must match for a resubmission under the same
/// `client_order_id` to be considered the *same* order rather than a
/// conflicting one.
pub fn payload_hash(intent: &OrderIntent) -> String {
    let payload = format!(
        "{}|{}|{:?}|{}|{}",
        intent.symbol.as_str(),
        intent.side.as_str(),
        intent.order_type,
        intent.price_quote,
        intent.qty,
    );
    hex::encode(Sha256::digest(payload.as_bytes()))
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Submitted { order: Order, events: Vec<OrderEvent> },
    DuplicateIgnored { events: Vec<OrderEvent> },
    Conflict { events: Vec<OrderEvent> },
    Failed { events: Vec<OrderEvent> },
}

impl SubmitOutcome {
    pub fn events(&self) -> &[OrderEvent] {
        match self {
            SubmitOutcome::Submitted { events, .. }
            | SubmitOutcome::DuplicateIgnored { events }
            | SubmitOutcome::Conflict { events }
            | SubmitOutcome::Failed { events } => events,
        }
    }
}

fn classify(err: &ExchangeError) -> (RetryClass, Option<Duration>) {
    match err {
        ExchangeError::RateLimit { retry_after } => (RetryClass::Retryable, Some(retry_after.resolved())),
        ExchangeError::Transient(_) | ExchangeError::Uncertain(_) => (RetryClass::Retryable, None),
        ExchangeError::Auth(_) | ExchangeError::Reject(_) | ExchangeError::Fatal(_) | ExchangeError::Oracle(_) => {
            (RetryClass::NonRetryable, None)
        }
    }
}

fn event(client_order_id: &str, seq: u64, event_type: OrderEventType, order_id: Option<&str>, cycle_id: &str, now: DateTime<Utc>, payload: serde_json::Value) -> OrderEvent {
    OrderEvent {
        event_id: OrderEvent::compute_event_id(client_order_id, seq, event_type),
        ts: now,
        client_order_id: client_order_id.into(),
        order_id: order_id.map(Into::into),
        event_type,
        payload,
        cycle_id: cycle_id.into(),
    }
}

/// Submits a single risk-approved, non-skipped [`OrderIntent`].
///
/// 1. Reserves the intent's `client_order_id` against its payload hash;
///    a harmless resubmission yields `DuplicateIgnored` without touching the
///    exchange, a same-id-different-payload resubmission yields `Conflict`.
/// 2. Acquires the `Orders` rate limiter slot.
/// 3. Calls `ExchangePort::place_limit_order` under exponential backoff.
/// 4. Persists the resulting `Order` row and every lifecycle event, and
///    confirms or releases the reservation accordingly.
#[allow(clippy::too_many_arguments)]
pub async fn submit_intent<E, S>(
    exchange: &E,
    rate_limiters: &RateLimiterRegistry,
    retry_policy: &RetryPolicy,
    orders: &OrdersRepo<'_>,
    oms_extra: &OmsExtraRepo<'_>,
    intent: &OrderIntent,
    mode: Mode,
    now: DateTime<Utc>,
    sleep: S,
) -> Result<SubmitOutcome, b4_store::StoreError>
where
    E: ExchangePort,
    S: Fn(Duration) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>,
{
    let mut events = Vec::new();
    let hash = payload_hash(intent);
    let cid = intent.client_order_id.as_str();

    let reserved = oms_extra.try_reserve(cid, &hash, now)?;
    if !reserved {
        let existing = oms_extra.get_reservation(cid)?;
        let outcome = check_idempotency(existing.as_ref().map(|(s, h)| (*s, h.as_str())), &hash);
        return Ok(match outcome {
            IdempotencyOutcome::Duplicate => {
                events.push(event(cid, 1, OrderEventType::DuplicateIgnored, None, intent.cycle_id.as_str(), now, serde_json::json!({"payload_hash": hash})));
                for e in &events {
                    orders.append_event(e)?;
                }
                SubmitOutcome::DuplicateIgnored { events }
            }
            IdempotencyOutcome::Conflict => {
                events.push(event(cid, 1, OrderEventType::Rejected, None, intent.cycle_id.as_str(), now, serde_json::json!({"reason": "idempotency_conflict", "payload_hash": hash})));
                for e in &events {
                    orders.append_event(e)?;
                }
                SubmitOutcome::Conflict { events }
            }
            IdempotencyOutcome::New => unreachable!("try_reserve already failed, reservation must exist"),
        });
    }

    events.push(event(cid, 1, OrderEventType::SubmitRequested, None, intent.cycle_id.as_str(), now, serde_json::json!({"price": intent.price_quote.to_string(), "qty": intent.qty.to_string()})));
    orders.append_event(&events[0])?;

    rate_limiters.acquire(EndpointGroup::Orders, Priority::High).await;

    let placed: Result<PlacedOrder, ExchangeError> = retry_with_backoff(
        retry_policy,
        |_attempt| exchange.place_limit_order(&intent.symbol, intent.side, intent.price_quote, intent.qty, Some(cid)),
        classify,
        |d| sleep(d),
    )
    .await;

    match placed {
        Ok(placed) => {
            oms_extra.mark_confirmed(cid, now)?;
            let order = Order {
                order_id: placed.order_id.clone(),
                client_order_id: placed.client_order_id.clone(),
                exchange_order_id: Some(placed.order_id.clone()),
                symbol: placed.symbol.clone(),
                side: placed.side,
                order_type: intent.order_type,
                price: placed.price,
                qty: placed.qty,
                filled_qty: rust_decimal::Decimal::ZERO,
                avg_fill_price: None,
                status: OrderStatus::Acked,
                last_update: now,
                intent_hash: hash.clone().into(),
                mode,
            };
            orders.upsert_order(&order)?;
            events.push(event(cid, 2, OrderEventType::Ack, Some(placed.order_id.as_str()), intent.cycle_id.as_str(), now, serde_json::json!({"exchange_order_id": placed.order_id.as_str()})));
            orders.append_event(&events[1])?;
            Ok(SubmitOutcome::Submitted { order, events })
        }
        Err(err) => {
            oms_extra.mark_released(cid, now)?;
            events.push(event(cid, 2, OrderEventType::SubmitFailed, None, intent.cycle_id.as_str(), now, serde_json::json!({"error": err.to_string()})));
            orders.append_event(&events[1])?;
            Ok(SubmitOutcome::Failed { events })
        }
    }
}
