//! Scriptable in-memory [`ExchangePort`] double for tests.

use crate::error::ExchangeError;
use crate::port::*;
use async_trait::async_trait;
use b4_domain::{Side, Symbol};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

#[derive(Default)]
struct MockState {
    balances: Vec<Balance>,
    pair_infos: Vec<PairInfo>,
    open_orders: HashMap<Symbol, Vec<OpenOrder>>,
    orderbooks: HashMap<Symbol, OrderBook>,
    fills: HashMap<Symbol, Vec<TradeFill>>,
    place_order_script: VecDeque<Result<PlacedOrder, ExchangeError>>,
    place_order_calls: Vec<(Symbol, Side)>,
    cancel_calls: Vec<String>,
}

/// A scriptable, in-memory [`ExchangePort`] used by unit/integration tests.
/// Responses to `place_limit_order` are consumed in FIFO order from a
/// pre-loaded script; every call is recorded so tests can assert "exactly
/// one exchange call" (spec §8 property 2).
pub struct MockExchange {
    state: Mutex<MockState>,
}

impl Default for MockExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExchange {
    pub fn new() -> Self {
        Self { state: Mutex::new(MockState::default()) }
    }

    pub fn with_balances(self, balances: Vec<Balance>) -> Self {
        self.state.lock().balances = balances;
        self
    }

    pub fn with_pair_infos(self, infos: Vec<PairInfo>) -> Self {
        self.state.lock().pair_infos = infos;
        self
    }

    pub fn with_open_orders(self, symbol: Symbol, orders: Vec<OpenOrder>) -> Self {
        self.state.lock().open_orders.insert(symbol, orders);
        self
    }

    pub fn with_orderbook(self, symbol: Symbol, book: OrderBook) -> Self {
        self.state.lock().orderbooks.insert(symbol, book);
        self
    }

    pub fn with_fills(self, symbol: Symbol, fills: Vec<TradeFill>) -> Self {
        self.state.lock().fills.insert(symbol, fills);
        self
    }

    /// Push a response to be returned by the next `place_limit_order` call.
    pub fn push_place_order_response(&self, response: Result<PlacedOrder, ExchangeError>) {
        self.state.lock().place_order_script.push_back(response);
    }

    pub fn place_order_call_count(&self) -> usize {
        self.state.lock().place_order_calls.len()
    }

    pub fn cancel_call_count(&self) -> usize {
        self.state.lock().cancel_calls.len()
    }
}

#[async_trait]
impl ExchangePort for MockExchange {
    async fn get_balances(&self) -> Result<Vec<Balance>, ExchangeError> {
        Ok(self.state.lock().balances.clone())
    }

    async fn get_orderbook(&self, symbol: &Symbol, _limit: Option<u32>) -> Result<OrderBook, ExchangeError> {
        Ok(self.state.lock().orderbooks.get(symbol).copied().unwrap_or(OrderBook {
            best_bid: rust_decimal::Decimal::ZERO,
            best_ask: rust_decimal::Decimal::ZERO,
        }))
    }

    async fn get_exchange_info(&self) -> Result<Vec<PairInfo>, ExchangeError> {
        Ok(self.state.lock().pair_infos.clone())
    }

    async fn get_open_orders(&self, symbol: &Symbol) -> Result<OpenOrders, ExchangeError> {
        let orders = self
            .state
            .lock()
            .open_orders
            .get(symbol)
            .cloned()
            .unwrap_or_default();
        Ok(OpenOrders { symbol: symbol.clone(), orders })
    }

    async fn get_all_orders(
        &self,
        _symbol: &Symbol,
        _start_ms: i64,
        _end_ms: i64,
    ) -> Result<Vec<OrderSnapshot>, ExchangeError> {
        Ok(Vec::new())
    }

    async fn place_limit_order(
        &self,
        symbol: &Symbol,
        side: Side,
        price: rust_decimal::Decimal,
        qty: rust_decimal::Decimal,
        client_order_id: Option<&str>,
    ) -> Result<PlacedOrder, ExchangeError> {
        let mut state = self.state.lock();
        state.place_order_calls.push((symbol.clone(), side));
        match state.place_order_script.pop_front() {
            Some(scripted) => scripted,
            None => Ok(PlacedOrder {
                order_id: format!("mock-order-{}", state.place_order_calls.len()).into(),
                client_order_id: client_order_id.unwrap_or("unset").into(),
                symbol: symbol.clone(),
                side,
                price,
                qty,
                status: OrderSnapshotStatus::Acked,
            }),
        }
    }

    async fn cancel_order(&self, order_id: &str) -> Result<bool, ExchangeError> {
        self.state.lock().cancel_calls.push(order_id.to_string());
        Ok(true)
    }

    async fn get_recent_fills(
        &self,
        symbol: &Symbol,
        _since_ms: Option<i64>,
    ) -> Result<Vec<TradeFill>, ExchangeError> {
        Ok(self.state.lock().fills.get(symbol).cloned().unwrap_or_default())
    }

    async fn close(&self) -> Result<(), ExchangeError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn records_every_place_order_call() {
        let mock = MockExchange::new();
        let symbol = Symbol::new("BTCTRY");
        mock.place_limit_order(&symbol, Side::Buy, dec!(100), dec!(1), Some("coid")).await.unwrap();
        assert_eq!(mock.place_order_call_count(), 1);
    }

    #[tokio::test]
    async fn scripted_responses_are_consumed_in_order() {
        let mock = MockExchange::new();
        mock.push_place_order_response(Err(ExchangeError::RateLimit {
            retry_after: crate::error::RetryAfter::Unspecified,
        }));
        let symbol = Symbol::new("BTCTRY");
        let first = mock.place_limit_order(&symbol, Side::Buy, dec!(100), dec!(1), None).await;
        assert!(first.is_err());
        let second = mock.place_limit_order(&symbol, Side::Buy, dec!(100), dec!(1), None).await;
        assert!(second.is_ok());
    }
}
