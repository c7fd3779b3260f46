//! Two processes against the same (db_path, account_key): the second must
//! refuse to run a cycle rather than racing the first's UnitOfWork.

mod support;

use b4_exchange::MockExchange;
use b4_runner::{CycleOutcome, CycleRunner};
use b4_rules::{RulesCache, RulesCachePolicy};
use b4_store::ProcessLock;
use std::sync::Arc;

#[tokio::test]
async fn second_runner_sees_lock_contended() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("b4-live.db");

    let held_lock = ProcessLock::acquire(&db_path, "acct-lock").unwrap();

    let exchange = Arc::new(MockExchange::new());
    let rules_cache = Arc::new(RulesCache::new(600, RulesCachePolicy::FailClosed));
    let config = support::live_config(db_path.clone(), "acct-lock");
    let mut runner = CycleRunner::new(exchange, config, rules_cache);

    let outcome = runner.run_once().await;
    assert!(matches!(outcome, CycleOutcome::LockContended));

    drop(held_lock);
}
