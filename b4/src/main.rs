//! Binary entrypoint: loads configuration, runs startup recovery once, then
//! drives the cycle runner either once (`--once`) or in a loop until killed.

use b4_exchange::MockExchange;
use b4_rules::{DefaultRules, RulesCache, RulesCachePolicy};
use b4_runner::config::{AppRole, Config};
use b4_runner::{logging, run_startup_recovery, CycleOutcome, CycleRunner};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

const EXIT_OK: u8 = 0;
const EXIT_LOCKED: u8 = 10;
const EXIT_PREFLIGHT_FAIL: u8 = 11;
const EXIT_INVARIANT_VIOLATION: u8 = 12;
const EXIT_CONFIG_ERROR: u8 = 13;

/// Thin CLI surface per spec: no interactive prompts, distinct exit codes
/// for the failure classes an operator needs to distinguish at a glance.
#[derive(Parser, Debug)]
#[command(name = "b4", about = "Unattended crypto trading bot core")]
struct Cli {
    /// Path to a .env file to load before reading the process environment.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Force debug-level logging regardless of LOG_LEVEL.
    #[arg(long)]
    debug: bool,

    /// Run exactly one cycle then exit, instead of looping until killed.
    #[arg(long)]
    once: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        if let Err(err) = dotenvy::from_path(path) {
            eprintln!("CONFIG_ERROR: failed to load {}: {err}", path.display());
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    } else {
        // Optional: a `.env` in the working directory is convenience only,
        // never required — every variable is still validated by `Config::from_env`.
        let _ = dotenvy::dotenv();
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("CONFIG_ERROR: {err}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let log_level = if cli.debug { "debug".to_string() } else { config.observability.log_level.clone() };
    logging::init_tracing(&log_level, &config.observability.httpx_log_level);

    if let Err(err) = config.policy.app_role.to_store_role().assert_db_path_convention(&config.storage.state_db_path) {
        eprintln!("PREFLIGHT_FAIL: {err}");
        return ExitCode::from(EXIT_PREFLIGHT_FAIL);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("CONFIG_ERROR: failed to start async runtime: {err}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    runtime.block_on(run(config, cli.once))
}

/// No concrete venue client is implemented in this workspace (the exchange
/// adapter is the declared contract boundary) — the binary drives the
/// planning/risk/OMS/ledger core against the scriptable in-memory
/// [`MockExchange`] until a real client is wired in behind [`ExchangePort`].
async fn run(config: Config, once: bool) -> ExitCode {
    let exchange = Arc::new(MockExchange::new());

    // Resolved Open Question (DESIGN.md): LIVE always fails closed on a
    // stale/missing rules cache; MONITOR is read-only, so a default pair
    // rule never sizes a live order.
    let rules_policy = match config.policy.app_role {
        AppRole::Live => RulesCachePolicy::FailClosed,
        AppRole::Monitor => RulesCachePolicy::FailOpenWithDefaults(DefaultRules::default()),
    };
    let rules_cache = Arc::new(RulesCache::new(600, rules_policy));

    let startup = match run_startup_recovery(exchange.clone(), &config).await {
        Ok(outcome) => outcome,
        Err(b4_store::StoreError::Locked(path)) => {
            eprintln!("LOCKED: {path}");
            return ExitCode::from(EXIT_LOCKED);
        }
        Err(err) => {
            eprintln!("PREFLIGHT_FAIL: {err}");
            return ExitCode::from(EXIT_PREFLIGHT_FAIL);
        }
    };
    if startup.forced_observe_only {
        tracing::warn!(violations = ?startup.invariant_violations, "startup recovery forced observe-only mode");
    }

    let mut runner = CycleRunner::new(exchange, config, rules_cache);

    loop {
        match runner.run_once().await {
            CycleOutcome::Committed { cycle_id, mode_final, orders_submitted, fills_ingested } => {
                tracing::info!(%cycle_id, ?mode_final, orders_submitted, fills_ingested, "cycle committed");
            }
            CycleOutcome::LockContended => {
                eprintln!("LOCKED: process lock already held for this account");
                return ExitCode::from(EXIT_LOCKED);
            }
            CycleOutcome::RolledBack { error, kill_switch_tripped } => {
                tracing::error!(error = %error, kill_switch_tripped, "cycle rolled back");
                if kill_switch_tripped {
                    eprintln!("INVARIANT_VIOLATION: kill switch tripped after repeated cycle failures ({error})");
                    return ExitCode::from(EXIT_INVARIANT_VIOLATION);
                }
            }
        }

        if once {
            break;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    ExitCode::from(EXIT_OK)
}
