pub mod ledger;
pub mod metrics;
pub mod oms_extra;
pub mod orders;
pub mod risk;

pub use ledger::LedgerRepo;
pub use metrics::MetricsRepo;
pub use oms_extra::{OmsExtraRepo, ReservationState};
pub use orders::OrdersRepo;
pub use risk::{KillSwitchRole, RiskRepo, RiskStateCurrent};
