//! Deterministic planning pipeline: universe selection, strategy intents,
//! allocation, and order-intent sizing. Every stage is a pure function of
//! its [`context::PlanningContext`] plus an injected [`clock::Clock`] — no
//! stage reads the wall clock, a database, or the network directly.

pub mod allocator;
pub mod builder;
pub mod clock;
pub mod context;
pub mod kernel;
pub mod strategy;
pub mod universe;

pub use allocator::{AllocationDecision, AllocationStatus, Allocator, DefaultAllocator};
pub use builder::{DefaultOrderIntentBuilder, OrderIntentBuilder};
pub use clock::{Clock, FixedClock, SystemClock};
pub use context::{
    AllocatorKnobs, MarketSnapshot, OrderBookSummary, PlanningContext, PortfolioSnapshot,
    StrategyKnobs, UniverseKnobs,
};
pub use kernel::{Kernel, PlanningDiagnostics, PlanningGates, PlanningResult};
pub use strategy::{MeanReversionStrategy, StrategyEngine, StrategyRegistry};
pub use universe::{DefaultUniverseSelector, UniverseSelector};
