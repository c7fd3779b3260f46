//! Crash-safe SQLite persistence: schema, process locking/role enforcement,
//! canonical codecs, and the [`UnitOfWork`] transaction boundary that every
//! other crate writes through.

pub mod codec;
pub mod error;
pub mod lock;
pub mod repo;
pub mod role;
pub mod schema;
pub mod uow;

pub use error::StoreError;
pub use lock::ProcessLock;
pub use role::ProcessRole;
pub use uow::UnitOfWork;
