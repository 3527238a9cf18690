//! Governance account bootstrap.
//!
//! Turns raw configuration into a ledger session, a client identity and the
//! governance / account-manager contract handles. See [`bootstrap::run`].

pub mod address;
pub mod bootstrap;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod logger;

pub use address::Address;
pub use bootstrap::Bootstrapped;
pub use error::AppError;
