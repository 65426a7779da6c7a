//! Identity reconciliation engine — re-exports the testable core.
//!
//! The binary entry point is `main.rs`; this crate exposes the pipeline
//! stages and the store abstraction so unit, property, and scenario
//! tests can exercise the algorithm without a running Postgres.

pub mod config;
pub mod error;
pub mod match_resolver;
pub mod merge;
pub mod model;
pub mod mutator;
pub mod reconciler;
pub mod response;
pub mod store;

pub use error::{ReconcileError, StoreError};
pub use model::{Contact, ConsolidatedContact, Precedence, ReconcileInput};
pub use reconciler::Reconciler;
pub use store::Store;
