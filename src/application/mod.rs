//! Application layer containing the core business logic orchestration.
//!
//! This module defines the `Ledger` engine, the per-account lock registry it
//! relies on, and the `InterestScheduler` that drives periodic accrual
//! through the same locked update path.

pub mod ledger;
pub mod locks;
pub mod scheduler;
