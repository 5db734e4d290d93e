//! Inbound and outbound adapters around the ledger engine.

pub mod csv;
