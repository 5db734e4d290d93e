use crate::domain::account::AccountId;
use thiserror::Error;

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

/// Errors surfaced by the ledger engine to its direct caller.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("amount must be positive")]
    InvalidAmount,
    #[error("insufficient funds in account {account}")]
    InsufficientFunds { account: AccountId },
    #[error("account {0} not found")]
    AccountNotFound(AccountId),
    #[error("source and target accounts are the same")]
    SameAccount,
    /// The transfer's unit of work could not commit. No partial effect is
    /// observable in storage, but any in-memory copies of the accounts must
    /// be treated as invalid and re-fetched before reuse.
    #[error("transfer could not commit: {0}")]
    TransferFailure(#[source] StorageError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors produced by a `LedgerStore` backend.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("rocksdb error: {0}")]
    RocksDb(#[from] rocksdb::Error),
    #[error("storage error: {0}")]
    Backend(String),
}
