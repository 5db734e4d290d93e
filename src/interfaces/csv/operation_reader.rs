use crate::domain::account::AccountId;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Open,
    Deposit,
    Withdraw,
    Transfer,
}

/// One row of the batch operations file.
///
/// `target` is only meaningful for transfers; `amount` is the opening balance
/// for `open` and the operation amount otherwise.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct Operation {
    pub op: OperationKind,
    pub account: AccountId,
    pub target: Option<AccountId>,
    pub amount: Option<Decimal>,
}

/// Reads ledger operations from a CSV source.
///
/// Wraps `csv::Reader` and provides an iterator over `Result<Operation>`,
/// trimming whitespace and tolerating missing trailing fields so large files
/// can be processed in a streaming fashion.
pub struct OperationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OperationReader<R> {
    /// Creates a new `OperationReader` from any `Read` source (e.g. File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes operations.
    pub fn operations(self) -> impl Iterator<Item = Result<Operation>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(LedgerError::from))
    }
}
