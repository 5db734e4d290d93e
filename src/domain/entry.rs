use super::account::{AccountId, Amount};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type EntryId = u64;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Deposit,
    Withdrawal,
    TransferOut,
    TransferIn,
}

/// An immutable ledger entry describing one balance movement.
///
/// Entries are append-only: once written they are never updated or deleted,
/// forming the audit trail for every balance change. The `amount` is signed;
/// withdrawals and transfer-outs carry negative amounts. For deposits and
/// withdrawals `source_account == target_account`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Entry {
    /// Assigned by the store on append; zero until then.
    pub id: EntryId,
    pub kind: EntryKind,
    pub amount: Decimal,
    pub source_account: AccountId,
    pub target_account: AccountId,
    pub date: NaiveDate,
}

impl Entry {
    pub fn deposit(account: AccountId, amount: Amount, date: NaiveDate) -> Self {
        Self {
            id: 0,
            kind: EntryKind::Deposit,
            amount: amount.value(),
            source_account: account,
            target_account: account,
            date,
        }
    }

    pub fn withdrawal(account: AccountId, amount: Amount, date: NaiveDate) -> Self {
        Self {
            id: 0,
            kind: EntryKind::Withdrawal,
            amount: -amount.value(),
            source_account: account,
            target_account: account,
            date,
        }
    }

    /// The two linked entries produced by one transfer: the out entry on the
    /// source and the in entry on the target, opposite-signed, same magnitude,
    /// same date.
    pub fn transfer_pair(
        source: AccountId,
        target: AccountId,
        amount: Amount,
        date: NaiveDate,
    ) -> (Self, Self) {
        let out = Self {
            id: 0,
            kind: EntryKind::TransferOut,
            amount: -amount.value(),
            source_account: source,
            target_account: target,
            date,
        };
        let r#in = Self {
            id: 0,
            kind: EntryKind::TransferIn,
            amount: amount.value(),
            source_account: source,
            target_account: target,
            date,
        };
        (out, r#in)
    }

    /// Whether this entry touches the given account.
    pub fn concerns(&self, account: AccountId) -> bool {
        self.source_account == account || self.target_account == account
    }
}
