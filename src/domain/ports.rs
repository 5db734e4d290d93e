use super::account::{Account, AccountId};
use super::entry::{Entry, EntryId};
use crate::error::StorageError;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Durable access to account records and the entry trail.
///
/// The engine treats this as an external collaborator: it never caches
/// accounts across operations and always re-reads under the account's lock.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn account(&self, id: AccountId) -> Result<Option<Account>>;
    async fn all_accounts(&self) -> Result<Vec<Account>>;
    /// Registers a newly opened account. Fails if the id is already present;
    /// accounts are created once and existing records are never replaced
    /// wholesale.
    async fn insert_account(&self, account: Account) -> Result<()>;
    /// Persists a new state for an existing account. Fails if absent.
    async fn update_account(&self, account: Account) -> Result<()>;
    /// Appends an immutable entry, returning the id the store assigned.
    async fn append_entry(&self, entry: Entry) -> Result<EntryId>;
    async fn account_entries(&self, id: AccountId) -> Result<Vec<Entry>>;
    /// Opens a scoped unit of work. Used only by transfer, which must make
    /// its two account updates and two entry appends atomic.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;
}

/// A group of storage writes that commit or roll back together.
///
/// Writes are staged in memory and take effect only on `commit`. Dropping the
/// handle (or calling `rollback`) discards all staged writes.
#[async_trait]
pub trait UnitOfWork: Send {
    fn stage_account(&mut self, account: Account);
    fn stage_entry(&mut self, entry: Entry);
    async fn commit(self: Box<Self>) -> Result<()>;
    fn rollback(self: Box<Self>) {}
}
