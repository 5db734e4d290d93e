use crate::domain::account::{Account, AccountId};
use crate::domain::entry::{Entry, EntryId};
use crate::domain::ports::{LedgerStore, Result, UnitOfWork};
use crate::error::StorageError;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// A thread-safe in-memory ledger store.
///
/// Uses `Arc<RwLock<..>>` maps for shared concurrent access, as the default
/// backend for tests and small datasets where persistence is not required.
/// Entry ids are assigned from an atomic counter on append.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    accounts: Arc<RwLock<HashMap<AccountId, Account>>>,
    entries: Arc<RwLock<BTreeMap<EntryId, Entry>>>,
    next_entry_id: Arc<AtomicU64>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> EntryId {
        self.next_entry_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn account(&self, id: AccountId) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&id).cloned())
    }

    async fn all_accounts(&self) -> Result<Vec<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().cloned().collect())
    }

    async fn insert_account(&self, account: Account) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.id) {
            return Err(StorageError::Backend(format!(
                "account {} already stored",
                account.id
            )));
        }
        accounts.insert(account.id, account);
        Ok(())
    }

    async fn update_account(&self, account: Account) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(&account.id) {
            Some(stored) => {
                *stored = account;
                Ok(())
            }
            None => Err(StorageError::Backend(format!(
                "account {} not stored",
                account.id
            ))),
        }
    }

    async fn append_entry(&self, mut entry: Entry) -> Result<EntryId> {
        let id = self.next_id();
        entry.id = id;
        let mut entries = self.entries.write().await;
        entries.insert(id, entry);
        Ok(id)
    }

    async fn account_entries(&self, id: AccountId) -> Result<Vec<Entry>> {
        let entries = self.entries.read().await;
        Ok(entries.values().filter(|e| e.concerns(id)).cloned().collect())
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        Ok(Box::new(InMemoryUnitOfWork {
            store: self.clone(),
            staged_accounts: Vec::new(),
            staged_entries: Vec::new(),
        }))
    }
}

/// Staged writes against an `InMemoryLedgerStore`.
///
/// Nothing is visible to readers until `commit`, which validates every staged
/// account and applies all writes while holding both map locks. Dropping the
/// handle discards the staged writes.
pub struct InMemoryUnitOfWork {
    store: InMemoryLedgerStore,
    staged_accounts: Vec<Account>,
    staged_entries: Vec<Entry>,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    fn stage_account(&mut self, account: Account) {
        self.staged_accounts.push(account);
    }

    fn stage_entry(&mut self, entry: Entry) {
        self.staged_entries.push(entry);
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        // Lock order: accounts before entries, everywhere.
        let mut accounts = self.store.accounts.write().await;
        let mut entries = self.store.entries.write().await;

        for account in &self.staged_accounts {
            if !accounts.contains_key(&account.id) {
                return Err(StorageError::Backend(format!(
                    "account {} not stored",
                    account.id
                )));
            }
        }

        for account in self.staged_accounts {
            accounts.insert(account.id, account);
        }
        for mut entry in self.staged_entries {
            entry.id = self.store.next_id();
            entries.insert(entry.id, entry);
        }
        Ok(())
    }
}
