#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use corebank::domain::account::{Account, AccountId, Balance};
use corebank::domain::entry::{Entry, EntryId};
use corebank::domain::ports::{LedgerStore, Result, UnitOfWork};
use corebank::error::StorageError;
use corebank::infrastructure::in_memory::InMemoryLedgerStore;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn account(id: AccountId, balance: Decimal) -> Account {
    let mut account = Account::open(id, format!("ACC{id:07}"), 1, 1, today());
    account.balance = Balance::new(balance);
    account
}

pub async fn seeded_store(balances: &[(AccountId, Decimal)]) -> Arc<InMemoryLedgerStore> {
    let store = Arc::new(InMemoryLedgerStore::new());
    for (id, balance) in balances {
        store.insert_account(account(*id, *balance)).await.unwrap();
    }
    store
}

/// A store wrapper that injects failures, for exercising the engine's
/// failure paths: unit-of-work commits can be made to fail, as can updates
/// to one chosen account.
pub struct FaultyStore {
    inner: InMemoryLedgerStore,
    pub fail_commits: AtomicBool,
    pub fail_updates_for: Option<AccountId>,
}

impl FaultyStore {
    pub fn wrapping(inner: InMemoryLedgerStore) -> Self {
        Self {
            inner,
            fail_commits: AtomicBool::new(false),
            fail_updates_for: None,
        }
    }
}

#[async_trait]
impl LedgerStore for FaultyStore {
    async fn account(&self, id: AccountId) -> Result<Option<Account>> {
        self.inner.account(id).await
    }

    async fn all_accounts(&self) -> Result<Vec<Account>> {
        self.inner.all_accounts().await
    }

    async fn insert_account(&self, account: Account) -> Result<()> {
        self.inner.insert_account(account).await
    }

    async fn update_account(&self, account: Account) -> Result<()> {
        if self.fail_updates_for == Some(account.id) {
            return Err(StorageError::Backend("injected update failure".into()));
        }
        self.inner.update_account(account).await
    }

    async fn append_entry(&self, entry: Entry) -> Result<EntryId> {
        self.inner.append_entry(entry).await
    }

    async fn account_entries(&self, id: AccountId) -> Result<Vec<Entry>> {
        self.inner.account_entries(id).await
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Ok(Box::new(FailingUnitOfWork));
        }
        self.inner.begin().await
    }
}

/// Accepts staged writes but always fails to commit.
struct FailingUnitOfWork;

#[async_trait]
impl UnitOfWork for FailingUnitOfWork {
    fn stage_account(&mut self, _account: Account) {}

    fn stage_entry(&mut self, _entry: Entry) {}

    async fn commit(self: Box<Self>) -> Result<()> {
        Err(StorageError::Backend("injected commit failure".into()))
    }
}
