use crate::domain::account::{Account, AccountId};
use crate::domain::entry::{Entry, EntryId};
use crate::domain::ports::{LedgerStore, Result, UnitOfWork};
use crate::error::StorageError;
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Column Family for account records.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family for the append-only entry trail.
pub const CF_ENTRIES: &str = "entries";

/// A persistent ledger store backed by RocksDB.
///
/// Accounts and entries live in separate column families, keyed by their
/// big-endian ids and stored as JSON. The unit of work maps onto a
/// `WriteBatch`, whose write is atomic, giving the transfer its commit or
/// rollback boundary. Entry ids come from an atomic counter seeded from the
/// highest stored key on open.
///
/// `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbLedgerStore {
    db: Arc<DB>,
    next_entry_id: Arc<AtomicU64>,
}

impl RocksDbLedgerStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// both column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_accounts = ColumnFamilyDescriptor::new(CF_ACCOUNTS, Options::default());
        let cf_entries = ColumnFamilyDescriptor::new(CF_ENTRIES, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_accounts, cf_entries])?;

        let last_id = {
            let cf = db
                .cf_handle(CF_ENTRIES)
                .ok_or_else(|| StorageError::Backend("entries column family not found".into()))?;
            match db.iterator_cf(cf, IteratorMode::End).next() {
                Some(item) => {
                    let (key, _value) = item?;
                    let bytes: [u8; 8] = key
                        .as_ref()
                        .try_into()
                        .map_err(|_| StorageError::Backend("malformed entry key".into()))?;
                    u64::from_be_bytes(bytes)
                }
                None => 0,
            }
        };

        Ok(Self {
            db: Arc::new(db),
            next_entry_id: Arc::new(AtomicU64::new(last_id)),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::Backend(format!("{name} column family not found")))
    }

    fn next_id(&self) -> EntryId {
        self.next_entry_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let cf = self.cf(CF_ACCOUNTS)?;
        match self.db.get_cf(cf, id.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl LedgerStore for RocksDbLedgerStore {
    async fn account(&self, id: AccountId) -> Result<Option<Account>> {
        self.get_account(id)
    }

    async fn all_accounts(&self) -> Result<Vec<Account>> {
        let cf = self.cf(CF_ACCOUNTS)?;
        let mut accounts = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            accounts.push(serde_json::from_slice(&value)?);
        }
        Ok(accounts)
    }

    async fn insert_account(&self, account: Account) -> Result<()> {
        let cf = self.cf(CF_ACCOUNTS)?;
        if self.db.get_pinned_cf(cf, account.id.to_be_bytes())?.is_some() {
            return Err(StorageError::Backend(format!(
                "account {} already stored",
                account.id
            )));
        }
        let value = serde_json::to_vec(&account)?;
        self.db.put_cf(cf, account.id.to_be_bytes(), value)?;
        Ok(())
    }

    async fn update_account(&self, account: Account) -> Result<()> {
        let cf = self.cf(CF_ACCOUNTS)?;
        if self.db.get_pinned_cf(cf, account.id.to_be_bytes())?.is_none() {
            return Err(StorageError::Backend(format!(
                "account {} not stored",
                account.id
            )));
        }
        let value = serde_json::to_vec(&account)?;
        self.db.put_cf(cf, account.id.to_be_bytes(), value)?;
        Ok(())
    }

    async fn append_entry(&self, mut entry: Entry) -> Result<EntryId> {
        let cf = self.cf(CF_ENTRIES)?;
        entry.id = self.next_id();
        let value = serde_json::to_vec(&entry)?;
        self.db.put_cf(cf, entry.id.to_be_bytes(), value)?;
        Ok(entry.id)
    }

    async fn account_entries(&self, id: AccountId) -> Result<Vec<Entry>> {
        let cf = self.cf(CF_ENTRIES)?;
        let mut entries = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let entry: Entry = serde_json::from_slice(&value)?;
            if entry.concerns(id) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        Ok(Box::new(RocksDbUnitOfWork {
            store: self.clone(),
            staged_accounts: Vec::new(),
            staged_entries: Vec::new(),
        }))
    }
}

/// Staged writes against a `RocksDbLedgerStore`, committed as one
/// `WriteBatch`.
pub struct RocksDbUnitOfWork {
    store: RocksDbLedgerStore,
    staged_accounts: Vec<Account>,
    staged_entries: Vec<Entry>,
}

#[async_trait]
impl UnitOfWork for RocksDbUnitOfWork {
    fn stage_account(&mut self, account: Account) {
        self.staged_accounts.push(account);
    }

    fn stage_entry(&mut self, entry: Entry) {
        self.staged_entries.push(entry);
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        for account in &self.staged_accounts {
            if self.store.get_account(account.id)?.is_none() {
                return Err(StorageError::Backend(format!(
                    "account {} not stored",
                    account.id
                )));
            }
        }

        let mut batch = WriteBatch::default();
        let cf_accounts = self.store.cf(CF_ACCOUNTS)?;
        let cf_entries = self.store.cf(CF_ENTRIES)?;

        for account in &self.staged_accounts {
            let value = serde_json::to_vec(account)?;
            batch.put_cf(cf_accounts, account.id.to_be_bytes(), value);
        }
        for entry in self.staged_entries {
            let entry = Entry {
                id: self.store.next_id(),
                ..entry
            };
            let value = serde_json::to_vec(&entry)?;
            batch.put_cf(cf_entries, entry.id.to_be_bytes(), value);
        }

        self.store.db.write(batch)?;
        Ok(())
    }
}
