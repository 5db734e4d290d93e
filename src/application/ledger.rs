use super::locks::LockRegistry;
use crate::domain::account::{Account, AccountId, Amount, Balance};
use crate::domain::entry::Entry;
use crate::domain::ports::LedgerStore;
use crate::error::{LedgerError, Result};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

/// The ledger engine: the only mutator of account balances.
///
/// Each operation acquires the account's exclusive lock, re-fetches the
/// account from storage, applies the change, persists it, and appends the
/// entries describing the movement. Transfers take both locks in ascending
/// id order and wrap their four writes in one storage unit of work.
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    locks: LockRegistry,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            locks: LockRegistry::new(),
        }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    async fn fetch(&self, id: AccountId) -> Result<Account> {
        self.store
            .account(id)
            .await?
            .ok_or(LedgerError::AccountNotFound(id))
    }

    /// Registers a newly opened account. Account opening itself is an
    /// external concern; this is the boundary it hands the record through.
    pub async fn open_account(&self, mut account: Account) -> Result<Account> {
        account.opened_on = Self::today();
        self.store.insert_account(account.clone()).await?;
        Ok(account)
    }

    pub async fn account(&self, id: AccountId) -> Result<Account> {
        self.fetch(id).await
    }

    pub async fn all_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.store.all_accounts().await?)
    }

    pub async fn account_entries(&self, id: AccountId) -> Result<Vec<Entry>> {
        Ok(self.store.account_entries(id).await?)
    }

    /// Increases the account balance by `amount` and appends one deposit
    /// entry dated today. Returns the updated balance.
    pub async fn deposit(&self, id: AccountId, amount: Decimal) -> Result<Balance> {
        let amount = Amount::new(amount)?;
        let _guard = self.locks.acquire(id).await;

        let mut account = self.fetch(id).await?;
        account.credit(amount);
        self.store.update_account(account.clone()).await?;
        self.store
            .append_entry(Entry::deposit(id, amount, Self::today()))
            .await?;
        Ok(account.balance)
    }

    /// Decreases the account balance by `amount` and appends one withdrawal
    /// entry (negative signed amount). Returns the updated balance.
    pub async fn withdraw(&self, id: AccountId, amount: Decimal) -> Result<Balance> {
        let amount = Amount::new(amount)?;
        let _guard = self.locks.acquire(id).await;

        let mut account = self.fetch(id).await?;
        account.debit(amount)?;
        self.store.update_account(account.clone()).await?;
        self.store
            .append_entry(Entry::withdrawal(id, amount, Self::today()))
            .await?;
        Ok(account.balance)
    }

    /// Moves `amount` from `source` to `target` as one atomic unit of work:
    /// both account updates and the two linked transfer entries either all
    /// commit or none do.
    ///
    /// The balance is checked before taking any lock and re-checked once both
    /// locks are held, since a concurrent withdrawal may have drained the
    /// source in between.
    pub async fn transfer(&self, source: AccountId, target: AccountId, amount: Decimal) -> Result<()> {
        let amount = Amount::new(amount)?;
        if source == target {
            return Err(LedgerError::SameAccount);
        }

        // Cheap pre-check; not authoritative.
        let snapshot = self.fetch(source).await?;
        if snapshot.balance < amount.into() {
            return Err(LedgerError::InsufficientFunds { account: source });
        }
        self.fetch(target).await?;

        let _guards = self.locks.acquire_pair(source, target).await;

        let mut source_account = self.fetch(source).await?;
        let mut target_account = self.fetch(target).await?;
        source_account.debit(amount)?;
        target_account.credit(amount);

        let date = Self::today();
        let (out, r#in) = Entry::transfer_pair(source, target, amount, date);

        let mut uow = self.store.begin().await?;
        uow.stage_account(source_account);
        uow.stage_account(target_account);
        uow.stage_entry(out);
        uow.stage_entry(r#in);
        uow.commit().await.map_err(LedgerError::TransferFailure)?;
        Ok(())
    }

    /// Applies one round of interest to the account if it is still due,
    /// under the same exclusive lock as deposit and withdraw.
    ///
    /// Eligibility is re-checked under the lock: the scheduler scans from a
    /// snapshot, and another tick or a concurrent accrual may already have
    /// applied interest by the time this runs. Returns `None` when skipped.
    pub async fn accrue_interest(
        &self,
        id: AccountId,
        rate: Decimal,
        period_days: u32,
    ) -> Result<Option<Balance>> {
        let _guard = self.locks.acquire(id).await;

        let today = Self::today();
        let mut account = self.fetch(id).await?;
        if !account.interest_due(today, period_days) {
            return Ok(None);
        }

        let interest = account.balance.0 * rate;
        if let Ok(interest) = Amount::new(interest) {
            account.credit(interest);
        }
        account.last_interest_at = Some(today);
        self.store.update_account(account.clone()).await?;
        Ok(Some(account.balance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entry::EntryKind;
    use crate::infrastructure::in_memory::InMemoryLedgerStore;
    use rust_decimal_macros::dec;

    async fn ledger_with_accounts(balances: &[(AccountId, Decimal)]) -> Ledger {
        let store = Arc::new(InMemoryLedgerStore::new());
        for (id, balance) in balances {
            let mut account = Account::open(*id, format!("ACC{id:07}"), 1, 1, Ledger::today());
            account.balance = Balance::new(*balance);
            store.insert_account(account).await.unwrap();
        }
        Ledger::new(store)
    }

    #[tokio::test]
    async fn test_deposit_updates_balance_and_trail() {
        let ledger = ledger_with_accounts(&[(1, dec!(1000.0))]).await;

        let balance = ledger.deposit(1, dec!(500.0)).await.unwrap();
        assert_eq!(balance, Balance::new(dec!(1500.0)));

        let entries = ledger.account_entries(1).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::Deposit);
        assert_eq!(entries[0].amount, dec!(500.0));
        assert_eq!(entries[0].source_account, 1);
        assert_eq!(entries[0].target_account, 1);
    }

    #[tokio::test]
    async fn test_deposit_invalid_amount() {
        let ledger = ledger_with_accounts(&[(1, dec!(1000.0))]).await;

        assert!(matches!(
            ledger.deposit(1, dec!(0.0)).await,
            Err(LedgerError::InvalidAmount)
        ));
        assert!(matches!(
            ledger.deposit(1, dec!(-5.0)).await,
            Err(LedgerError::InvalidAmount)
        ));
        assert!(ledger.account_entries(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deposit_unknown_account() {
        let ledger = ledger_with_accounts(&[]).await;
        assert!(matches!(
            ledger.deposit(9, dec!(1.0)).await,
            Err(LedgerError::AccountNotFound(9))
        ));
    }

    #[tokio::test]
    async fn test_withdraw_records_negative_amount() {
        let ledger = ledger_with_accounts(&[(1, dec!(1000.0))]).await;

        let balance = ledger.withdraw(1, dec!(200.0)).await.unwrap();
        assert_eq!(balance, Balance::new(dec!(800.0)));

        let entries = ledger.account_entries(1).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::Withdrawal);
        assert_eq!(entries[0].amount, dec!(-200.0));
    }

    #[tokio::test]
    async fn test_withdraw_insufficient_leaves_no_trace() {
        let ledger = ledger_with_accounts(&[(1, dec!(100.0))]).await;

        assert!(matches!(
            ledger.withdraw(1, dec!(200.0)).await,
            Err(LedgerError::InsufficientFunds { account: 1 })
        ));
        assert_eq!(
            ledger.account(1).await.unwrap().balance,
            Balance::new(dec!(100.0))
        );
        assert!(ledger.account_entries(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transfer_moves_funds_and_links_entries() {
        let ledger = ledger_with_accounts(&[(1, dec!(1000.0)), (2, dec!(0.0))]).await;

        ledger.transfer(1, 2, dec!(300.0)).await.unwrap();

        assert_eq!(
            ledger.account(1).await.unwrap().balance,
            Balance::new(dec!(700.0))
        );
        assert_eq!(
            ledger.account(2).await.unwrap().balance,
            Balance::new(dec!(300.0))
        );

        let entries = ledger.account_entries(1).await.unwrap();
        assert_eq!(entries.len(), 2);
        let out = entries.iter().find(|e| e.kind == EntryKind::TransferOut).unwrap();
        let r#in = entries.iter().find(|e| e.kind == EntryKind::TransferIn).unwrap();
        assert_eq!(out.amount, dec!(-300.0));
        assert_eq!(r#in.amount, dec!(300.0));
        assert_eq!(out.date, r#in.date);
        assert_eq!((out.source_account, out.target_account), (1, 2));
        assert_eq!((r#in.source_account, r#in.target_account), (1, 2));
    }

    #[tokio::test]
    async fn test_transfer_to_self_rejected() {
        let ledger = ledger_with_accounts(&[(1, dec!(1000.0))]).await;
        assert!(matches!(
            ledger.transfer(1, 1, dec!(10.0)).await,
            Err(LedgerError::SameAccount)
        ));
    }

    #[tokio::test]
    async fn test_transfer_non_positive_amount_writes_nothing() {
        let ledger = ledger_with_accounts(&[(1, dec!(1000.0)), (2, dec!(0.0))]).await;

        assert!(matches!(
            ledger.transfer(1, 2, dec!(-10.0)).await,
            Err(LedgerError::InvalidAmount)
        ));
        assert_eq!(
            ledger.account(1).await.unwrap().balance,
            Balance::new(dec!(1000.0))
        );
        assert!(ledger.account_entries(1).await.unwrap().is_empty());
        assert!(ledger.account_entries(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transfer_insufficient_funds() {
        let ledger = ledger_with_accounts(&[(1, dec!(100.0)), (2, dec!(0.0))]).await;
        assert!(matches!(
            ledger.transfer(1, 2, dec!(200.0)).await,
            Err(LedgerError::InsufficientFunds { account: 1 })
        ));
    }

    #[tokio::test]
    async fn test_transfer_unknown_target() {
        let ledger = ledger_with_accounts(&[(1, dec!(100.0))]).await;
        assert!(matches!(
            ledger.transfer(1, 9, dec!(50.0)).await,
            Err(LedgerError::AccountNotFound(9))
        ));
    }

    #[tokio::test]
    async fn test_accrue_interest_applies_once() {
        let ledger = ledger_with_accounts(&[(1, dec!(1000.0))]).await;

        let balance = ledger.accrue_interest(1, dec!(0.05), 30).await.unwrap();
        assert_eq!(balance, Some(Balance::new(dec!(1050.0))));

        let account = ledger.account(1).await.unwrap();
        assert_eq!(account.last_interest_at, Some(Ledger::today()));

        // No longer due; re-check under lock skips it.
        let again = ledger.accrue_interest(1, dec!(0.05), 30).await.unwrap();
        assert_eq!(again, None);
        assert_eq!(
            ledger.account(1).await.unwrap().balance,
            Balance::new(dec!(1050.0))
        );
    }

    #[tokio::test]
    async fn test_accrue_interest_on_zero_balance_marks_date() {
        let ledger = ledger_with_accounts(&[(1, dec!(0.0))]).await;

        let balance = ledger.accrue_interest(1, dec!(0.05), 30).await.unwrap();
        assert_eq!(balance, Some(Balance::ZERO));
        assert_eq!(
            ledger.account(1).await.unwrap().last_interest_at,
            Some(Ledger::today())
        );
    }
}
