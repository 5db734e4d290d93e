use crate::error::LedgerError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub, SubAssign};

pub type AccountId = u32;

/// Represents a monetary value held by an account.
///
/// This is a wrapper around `rust_decimal::Decimal` to enforce domain-specific
/// rules and provide type safety for financial calculations.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

/// Represents a positive monetary amount for ledger operations.
///
/// Ensures that operation amounts are always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, LedgerError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(LedgerError::InvalidAmount)
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = LedgerError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Balance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Balance {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Balance {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Balance {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

/// A holder's balance record under a bank.
///
/// The balance is mutated exclusively through the ledger engine, which always
/// re-fetches the account from storage under the account's lock. Callers must
/// never apply changes to a copy they obtained earlier.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Account {
    /// Unique account identity.
    pub id: AccountId,
    /// Human-facing account number.
    pub number: String,
    /// The owning user.
    pub user_id: u32,
    /// The issuing bank.
    pub bank_id: u32,
    /// Current balance. Non-negative after every completed operation.
    pub balance: Balance,
    /// Account opening date.
    pub opened_on: NaiveDate,
    /// Date interest was last applied. `None` until the first accrual.
    pub last_interest_at: Option<NaiveDate>,
}

impl Account {
    /// Opens a new account with a zero balance.
    pub fn open(id: AccountId, number: String, user_id: u32, bank_id: u32, opened_on: NaiveDate) -> Self {
        Self {
            id,
            number,
            user_id,
            bank_id,
            balance: Balance::ZERO,
            opened_on,
            last_interest_at: None,
        }
    }

    /// Increases the balance.
    pub fn credit(&mut self, amount: Amount) {
        self.balance += amount.into();
    }

    /// Decreases the balance if sufficient funds are available.
    pub fn debit(&mut self, amount: Amount) -> Result<(), LedgerError> {
        if self.balance >= amount.into() {
            self.balance -= amount.into();
            Ok(())
        } else {
            Err(LedgerError::InsufficientFunds { account: self.id })
        }
    }

    /// Whether interest is due as of `today` for the given accrual period.
    ///
    /// An account is due if interest has never been applied, or if at least
    /// `period_days` have elapsed since the last application.
    pub fn interest_due(&self, today: NaiveDate, period_days: u32) -> bool {
        match self.last_interest_at {
            None => true,
            Some(last) => (today - last).num_days() >= i64::from(period_days),
        }
    }
}
