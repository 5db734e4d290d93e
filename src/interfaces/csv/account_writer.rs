use crate::domain::account::Account;
use crate::error::Result;
use std::io::Write;

/// Writes final account state as CSV.
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes one row per account, sorted by id for stable output.
    pub fn write_accounts(&mut self, mut accounts: Vec<Account>) -> Result<()> {
        self.writer
            .write_record(["account", "number", "balance", "last_interest"])?;

        accounts.sort_by_key(|a| a.id);
        for account in accounts {
            let last_interest = account
                .last_interest_at
                .map(|d| d.to_string())
                .unwrap_or_default();
            self.writer.write_record([
                account.id.to_string(),
                account.number,
                account.balance.0.to_string(),
                last_interest,
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
