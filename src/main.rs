use chrono::Utc;
use clap::Parser;
use corebank::application::ledger::Ledger;
use corebank::domain::account::Account;
use corebank::domain::ports::LedgerStore;
use corebank::infrastructure::in_memory::InMemoryLedgerStore;
use corebank::interfaces::csv::account_writer::AccountWriter;
use corebank::interfaces::csv::operation_reader::{Operation, OperationKind, OperationReader};
use miette::{IntoDiagnostic, Result, miette};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input operations CSV file (op, account, target, amount)
    operations: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let store: Arc<dyn LedgerStore> = make_store(&cli)?;
    let ledger = Ledger::new(store);

    let file = File::open(&cli.operations).into_diagnostic()?;
    let reader = OperationReader::new(file);
    for op_result in reader.operations() {
        match op_result {
            Ok(op) => {
                if let Err(e) = apply(&ledger, op).await {
                    eprintln!("Error applying operation: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading operation: {}", e);
            }
        }
    }

    let accounts = ledger.all_accounts().await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = AccountWriter::new(stdout.lock());
    writer.write_accounts(accounts).into_diagnostic()?;

    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn make_store(cli: &Cli) -> Result<Arc<dyn LedgerStore>> {
    use corebank::infrastructure::rocksdb::RocksDbLedgerStore;
    match &cli.db_path {
        Some(db_path) => Ok(Arc::new(
            RocksDbLedgerStore::open(db_path).into_diagnostic()?,
        )),
        None => Ok(Arc::new(InMemoryLedgerStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn make_store(_cli: &Cli) -> Result<Arc<dyn LedgerStore>> {
    Ok(Arc::new(InMemoryLedgerStore::new()))
}

fn required<T>(field: Option<T>, name: &str) -> Result<T> {
    field.ok_or_else(|| miette!("operation missing required field: {}", name))
}

async fn apply(ledger: &Ledger, op: Operation) -> Result<()> {
    match op.op {
        OperationKind::Open => {
            let account = Account::open(
                op.account,
                format!("ACC{:07}", op.account),
                1,
                1,
                Utc::now().date_naive(),
            );
            ledger.open_account(account).await.into_diagnostic()?;
            // An opening balance arrives as a regular deposit so it shows up
            // in the entry trail.
            if let Some(amount) = op.amount {
                ledger.deposit(op.account, amount).await.into_diagnostic()?;
            }
            Ok(())
        }
        OperationKind::Deposit => {
            let amount = required(op.amount, "amount")?;
            ledger.deposit(op.account, amount).await.into_diagnostic()?;
            Ok(())
        }
        OperationKind::Withdraw => {
            let amount = required(op.amount, "amount")?;
            ledger.withdraw(op.account, amount).await.into_diagnostic()?;
            Ok(())
        }
        OperationKind::Transfer => {
            let target = required(op.target, "target")?;
            let amount = required(op.amount, "amount")?;
            ledger
                .transfer(op.account, target, amount)
                .await
                .into_diagnostic()
        }
    }
}
