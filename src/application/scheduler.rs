use super::ledger::Ledger;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Interest accrual settings.
///
/// The defaults mirror the production constants: a 30 second scan tick, a 30
/// day accrual period, and 10 concurrent accrual workers. The rate is an
/// external configuration value and has no default.
#[derive(Debug, Clone)]
pub struct AccrualConfig {
    /// How often the scan runs. The first scan fires immediately.
    pub tick: Duration,
    /// Minimum days between two interest applications to one account.
    pub period_days: u32,
    /// Interest rate applied per accrual (`interest = balance * rate`).
    pub rate: Decimal,
    /// Maximum accrual tasks running at once.
    pub workers: usize,
    /// How long `stop` waits for the scan loop before abandoning it.
    pub shutdown_grace: Duration,
}

impl AccrualConfig {
    pub fn new(rate: Decimal) -> Self {
        Self {
            tick: Duration::from_secs(30),
            period_days: 30,
            rate,
            workers: 10,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// Periodically scans all accounts and applies interest to the ones due.
///
/// A single timer-driven task enumerates eligible accounts each tick and
/// hands each to a bounded worker pool, so the scan never stalls on slow
/// per-account work. Workers go through `Ledger::accrue_interest`, which
/// re-checks eligibility under the account's lock; a user operation racing
/// with the tick can therefore neither lose an update nor cause a double
/// application.
pub struct InterestScheduler {
    shutdown: watch::Sender<bool>,
    task: StdMutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
    shutdown_grace: Duration,
}

impl InterestScheduler {
    /// Starts the background scan loop.
    pub fn start(ledger: Arc<Ledger>, config: AccrualConfig) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let shutdown_grace = config.shutdown_grace;
        let task = tokio::spawn(run(ledger, config, shutdown_rx));
        Self {
            shutdown,
            task: StdMutex::new(Some(task)),
            stopped: AtomicBool::new(false),
            shutdown_grace,
        }
    }

    /// Stops future ticks. Idempotent.
    ///
    /// Waits up to the configured grace period for the scan loop to exit,
    /// then abandons it. In-flight accrual tasks are detached and run to
    /// completion either way; each holds its account lock only inside its
    /// own task, so abandonment never leaves a lock held.
    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown.send(true);
        let task = self.task.lock().expect("scheduler handle poisoned").take();
        if let Some(task) = task
            && let Err(_elapsed) = tokio::time::timeout(self.shutdown_grace, task).await
        {
            warn!("interest scan loop did not stop within grace period");
        }
    }
}

impl Drop for InterestScheduler {
    /// Best-effort shutdown so a dropped scheduler does not keep scanning
    /// for the life of the runtime. The scan loop is left to wind down on
    /// its own; use `stop` for the bounded-grace variant.
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

async fn run(ledger: Arc<Ledger>, config: AccrualConfig, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(config.tick);
    let pool = Arc::new(Semaphore::new(config.workers));

    loop {
        // Shutdown first: when a tick and the stop signal are both ready,
        // the loop must not run one more scan.
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => scan(&ledger, &config, &pool).await,
        }
    }
}

/// One tick: snapshot all accounts and dispatch the eligible ones.
///
/// Failures are isolated at every level: a failed account fetch skips the
/// tick, a failed per-account accrual is logged by its worker, and neither
/// stops the loop from ticking again.
async fn scan(ledger: &Arc<Ledger>, config: &AccrualConfig, pool: &Arc<Semaphore>) {
    let accounts = match ledger.all_accounts().await {
        Ok(accounts) => accounts,
        Err(error) => {
            warn!(%error, "interest scan could not list accounts");
            return;
        }
    };

    let today = Utc::now().date_naive();
    for account in accounts {
        if !account.interest_due(today, config.period_days) {
            continue;
        }
        let ledger = ledger.clone();
        let pool = pool.clone();
        let rate = config.rate;
        let period_days = config.period_days;
        let id = account.id;
        tokio::spawn(async move {
            let _permit = pool.acquire_owned().await.expect("accrual pool closed");
            match ledger.accrue_interest(id, rate, period_days).await {
                Ok(Some(balance)) => {
                    debug!(account = id, balance = %balance.0, "interest applied")
                }
                Ok(None) => {}
                Err(error) => warn!(account = id, %error, "interest accrual failed"),
            }
        });
    }
}
