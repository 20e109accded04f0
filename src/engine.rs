use crate::args::{Command, SampleKind};
use crate::client::LedgerClient;
use crate::config::RecordOptions;
use crate::doctor::{self, ProbeBudget};
use crate::errors::{ClientError, EngineError, FileError};
use crate::models::{Account, Transfer};
use crate::sample;
use rand::Rng;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// An Engine carries out one CLI verb at a time against a ledger cluster.
///
/// Each operation assembles its records, makes a single call (or a fixed,
/// sequential run of calls) through the [`LedgerClient`], and reports the
/// result to `out`. Nothing is retried: the first failure ends the
/// operation and is returned with the call site named.
pub struct Engine<W> {
    client: Arc<dyn LedgerClient>,
    output_dir: PathBuf,
    out: W,
}

impl<W: Write> Engine<W> {
    pub fn new(client: Arc<dyn LedgerClient>, output_dir: impl Into<PathBuf>, out: W) -> Self {
        Self {
            client,
            output_dir: output_dir.into(),
            out,
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Dispatch a parsed command to the matching operation.
    pub async fn run(&mut self, command: &Command, options: RecordOptions) -> Result<(), EngineError> {
        match *command {
            Command::CreateAccount { id } => {
                self.create_account(id, options).await?;
            }
            Command::GetAccount { id } => {
                self.get_account(id).await?;
            }
            Command::MigrateAccounts { ref file } => {
                self.migrate_accounts(file).await?;
            }
            Command::Transfer {
                debit,
                credit,
                amount,
            } => {
                self.transfer(debit, credit, amount, options).await?;
            }
            Command::BulkTransfer {
                debit,
                credit,
                amount,
                iterations,
            } => {
                self.bulk_transfer(iterations, debit, credit, amount, options)
                    .await?;
            }
            Command::MigrateTransfers { ref file } => {
                self.migrate_transfers(file).await?;
            }
            Command::Generate {
                kind: SampleKind::Account,
                number,
            } => {
                self.generate_accounts(number, options)?;
            }
            Command::Generate {
                kind: SampleKind::Transfer,
                number,
            } => {
                self.generate_transfers(number, options)?;
            }
            Command::Doctor { budget } => self.doctor(budget).await?,
        }

        Ok(())
    }

    /// Create a single account with zero balances.
    pub async fn create_account(
        &mut self,
        id: u128,
        options: RecordOptions,
    ) -> Result<Account, EngineError> {
        let account = Account::new(id, options.ledger, options.code, options.flags);
        self.client
            .create_accounts(std::slice::from_ref(&account))
            .await
            .map_err(EngineError::CreateAccount)?;

        info!(id = %id, "created account");
        writeln!(
            self.out,
            "Account created with ID: {}, Ledger: {}, Code: {}, Flags: {}",
            id, options.ledger, options.code, options.flags
        )?;
        Ok(account)
    }

    pub async fn get_account(&mut self, id: u128) -> Result<Account, EngineError> {
        let account = self
            .client
            .lookup_account(id)
            .await
            .map_err(EngineError::GetAccount)?;

        writeln!(self.out, "Account details:")?;
        writeln!(self.out, "  ID: {}", account.id)?;
        writeln!(self.out, "  User ID: {}", account.user_id)?;
        writeln!(self.out, "  Ledger: {}", account.ledger)?;
        writeln!(self.out, "  Code: {}", account.code)?;
        writeln!(self.out, "  Flags: {}", account.flags)?;
        writeln!(self.out, "  Debits pending: {}", account.debits_pending)?;
        writeln!(self.out, "  Debits posted: {}", account.debits_posted)?;
        writeln!(self.out, "  Credits pending: {}", account.credits_pending)?;
        writeln!(self.out, "  Credits posted: {}", account.credits_posted)?;
        Ok(account)
    }

    /// Move `amount` from `debit` to `credit` in a single transfer whose id is
    /// taken from the wall clock.
    pub async fn transfer(
        &mut self,
        debit: u128,
        credit: u128,
        amount: u128,
        options: RecordOptions,
    ) -> Result<Transfer, EngineError> {
        let transfer = Transfer::new(
            clock_id(),
            debit,
            credit,
            amount,
            options.ledger,
            options.code,
            options.flags,
        );
        self.client
            .create_transfers(std::slice::from_ref(&transfer))
            .await
            .map_err(EngineError::Transfer)?;

        info!(id = %transfer.id, "created transfer");
        writeln!(
            self.out,
            "Transfer completed: {} from account {} to account {} (Ledger: {}, Code: {}, Flags: {})",
            amount, debit, credit, options.ledger, options.code, options.flags
        )?;
        Ok(transfer)
    }

    /// Repeat the same transfer `iterations` times, one call per transfer.
    ///
    /// Stops at the first failure, reporting the zero-based iteration that
    /// failed. Transfers completed before it stay in the ledger.
    pub async fn bulk_transfer(
        &mut self,
        iterations: usize,
        debit: u128,
        credit: u128,
        amount: u128,
        options: RecordOptions,
    ) -> Result<usize, EngineError> {
        let base_id = clock_id();

        for iteration in 0..iterations {
            let transfer = Transfer::new(
                base_id + iteration as u128,
                debit,
                credit,
                amount,
                options.ledger,
                options.code,
                options.flags,
            );

            if let Err(source) = self
                .client
                .create_transfers(std::slice::from_ref(&transfer))
                .await
            {
                warn!(iteration, "bulk transfer aborted");
                return Err(EngineError::BulkTransfer { iteration, source });
            }

            writeln!(
                self.out,
                "Transfer {} completed: {} from account {} to account {} (Ledger: {}, Code: {}, Flags: {})",
                iteration + 1,
                amount,
                debit,
                credit,
                options.ledger,
                options.code,
                options.flags
            )?;
        }

        info!(iterations, "bulk transfer finished");
        Ok(iterations)
    }

    /// Load every account in a JSON file and create them in one batch.
    pub async fn migrate_accounts(&mut self, path: &Path) -> Result<usize, EngineError> {
        let accounts: Vec<Account> = read_records(path)?;
        // An empty file makes no call; the cluster rejects empty batches.
        if !accounts.is_empty() {
            self.client
                .create_accounts(&accounts)
                .await
                .map_err(EngineError::MigrateAccounts)?;
        }

        info!(count = accounts.len(), path = %path.display(), "migrated accounts");
        writeln!(self.out, "Successfully migrated {} accounts", accounts.len())?;
        Ok(accounts.len())
    }

    /// Load every transfer in a JSON file and create them in one batch.
    pub async fn migrate_transfers(&mut self, path: &Path) -> Result<usize, EngineError> {
        let transfers: Vec<Transfer> = read_records(path)?;
        if !transfers.is_empty() {
            self.client
                .create_transfers(&transfers)
                .await
                .map_err(EngineError::MigrateTransfers)?;
        }

        info!(count = transfers.len(), path = %path.display(), "migrated transfers");
        writeln!(self.out, "Successfully migrated {} transfers", transfers.len())?;
        Ok(transfers.len())
    }

    pub fn generate_accounts(
        &mut self,
        number: usize,
        options: RecordOptions,
    ) -> Result<PathBuf, EngineError> {
        let accounts = sample::accounts(number, options);
        self.write_sample(&accounts, sample::ACCOUNTS_FILE)
    }

    pub fn generate_transfers(
        &mut self,
        number: usize,
        options: RecordOptions,
    ) -> Result<PathBuf, EngineError> {
        self.generate_transfers_with_rng(number, options, &mut rand::thread_rng())
    }

    /// Like [`Engine::generate_transfers`] but drawing counterparties and
    /// amounts from `rng`, so a seeded generator gives a reproducible file.
    pub fn generate_transfers_with_rng<R: Rng>(
        &mut self,
        number: usize,
        options: RecordOptions,
        rng: &mut R,
    ) -> Result<PathBuf, EngineError> {
        let transfers = sample::transfers(number, options, rng);
        self.write_sample(&transfers, sample::TRANSFERS_FILE)
    }

    fn write_sample<T: serde::Serialize>(
        &mut self,
        records: &[T],
        file_name: &str,
    ) -> Result<PathBuf, EngineError> {
        let path = sample::write_json(records, &self.output_dir, file_name)?;
        writeln!(self.out, "Generated {} successfully.", file_name)?;
        Ok(path)
    }

    /// Ping the cluster once, without a deadline.
    pub async fn validate_connectivity(&self) -> Result<(), ClientError> {
        self.client.ping().await
    }

    pub async fn doctor(&mut self, budget: ProbeBudget) -> Result<(), EngineError> {
        doctor::diagnose(self.client.clone(), budget, &mut self.out).await?;
        Ok(())
    }
}

/// Reads and decodes a whole JSON array before anything is sent, so a
/// malformed file never reaches the cluster.
fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, FileError> {
    let data = fs::read(path).map_err(|source| FileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&data).map_err(|source| FileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn clock_id() -> u128 {
    id_at(SystemTime::now())
}

/// Nanoseconds since the epoch, never 0: the cluster rejects id 0, so a
/// clock set before the epoch yields 1.
fn id_at(now: SystemTime) -> u128 {
    now.duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default()
        .max(1)
}
