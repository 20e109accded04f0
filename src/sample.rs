//! Synthetic accounts and transfers for seeding a development cluster.
//!
//! Generated files use the same JSON layout that `migrate-accounts` and
//! `migrate-transfers` read, so a generate/migrate pair loads a cluster end
//! to end.

use crate::config::RecordOptions;
use crate::errors::FileError;
use crate::models::{Account, Transfer};
use rand::Rng;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ACCOUNTS_FILE: &str = "generated_accounts.json";
pub const TRANSFERS_FILE: &str = "generated_transfers.json";

/// Generated accounts are numbered upwards from here, and generated transfers
/// pick their counterparties from the same range.
pub const FIRST_ACCOUNT_ID: u128 = 1000;

pub const MAX_AMOUNT: u128 = 10_000;

/// `number` accounts with sequential ids and zero balances.
pub fn accounts(number: usize, options: RecordOptions) -> Vec<Account> {
    (0..number)
        .map(|i| {
            Account::new(
                FIRST_ACCOUNT_ID + i as u128,
                options.ledger,
                options.code,
                options.flags,
            )
        })
        .collect()
}

/// `number` transfers between random accounts of the generated range, for
/// random amounts in `1..=MAX_AMOUNT`.
///
/// Debit and credit may land on the same account; the cluster rejects those
/// at migration time, which is a useful failure to exercise.
pub fn transfers<R: Rng>(
    number: usize,
    options: RecordOptions,
    rng: &mut R,
) -> Vec<Transfer> {
    let last_account = FIRST_ACCOUNT_ID + number as u128;

    (0..number)
        .map(|i| {
            Transfer::new(
                i as u128 + 1,
                rng.gen_range(FIRST_ACCOUNT_ID..last_account),
                rng.gen_range(FIRST_ACCOUNT_ID..last_account),
                rng.gen_range(1..=MAX_AMOUNT),
                options.ledger,
                options.code,
                options.flags,
            )
        })
        .collect()
}

/// Writes `records` as an indented JSON array to `dir/file_name`, replacing
/// any previous file, and returns the path written.
pub fn write_json<T: Serialize>(
    records: &[T],
    dir: &Path,
    file_name: &str,
) -> Result<PathBuf, FileError> {
    let path = dir.join(file_name);
    let file = File::create(&path).map_err(|source| FileError::Create {
        path: path.clone(),
        source,
    })?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records).map_err(|source| FileError::Encode {
        path: path.clone(),
        source,
    })?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(|source| FileError::Create {
            path: path.clone(),
            source,
        })?;

    debug!(path = %path.display(), count = records.len(), "wrote sample file");
    Ok(path)
}
