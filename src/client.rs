use crate::config::Settings;
use crate::errors::{ClientError, FailureKind};
use crate::models::{Account, Transfer};
use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, RwLock};
use tigerbeetle as tb;
use tracing::{debug, warn};

/// The subset of the ledger cluster's API the CLI relies on.
///
/// Batch calls fail as a whole: if the cluster rejects any record, the error
/// names the first rejected one and no partial result is reported.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn create_accounts(&self, accounts: &[Account]) -> Result<(), ClientError>;

    async fn lookup_account(&self, id: u128) -> Result<Account, ClientError>;

    async fn create_transfers(&self, transfers: &[Transfer]) -> Result<(), ClientError>;

    /// Round-trips a cheap request to check that the cluster is reachable
    /// and accepts this client's release.
    async fn ping(&self) -> Result<(), ClientError>;

    /// Releases the connection. Any call made afterwards fails with
    /// [`ClientError::Closed`].
    fn close(&self);
}

/// [`LedgerClient`] backed by the official TigerBeetle client.
pub struct TigerBeetleClient {
    inner: RwLock<Option<Arc<tb::Client>>>,
}

impl TigerBeetleClient {
    pub fn connect(settings: &Settings) -> Result<Self, ClientError> {
        debug!(
            address = %settings.address,
            cluster_id = %settings.cluster_id,
            "opening TigerBeetle client"
        );
        let client = tb::Client::new(settings.cluster_id, &settings.address)
            .map_err(|status| ClientError::Connect(status.to_string()))?;

        Ok(Self {
            inner: RwLock::new(Some(Arc::new(client))),
        })
    }

    /// Clone the live handle out of the lock so it is never held across an
    /// await point.
    fn handle(&self) -> Result<Arc<tb::Client>, ClientError> {
        self.inner
            .read()
            .ok()
            .and_then(|guard| guard.clone())
            .ok_or(ClientError::Closed)
    }
}

/// Classify a failed request by the status the client library reported.
fn failure_kind(status: tb::Error) -> FailureKind {
    match status {
        tb::Error::ClientReleaseTooLow | tb::Error::ClientReleaseTooHigh => {
            FailureKind::ClientOutdated
        }
        tb::Error::ClientEvicted => FailureKind::SessionEvicted,
        _ => FailureKind::Other,
    }
}

fn request_error(status: tb::Error) -> ClientError {
    ClientError::Request {
        kind: failure_kind(status),
        detail: format!("{:?}", status),
    }
}

/// The first record in a batch whose status is not `accepted`, with the
/// status rendered as the rejection reason. Results may arrive in any order
/// and may include accepted records.
fn first_rejection<S, I>(results: I, accepted: impl Fn(&S) -> bool) -> Option<(u32, String)>
where
    S: fmt::Debug,
    I: IntoIterator<Item = (u32, S)>,
{
    results
        .into_iter()
        .filter(|(_, status)| !accepted(status))
        .min_by_key(|(index, _)| *index)
        .map(|(index, status)| (index, format!("{:?}", status)))
}

#[async_trait]
impl LedgerClient for TigerBeetleClient {
    async fn create_accounts(&self, accounts: &[Account]) -> Result<(), ClientError> {
        let client = self.handle()?;
        let batch: Vec<tb::Account> = accounts.iter().map(tb::Account::from).collect();
        debug!(count = batch.len(), "submitting account batch");

        let results = client.create_accounts(&batch).await.map_err(request_error)?;
        let rejected = first_rejection(results.iter().enumerate().map(|(i, r)| (i as u32, &r.status)), |status| {
            matches!(status, tb::CreateAccountStatus::Created)
        });
        if let Some((index, reason)) = rejected {
            warn!(index, %reason, "cluster rejected accounts");
            return Err(ClientError::AccountRejected { index, reason });
        }

        Ok(())
    }

    async fn lookup_account(&self, id: u128) -> Result<Account, ClientError> {
        let client = self.handle()?;
        debug!(id = %id, "looking up account");

        let accounts = client.lookup_accounts(&[id]).await.map_err(request_error)?;
        accounts
            .into_iter()
            .next()
            .map(Account::from)
            .ok_or(ClientError::AccountNotFound(id))
    }

    async fn create_transfers(&self, transfers: &[Transfer]) -> Result<(), ClientError> {
        let client = self.handle()?;
        let batch: Vec<tb::Transfer> = transfers.iter().map(tb::Transfer::from).collect();
        debug!(count = batch.len(), "submitting transfer batch");

        let results = client
            .create_transfers(&batch)
            .await
            .map_err(request_error)?;
        let rejected = first_rejection(results.iter().enumerate().map(|(i, r)| (i as u32, &r.status)), |status| {
            matches!(status, tb::CreateTransferStatus::Created)
        });
        if let Some((index, reason)) = rejected {
            warn!(index, %reason, "cluster rejected transfers");
            return Err(ClientError::TransferRejected { index, reason });
        }

        Ok(())
    }

    async fn ping(&self) -> Result<(), ClientError> {
        let client = self.handle()?;
        debug!("pinging cluster");

        // Account 0 is reserved and never exists; only the round trip matters.
        client.lookup_accounts(&[0]).await.map_err(request_error)?;
        Ok(())
    }

    fn close(&self) {
        if let Ok(mut guard) = self.inner.write() {
            if guard.take().is_some() {
                debug!("closed TigerBeetle client");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Calls {
        account_batches: Vec<Vec<Account>>,
        transfer_batches: Vec<Vec<Transfer>>,
        lookups: Vec<u128>,
        pings: usize,
        closed: bool,
    }

    /// In-memory [`LedgerClient`] that records every call and fails on
    /// demand.
    #[derive(Default)]
    pub struct MockClient {
        calls: Mutex<Calls>,
        accounts: HashMap<u128, Account>,
        fail_transfer_call: Option<usize>,
        reject_account_index: Option<u32>,
        reject_transfer_index: Option<u32>,
        ping_failure: Option<FailureKind>,
        ping_delay: Option<Duration>,
    }

    impl MockClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_account(mut self, account: Account) -> Self {
            self.accounts.insert(account.id, account);
            self
        }

        /// Fail the `call`-th (1-indexed) `create_transfers` call.
        pub fn failing_transfer_call(mut self, call: usize) -> Self {
            self.fail_transfer_call = Some(call);
            self
        }

        pub fn rejecting_account(mut self, index: u32) -> Self {
            self.reject_account_index = Some(index);
            self
        }

        /// Reject every `create_transfers` call, naming record `index`.
        pub fn rejecting_transfer(mut self, index: u32) -> Self {
            self.reject_transfer_index = Some(index);
            self
        }

        pub fn with_ping_failure(mut self, kind: FailureKind) -> Self {
            self.ping_failure = Some(kind);
            self
        }

        pub fn with_ping_delay(mut self, delay: Duration) -> Self {
            self.ping_delay = Some(delay);
            self
        }

        pub fn account_batches(&self) -> Vec<Vec<Account>> {
            self.calls.lock().unwrap().account_batches.clone()
        }

        pub fn transfer_batches(&self) -> Vec<Vec<Transfer>> {
            self.calls.lock().unwrap().transfer_batches.clone()
        }

        pub fn lookups(&self) -> Vec<u128> {
            self.calls.lock().unwrap().lookups.clone()
        }

        pub fn ping_count(&self) -> usize {
            self.calls.lock().unwrap().pings
        }

        pub fn is_closed(&self) -> bool {
            self.calls.lock().unwrap().closed
        }

        pub fn call_count(&self) -> usize {
            let calls = self.calls.lock().unwrap();
            calls.account_batches.len() + calls.transfer_batches.len() + calls.lookups.len()
                + calls.pings
        }
    }

    #[async_trait]
    impl LedgerClient for MockClient {
        async fn create_accounts(&self, accounts: &[Account]) -> Result<(), ClientError> {
            self.calls
                .lock()
                .unwrap()
                .account_batches
                .push(accounts.to_vec());

            match self.reject_account_index {
                Some(index) => Err(ClientError::AccountRejected {
                    index,
                    reason: "Exists".to_string(),
                }),
                None => Ok(()),
            }
        }

        async fn lookup_account(&self, id: u128) -> Result<Account, ClientError> {
            self.calls.lock().unwrap().lookups.push(id);
            self.accounts
                .get(&id)
                .cloned()
                .ok_or(ClientError::AccountNotFound(id))
        }

        async fn create_transfers(&self, transfers: &[Transfer]) -> Result<(), ClientError> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.transfer_batches.push(transfers.to_vec());
                calls.transfer_batches.len()
            };

            if let Some(index) = self.reject_transfer_index {
                return Err(ClientError::TransferRejected {
                    index,
                    reason: "Exists".to_string(),
                });
            }
            if self.fail_transfer_call == Some(call) {
                return Err(ClientError::TransferRejected {
                    index: 0,
                    reason: "ExceedsCredits".to_string(),
                });
            }
            Ok(())
        }

        async fn ping(&self) -> Result<(), ClientError> {
            self.calls.lock().unwrap().pings += 1;

            if let Some(delay) = self.ping_delay {
                tokio::time::sleep(delay).await;
            }

            match self.ping_failure {
                Some(kind) => Err(ClientError::Request {
                    kind,
                    detail: format!("{:?}", kind),
                }),
                None => Ok(()),
            }
        }

        fn close(&self) {
            self.calls.lock().unwrap().closed = true;
        }
    }
}
