use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Broad classes of failures reported by the ledger cluster, used to pick a
/// user-facing message without inspecting error text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// The cluster runs a release this client can no longer talk to.
    ClientOutdated,

    /// The cluster evicted this client's session.
    SessionEvicted,

    Other,
}

#[derive(Debug, Error)]
pub enum ArgsError {
    #[error(transparent)]
    Clap(#[from] clap::Error),

    #[error("invalid {name}: {value:?} ({source})")]
    InvalidArgument {
        name: &'static str,
        value: String,
        source: ParseIntError,
    },

    #[error("invalid generate type {0:?}: must be 'account' or 'transfer'")]
    InvalidKind(String),

    #[error("invalid {name}: must be at least 1")]
    ZeroNotAllowed { name: &'static str },

    #[error("invalid {name}: {value:?} is not valid UTF-8")]
    InvalidUtf8 { name: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("error creating TigerBeetle client: {0}")]
    Connect(String),

    #[error("request failed: {detail}")]
    Request { kind: FailureKind, detail: String },

    #[error("error creating account at index {index}: {reason}")]
    AccountRejected { index: u32, reason: String },

    #[error("error creating transfer at index {index}: {reason}")]
    TransferRejected { index: u32, reason: String },

    #[error("account not found: {0}")]
    AccountNotFound(u128),

    #[error("client is closed")]
    Closed,
}

impl ClientError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ClientError::Request { kind, .. } => *kind,
            _ => FailureKind::Other,
        }
    }
}

#[derive(Debug, Error)]
pub enum FileError {
    #[error("error reading file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("error parsing JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("error creating file {path}: {source}")]
    Create { path: PathBuf, source: io::Error },

    #[error("error encoding JSON to {path}: {source}")]
    Encode {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("connection failed due to outdated client version")]
    OutdatedClient,

    #[error("connection failed due to session eviction")]
    SessionEvicted,

    #[error("connection failed")]
    ConnectionFailed,

    #[error("operation timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("failed to write probe report: {0}")]
    Output(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("error creating account: {0}")]
    CreateAccount(#[source] ClientError),

    #[error("error fetching account: {0}")]
    GetAccount(#[source] ClientError),

    #[error("error creating transfer: {0}")]
    Transfer(#[source] ClientError),

    #[error("error creating transfer in iteration {iteration}: {source}")]
    BulkTransfer {
        iteration: usize,
        source: ClientError,
    },

    #[error("error creating accounts: {0}")]
    MigrateAccounts(#[source] ClientError),

    #[error("error creating transfers: {0}")]
    MigrateTransfers(#[source] ClientError),

    #[error(transparent)]
    File(#[from] FileError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_report_request_failure_kind() {
        let err = ClientError::Request {
            kind: FailureKind::SessionEvicted,
            detail: "ClientEvicted".to_string(),
        };
        assert_eq!(err.kind(), FailureKind::SessionEvicted);
        assert_eq!(ClientError::Closed.kind(), FailureKind::Other);
    }

    #[test]
    fn should_name_failed_iteration_in_bulk_error() {
        let err = EngineError::BulkTransfer {
            iteration: 3,
            source: ClientError::TransferRejected {
                index: 0,
                reason: "ExceedsCredits".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "error creating transfer in iteration 3: error creating transfer at index 0: ExceedsCredits"
        );
    }

    #[test]
    fn should_format_timeout_in_seconds() {
        let err = ProbeError::TimedOut(Duration::from_secs(50));
        assert_eq!(err.to_string(), "operation timed out after 50s");
    }
}
