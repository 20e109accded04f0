//! Connectivity check against the cluster.
//!
//! A single ping runs on its own task while the caller waits for it under a
//! deadline of `attempts * timeout_per_attempt` seconds. The attempt count
//! only stretches the deadline; the ping is never retried. When the deadline
//! wins, the ping task is left to finish on its own and its result is
//! dropped.

use crate::client::LedgerClient;
use crate::errors::{FailureKind, ProbeError};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_ATTEMPTS: u64 = 5;
pub const DEFAULT_TIMEOUT_PER_ATTEMPT: u64 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbeBudget {
    pub attempts: u64,
    pub timeout_per_attempt: u64,
}

impl Default for ProbeBudget {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            timeout_per_attempt: DEFAULT_TIMEOUT_PER_ATTEMPT,
        }
    }
}

impl ProbeBudget {
    pub fn total(&self) -> Duration {
        Duration::from_secs(self.attempts.saturating_mul(self.timeout_per_attempt))
    }
}

pub async fn diagnose<W: Write>(
    client: Arc<dyn LedgerClient>,
    budget: ProbeBudget,
    out: &mut W,
) -> Result<(), ProbeError> {
    let total = budget.total();
    writeln!(
        out,
        "Attempting to connect to TigerBeetle (timeout: {}s)",
        total.as_secs()
    )?;

    let probe = tokio::spawn(async move { client.ping().await });

    let outcome = match tokio::time::timeout(total, probe).await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(timeout_secs = total.as_secs(), "connectivity probe timed out");
            return Err(ProbeError::TimedOut(total));
        }
    };

    let (kind, err) = match outcome {
        Ok(Ok(())) => {
            info!("connectivity probe succeeded");
            writeln!(out, "Successfully connected to TigerBeetle")?;
            return Ok(());
        }
        Ok(Err(err)) => (err.kind(), err.to_string()),
        // The ping task itself died; report it like any other failure.
        Err(join_err) => (FailureKind::Other, format!("probe task failed: {}", join_err)),
    };

    warn!(?kind, error = %err, "connectivity probe failed");
    match kind {
        FailureKind::ClientOutdated => {
            writeln!(out, "Connection failed: Client version is too old")?;
            writeln!(out, "Please update your TigerBeetle client")?;
            writeln!(out, "Error details: {}", err)?;
            Err(ProbeError::OutdatedClient)
        }
        FailureKind::SessionEvicted => {
            writeln!(out, "Connection failed: Session was evicted")?;
            writeln!(out, "This might be due to a version mismatch or other issues")?;
            writeln!(out, "Error details: {}", err)?;
            Err(ProbeError::SessionEvicted)
        }
        FailureKind::Other => {
            writeln!(out, "Failed to connect to TigerBeetle: {}", err)?;
            Err(ProbeError::ConnectionFailed)
        }
    }
}
