pub mod whois;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub use whois::WhoisOracle;

/// Default deadline for one availability check
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(60);

/// Registration status reported by the oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Available,
    Registered,
    Unknown,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Available => write!(f, "Available"),
            Status::Registered => write!(f, "Registered"),
            Status::Unknown => write!(f, "Unknown"),
        }
    }
}

/// External service answering "is this domain registered?"
#[async_trait]
pub trait AvailabilityOracle: Send + Sync {
    async fn lookup(&self, domain: &str) -> Result<Status>;
}

/// Wraps an oracle and bounds every call with its own deadline.
///
/// No retries happen here; a timeout or oracle failure is returned to the
/// caller as an error.
#[derive(Clone)]
pub struct AvailabilityChecker {
    oracle: Arc<dyn AvailabilityOracle>,
    timeout: Duration,
}

impl AvailabilityChecker {
    pub fn new(oracle: Arc<dyn AvailabilityOracle>) -> Self {
        Self {
            oracle,
            timeout: DEFAULT_CHECK_TIMEOUT,
        }
    }

    /// Sets the default per-call deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Checks a root domain within the default deadline
    pub async fn check(&self, domain: &str) -> Result<Status> {
        self.check_within(domain, self.timeout).await
    }

    /// Checks a root domain within `deadline`, measured from this call
    pub async fn check_within(&self, domain: &str, deadline: Duration) -> Result<Status> {
        debug!("Checking availability of {} (deadline {:?})", domain, deadline);
        match tokio::time::timeout(deadline, self.oracle.lookup(domain)).await {
            Ok(Ok(status)) => {
                debug!("{} is {}", domain, status);
                Ok(status)
            }
            Ok(Err(e)) => {
                debug!("Availability check failed for {}: {}", domain, e);
                Err(e.context(format!("Availability check failed for {}", domain)))
            }
            Err(_) => {
                debug!("Availability check for {} timed out after {:?}", domain, deadline);
                Err(anyhow!(
                    "Availability check for {} timed out after {:?}",
                    domain,
                    deadline
                ))
            }
        }
    }
}

impl fmt::Debug for AvailabilityChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvailabilityChecker")
            .field("timeout", &self.timeout)
            .finish()
    }
}
