pub mod clock;
pub mod disk;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use clock::{Clock, ManualClock, SystemClock};
pub use disk::DiskStore;

/// Shortest window during which a checked domain is suppressed
pub const MIN_TTL: std::time::Duration = std::time::Duration::from_secs(6 * 60 * 60);

/// A root domain that has been handed to the availability oracle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckedDomain {
    pub domain: String,
    pub checked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CheckedDomain {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Check-and-set store of domains already sent to the oracle.
///
/// Implementations must make `has_checked` atomic per key: among concurrent
/// first-touch callers for the same domain exactly one sees `false`.
pub trait CheckedStore: Send + Sync {
    /// Returns `true` if the domain was checked inside its TTL window.
    /// Otherwise marks it as checked now and returns `false`.
    fn has_checked(&self, domain: &str) -> Result<bool>;

    /// Drops a live mark so the next sighting of the domain proceeds
    fn release(&self, domain: &str) -> Result<()>;

    /// Number of live entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flushes pending state and releases the storage handle.
    /// The store rejects every call made after this.
    fn close(&self) -> Result<()>;
}
