use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::checker::Status;

/// Process-wide run counters. Increment-only and lock-free.
#[derive(Debug, Default)]
pub struct Stats {
    urls_seen: AtomicU64,
    domains_seen: AtomicU64,
    domains_unique: AtomicU64,
    domains_checked: AtomicU64,
    domains_available: AtomicU64,
    check_failures: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_url(&self) {
        self.urls_seen.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_domain(&self) {
        self.domains_seen.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unique(&self) {
        self.domains_unique.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_check(&self, status: Status) {
        self.domains_checked.fetch_add(1, Ordering::Relaxed);
        if status == Status::Available {
            self.domains_available.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_failure(&self) {
        self.check_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            urls_seen: self.urls_seen.load(Ordering::Relaxed),
            domains_seen: self.domains_seen.load(Ordering::Relaxed),
            domains_unique: self.domains_unique.load(Ordering::Relaxed),
            domains_checked: self.domains_checked.load(Ordering::Relaxed),
            domains_available: self.domains_available.load(Ordering::Relaxed),
            check_failures: self.check_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`Stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub urls_seen: u64,
    pub domains_seen: u64,
    pub domains_unique: u64,
    pub domains_checked: u64,
    pub domains_available: u64,
    pub check_failures: u64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "urls={} domains={} unique={} checked={} available={} failed={}",
            self.urls_seen,
            self.domains_seen,
            self.domains_unique,
            self.domains_checked,
            self.domains_available,
            self.check_failures
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters() {
        let stats = Stats::new();
        stats.record_url();
        stats.record_domain();
        stats.record_domain();
        stats.record_unique();
        stats.record_check(Status::Available);
        stats.record_check(Status::Registered);
        stats.record_failure();

        let snap = stats.snapshot();
        assert_eq!(snap.urls_seen, 1);
        assert_eq!(snap.domains_seen, 2);
        assert_eq!(snap.domains_unique, 1);
        assert_eq!(snap.domains_checked, 2);
        assert_eq!(snap.domains_available, 1);
        assert_eq!(snap.check_failures, 1);
        assert_eq!(
            snap.to_string(),
            "urls=1 domains=2 unique=1 checked=2 available=1 failed=1"
        );
    }

    #[test]
    fn test_concurrent_increments() {
        let stats = Arc::new(Stats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.record_url();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.snapshot().urls_seen, 8000);
    }
}
