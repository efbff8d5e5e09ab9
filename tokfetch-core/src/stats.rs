use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::media::Method;

/// Point-in-time copy of the download counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsCounters {
    pub primary_successes: u64,
    pub fallback_successes: u64,
    pub total_failures: u64,
}

/// Process-wide download counters, shared between request handlers.
#[derive(Debug, Default)]
pub struct StatsRegistry {
    primary_successes: AtomicU64,
    fallback_successes: AtomicU64,
    total_failures: AtomicU64,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, method: Method) {
        let counter = match method {
            Method::Primary => &self.primary_successes,
            Method::Fallback => &self.fallback_successes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.total_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsCounters {
        StatsCounters {
            primary_successes: self.primary_successes.load(Ordering::Relaxed),
            fallback_successes: self.fallback_successes.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
        }
    }
}
