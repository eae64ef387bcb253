//! Retry budgets for repair loops.
//!
//! Each loop may request at most `limit` repairs, and every repair must change the
//! fingerprint of the artifact it repairs. A loop that runs out of budget or stops
//! making progress is reported as unrepairable instead of spinning forever.

use std::fmt;

use sha2::{Digest, Sha256};

/// SHA-256 hex digest of an artifact's contents.
pub fn fingerprint(contents: &str) -> String {
    hex::encode(Sha256::digest(contents.as_bytes()))
}

/// Why a repair loop must stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairStop {
    /// All `limit` repairs were spent.
    Exhausted { limit: u32 },
    /// The last repair returned an artifact identical to the one it replaced.
    Stalled { fingerprint: String },
}

impl fmt::Display for RepairStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepairStop::Exhausted { limit } => {
                write!(f, "repair budget exhausted after {limit} attempt(s)")
            }
            RepairStop::Stalled { fingerprint } => write!(
                f,
                "repair made no progress (artifact unchanged, sha256 {})",
                &fingerprint[..fingerprint.len().min(12)]
            ),
        }
    }
}

/// Attempt counter plus progress fingerprint for one artifact.
#[derive(Debug, Clone)]
pub struct RepairBudget {
    limit: u32,
    used: u32,
    last_fingerprint: String,
}

impl RepairBudget {
    /// Start a budget for an artifact whose current contents are `initial`.
    pub fn new(limit: u32, initial: &str) -> Self {
        Self {
            limit,
            used: 0,
            last_fingerprint: fingerprint(initial),
        }
    }

    /// Check that another repair may be requested.
    pub fn check(&self) -> Result<(), RepairStop> {
        if self.used >= self.limit {
            return Err(RepairStop::Exhausted { limit: self.limit });
        }
        Ok(())
    }

    /// Record a repaired artifact, consuming one attempt.
    ///
    /// Fails if the artifact did not change; the attempt is still consumed.
    pub fn record(&mut self, repaired: &str) -> Result<(), RepairStop> {
        self.used += 1;
        let next = fingerprint(repaired);
        if next == self.last_fingerprint {
            return Err(RepairStop::Stalled { fingerprint: next });
        }
        self.last_fingerprint = next;
        Ok(())
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}
