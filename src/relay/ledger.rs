//! Submission ledger
//!
//! One relayed submission per plan hash. An entry lives until the plan's own
//! deadline, after which the router would reject the plan anyway.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::B256;

use super::{RelayError, RelayErrorKind};
use crate::clock::SharedClock;
use crate::plan::PlanHash;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEntry {
    /// Submission in progress, no hash yet
    Reserved { deadline: u64 },
    Submitted { deadline: u64, tx_hash: B256 },
}

impl LedgerEntry {
    fn deadline(&self) -> u64 {
        match self {
            LedgerEntry::Reserved { deadline } | LedgerEntry::Submitted { deadline, .. } => {
                *deadline
            }
        }
    }
}

pub struct SubmissionLedger {
    clock: SharedClock,
    entries: Mutex<HashMap<PlanHash, LedgerEntry>>,
}

impl SubmissionLedger {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<PlanHash, LedgerEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim `plan_hash` for a submission
    pub fn reserve(&self, plan_hash: PlanHash, deadline: u64) -> Result<(), RelayError> {
        let now = self.clock.now_unix();
        let mut entries = self.entries();
        entries.retain(|_, entry| entry.deadline() >= now);

        match entries.get(&plan_hash) {
            Some(LedgerEntry::Submitted { tx_hash, .. }) => Err(RelayError::new(
                RelayErrorKind::DuplicateSubmission,
                format!("Plan {} was already submitted", plan_hash),
            )
            .with_tx(*tx_hash)),
            Some(LedgerEntry::Reserved { .. }) => Err(RelayError::new(
                RelayErrorKind::DuplicateSubmission,
                format!("Plan {} is already being submitted", plan_hash),
            )),
            None => {
                entries.insert(plan_hash, LedgerEntry::Reserved { deadline });
                Ok(())
            }
        }
    }

    /// Record the broadcast transaction for a reserved plan
    pub fn record(&self, plan_hash: PlanHash, tx_hash: B256) {
        let mut entries = self.entries();
        let deadline = entries
            .get(&plan_hash)
            .map(LedgerEntry::deadline)
            .unwrap_or_else(|| self.clock.now_unix());
        entries.insert(plan_hash, LedgerEntry::Submitted { deadline, tx_hash });
    }

    /// Drop a reservation whose submission never produced a hash
    pub fn release(&self, plan_hash: &PlanHash) {
        let mut entries = self.entries();
        if matches!(entries.get(plan_hash), Some(LedgerEntry::Reserved { .. })) {
            entries.remove(plan_hash);
        }
    }

    pub fn get(&self, plan_hash: &PlanHash) -> Option<LedgerEntry> {
        self.entries().get(plan_hash).copied()
    }
}
