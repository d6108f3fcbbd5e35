use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use sha2::{Digest, Sha256};

use crate::standings::{CumulativeStandingsRow, Match, TieBreak, compute_cumulative_standings_with};

const DEFAULT_CAPACITY: usize = 16;

pub type Fingerprint = [u8; 32];

/// Caller-side cache for cumulative standings keyed on a digest of the input.
/// The engine itself stays pure.
pub struct StandingsMemo {
    capacity: usize,
    entries: Mutex<HashMap<Fingerprint, Arc<Vec<CumulativeStandingsRow>>>>,
}

impl Default for StandingsMemo {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl StandingsMemo {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_or_compute(
        &self,
        matches: &[Match],
        tie_break: TieBreak,
    ) -> Arc<Vec<CumulativeStandingsRow>> {
        let key = fingerprint(matches, tie_break);
        if let Some(hit) = self.lock().get(&key) {
            tracing::trace!("standings memo hit");
            return Arc::clone(hit);
        }

        // Computed outside the lock; a concurrent miss on the same key just
        // computes the same rows twice.
        let rows = Arc::new(compute_cumulative_standings_with(matches, tie_break));
        let mut entries = self.lock();
        if entries.len() >= self.capacity {
            entries.clear();
        }
        entries.insert(key, Arc::clone(&rows));
        rows
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<Fingerprint, Arc<Vec<CumulativeStandingsRow>>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Order-sensitive digest of every engine-relevant field plus the tie-break.
pub fn fingerprint(matches: &[Match], tie_break: TieBreak) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(tie_break.as_str().as_bytes());
    hasher.update((matches.len() as u64).to_le_bytes());
    for m in matches {
        hasher.update(m.id.to_le_bytes());
        hasher.update(m.matchday.to_le_bytes());
        hasher.update(m.home_team.to_le_bytes());
        hasher.update(m.away_team.to_le_bytes());
        hasher.update(m.status.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(m.outcome.map(|o| o.as_str()).unwrap_or("-").as_bytes());
        hasher.update([0u8]);
    }
    hasher.finalize().into()
}
