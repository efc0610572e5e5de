use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::error::RttError;

/// Tracks send times of in-flight messages, keyed by message id.
///
/// Safe to share between tasks: every operation takes the internal lock for
/// the duration of a single map access. Entries whose echo never arrives stay
/// pending; `pending()` exposes how many there are.
#[derive(Debug, Default)]
pub struct RttTimer {
    sent_at: Mutex<HashMap<Uuid, Instant>>,
}

impl RttTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current time as the send time of `id`.
    pub fn start(&self, id: Uuid) -> Result<(), RttError> {
        self.start_at(id, Instant::now())
    }

    pub fn start_at(&self, id: Uuid, now: Instant) -> Result<(), RttError> {
        let mut sent_at = self.lock();
        if sent_at.contains_key(&id) {
            return Err(RttError::DuplicateTimer(id));
        }
        sent_at.insert(id, now);
        Ok(())
    }

    /// Resolve the timer for `id` and return the elapsed time.
    ///
    /// `None` when nothing was started for `id`, which is the normal case for
    /// messages sent by other peers.
    pub fn stop(&self, id: Uuid) -> Option<Duration> {
        self.stop_at(id, Instant::now())
    }

    pub fn stop_at(&self, id: Uuid, now: Instant) -> Option<Duration> {
        self.lock()
            .remove(&id)
            .map(|started| now.saturating_duration_since(started))
    }

    /// Drop a pending timer without measuring (the send it belonged to failed).
    pub fn cancel(&self, id: Uuid) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Number of timers still waiting for their echo.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Instant>> {
        // The map stays consistent even if a holder panicked.
        self.sent_at.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
