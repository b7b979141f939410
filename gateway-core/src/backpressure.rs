//! Per-connection backpressure state machine for the control-plane
//! WebSocket endpoint (spec §4.5).
//!
//! Grounded on `lib_common::core::memory_guard::GlobalMemoryGuard`'s
//! atomic capacity/usage accounting, adapted from a global byte budget to a
//! per-connection retry/backoff tracker, and on `upstream.rs`'s
//! reconnect-backoff loop for the retry-delay shape (there linear-capped,
//! here the same `min(base + step*attempt, cap)` formula spec §4.5 spells
//! out explicitly).

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

/// Hard ceiling on retry attempts before a send is abandoned and the
/// connection is dropped (spec §4.5).
pub const MAX_ATTEMPTS: u32 = 20;

const BASE_DELAY_MS: u64 = 50;
const STEP_MS: u64 = 50;
const CAP_MS: u64 = 500;

/// Computes the backoff delay for retry attempt `attempt` (1-based), per
/// spec §4.5's formula `min(50 + 50*attempt, 500)` milliseconds.
pub fn retry_delay(attempt: u32) -> Duration {
    let ms = (BASE_DELAY_MS + STEP_MS * attempt as u64).min(CAP_MS);
    Duration::from_millis(ms)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Keep retrying; caller should sleep `retry_delay(attempt)` then try again.
    Retry,
    /// `MAX_ATTEMPTS` exhausted; caller must drop the connection.
    Exhausted,
}

/// Tracks one connection's outstanding-bytes usage against
/// `max_buffer_size` and the current retry attempt count. One instance per
/// WebSocket connection; not shared across connections.
pub struct ConnectionBudget {
    max_buffer_size: u64,
    queued_bytes: AtomicU64,
    attempt: AtomicU32,
}

impl ConnectionBudget {
    pub fn new(max_buffer_size: u64) -> Self {
        Self {
            max_buffer_size,
            queued_bytes: AtomicU64::new(0),
            attempt: AtomicU32::new(0),
        }
    }

    /// Call before attempting to enqueue `len` bytes onto the socket's send
    /// buffer. `Ok(())` means send it now and call `settle` afterward;
    /// `Err(outcome)` means the buffer is over budget and the caller must
    /// back off (or drop the connection if `Exhausted`).
    pub fn try_reserve(&self, len: u64) -> Result<(), SendOutcome> {
        let queued = self.queued_bytes.load(Ordering::Acquire);
        if queued + len <= self.max_buffer_size {
            self.attempt.store(0, Ordering::Release);
            return Ok(());
        }

        let attempt = self.attempt.fetch_add(1, Ordering::AcqRel) + 1;
        if attempt > MAX_ATTEMPTS {
            Err(SendOutcome::Exhausted)
        } else {
            Err(SendOutcome::Retry)
        }
    }

    /// Records `len` bytes as now queued on the socket.
    pub fn reserve(&self, len: u64) {
        self.queued_bytes.fetch_add(len, Ordering::AcqRel);
    }

    /// Records `len` bytes as flushed off the socket's send buffer.
    pub fn release(&self, len: u64) {
        self.queued_bytes.fetch_sub(len, Ordering::AcqRel);
    }

    pub fn current_attempt(&self) -> u32 {
        self.attempt.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_grows_linearly_then_caps() {
        assert_eq!(retry_delay(1), Duration::from_millis(100));
        assert_eq!(retry_delay(2), Duration::from_millis(150));
        assert_eq!(retry_delay(9), Duration::from_millis(500));
        assert_eq!(retry_delay(20), Duration::from_millis(500));
    }

    #[test]
    fn reserve_succeeds_within_budget() {
        let budget = ConnectionBudget::new(1000);
        assert_eq!(budget.try_reserve(500), Ok(()));
        budget.reserve(500);
        assert_eq!(budget.try_reserve(400), Ok(()));
    }

    #[test]
    fn reserve_over_budget_retries_then_exhausts() {
        let budget = ConnectionBudget::new(100);
        budget.reserve(100);
        for expected_attempt in 1..=MAX_ATTEMPTS {
            let outcome = budget.try_reserve(1).unwrap_err();
            assert_eq!(outcome, SendOutcome::Retry);
            assert_eq!(budget.current_attempt(), expected_attempt);
        }
        assert_eq!(budget.try_reserve(1).unwrap_err(), SendOutcome::Exhausted);
    }

    #[test]
    fn successful_reserve_resets_attempt_counter() {
        let budget = ConnectionBudget::new(100);
        budget.reserve(100);
        let _ = budget.try_reserve(1);
        assert_eq!(budget.current_attempt(), 1);
        budget.release(100);
        assert_eq!(budget.try_reserve(1), Ok(()));
        assert_eq!(budget.current_attempt(), 0);
    }
}
